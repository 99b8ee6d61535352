//!
//! imgvault HTTP server
//! --------------------
//! Axum router fronting the upstream repository.
//!
//! Responsibilities:
//! - Public read-through proxy under the configured prefix.
//! - Admin login/logout with opaque server-side session tokens.
//! - Session-guarded JSON API: dashboard, browse, batch export, move, delete.
//! - Access gate on every route; correlation ids on every request.
//! - Background sweeper for the TTL cache and expired sessions.

use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Request, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::Router;
use futures_util::FutureExt; // for catch_unwind on async blocks
use tracing::{debug, error, info, info_span, Instrument};

use crate::cache::{MemoryTtlCache, TtlCache};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::filestore::correlation::REQUEST_ID_HEADER;
use crate::filestore::{ContentUrls, CorrelationId, TreeIndex};
use crate::identity::{OperatorCredentials, SessionManager};
use crate::remote::{ContentSource, GitHubStore, RawContentClient, RemoteStore};

pub mod admin;
pub mod gate;
pub mod pages;
pub mod proxy;

use gate::{AccessGate, BlocklistGate};
use proxy::ProxyRelay;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub remote: Arc<dyn RemoteStore>,
    pub content: Arc<dyn ContentSource>,
    pub cache: Arc<dyn TtlCache>,
    pub index: Arc<TreeIndex>,
    pub sessions: Arc<SessionManager>,
    pub credentials: Arc<OperatorCredentials>,
    pub proxy: Arc<ProxyRelay>,
    pub gate: Arc<dyn AccessGate>,
}

impl AppState {
    /// Wire the state from explicit collaborators. `config` should already be finalized.
    pub fn new(
        config: AppConfig,
        remote: Arc<dyn RemoteStore>,
        content: Arc<dyn ContentSource>,
        cache: Arc<dyn TtlCache>,
        credentials: OperatorCredentials,
    ) -> AppResult<Self> {
        let urls = ContentUrls::from_config(&config);
        let identity = format!("{}@{}", config.repo, config.branch);
        let index = TreeIndex::new(remote.clone(), cache.clone(), urls.clone(), &identity, config.dashboard_ttl());
        let proxy = ProxyRelay::new(&config, urls)?;
        Ok(Self {
            sessions: Arc::new(SessionManager::new(config.session_ttl())),
            gate: Arc::new(BlocklistGate::from_config(&config)),
            index: Arc::new(index),
            proxy: Arc::new(proxy),
            credentials: Arc::new(credentials),
            config: Arc::new(config),
            remote,
            content,
            cache,
        })
    }

    /// Production wiring: GitHub API client, raw-host downloader, in-process TTL cache.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let remote: Arc<dyn RemoteStore> = Arc::new(GitHubStore::new(&config)?);
        let content: Arc<dyn ContentSource> = Arc::new(RawContentClient::new(&config)?);
        let cache: Arc<dyn TtlCache> = Arc::new(MemoryTtlCache::new());
        let credentials = OperatorCredentials::new(&config.admin_user, &config.admin_pass)
            .context("While hashing operator credentials")?;
        Ok(Self::new(config, remote, content, cache, credentials)?)
    }
}

pub fn build_router(state: AppState) -> Router {
    let cfg = state.config.clone();
    let admin_route = cfg.admin_route.clone();

    let api = Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/browse", get(admin::browse))
        .route("/batch_export", get(admin::batch_export))
        .route("/move", post(admin::move_file))
        .route("/delete", post(admin::delete_file))
        .fallback(admin::api_not_found)
        .layer(middleware::from_fn_with_state(state.clone(), admin::require_session));

    Router::new()
        .route("/", get(root_redirect))
        .route(&format!("{}/{{*path}}", cfg.proxy_prefix), any(proxy::relay))
        .route(&admin_route, get(admin::index_page))
        .route(&format!("{}/login", admin_route), post(admin::login))
        .route(&format!("{}/logout", admin_route), get(admin::logout).post(admin::logout))
        .nest(&cfg.admin_api_prefix(), api)
        .fallback(not_found)
        .layer(middleware::from_fn(with_correlation_id))
        .layer(middleware::from_fn_with_state(state.clone(), gate::enforce))
        .with_state(state)
}

async fn root_redirect(State(state): State<AppState>) -> Response {
    redirect(&state.config.admin_route)
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 Not Found").into_response()
}

/// 302 to `location`.
pub(crate) fn redirect(location: &str) -> Response {
    let mut resp = StatusCode::FOUND.into_response();
    if let Ok(v) = HeaderValue::from_str(location) {
        resp.headers_mut().insert(LOCATION, v);
    }
    resp
}

async fn with_correlation_id(req: Request, next: Next) -> Response {
    let cid = CorrelationId::from_opt_str(req.headers().get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()));
    let span = info_span!("http", id = %cid, method = %req.method(), path = %req.uri().path());
    let mut resp = next.run(req).instrument(span.clone()).await;
    span.in_scope(|| debug!(status = resp.status().as_u16(), "request complete"));
    if let Ok(v) = HeaderValue::from_str(cid.as_str()) {
        resp.headers_mut().insert(REQUEST_ID_HEADER, v);
    }
    resp
}

/// Run a handler body, turning a panic into an `Internal` error instead of a dropped connection.
pub(crate) async fn guarded<F, T>(fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => {
            let msg = panic.downcast_ref::<&str>().map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!("handler panicked: {}", msg);
            Err(AppError::internal("internal error"))
        }
    }
}

pub(crate) fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie")?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some((k, v)) = p.split_once('=') {
            if k == name { return Some(v.to_string()); }
        }
    }
    None
}

fn cookie_attrs(cfg: &AppConfig, max_age: u64) -> String {
    let secure = if cfg.secure_cookie { "; Secure" } else { "" };
    format!("Path={}; Max-Age={}; HttpOnly; SameSite=Strict{}", cfg.admin_route, max_age, secure)
}

pub(crate) fn set_session_cookie(resp: &mut Response, cfg: &AppConfig, token: &str) {
    let v = format!("{}={}; {}", cfg.cookie_name, token, cookie_attrs(cfg, cfg.session_ttl_secs));
    if let Ok(hv) = HeaderValue::from_str(&v) {
        resp.headers_mut().append(SET_COOKIE, hv);
    }
}

pub(crate) fn clear_session_cookie(resp: &mut Response, cfg: &AppConfig) {
    let v = format!("{}=; {}", cfg.cookie_name, cookie_attrs(cfg, 0));
    if let Ok(hv) = HeaderValue::from_str(&v) {
        resp.headers_mut().append(SET_COOKIE, hv);
    }
}

/// Periodically drop expired cache entries and sessions.
pub fn spawn_sweeper(state: &AppState) -> tokio::task::JoinHandle<()> {
    let cache = state.cache.clone();
    let sessions = state.sessions.clone();
    let interval = state.config.cache_sweep_interval();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let removed = cache.sweep();
            let expired = sessions.sweep();
            if removed > 0 || expired > 0 {
                debug!(removed = removed, expired_sessions = expired, "sweep");
            }
        }
    })
}

fn log_startup_config(cfg: &AppConfig) {
    info!(
        target: "imgvault",
        "imgvault starting: repo='{}', branch='{}', proxy_prefix='{}', admin_route='{}', dashboard_ttl={}s, folder_max_age={}s, session_ttl={}s",
        cfg.repo, cfg.branch, cfg.proxy_prefix, cfg.admin_route, cfg.dashboard_ttl_secs, cfg.folder_max_age_secs, cfg.session_ttl_secs
    );
    info!(target: "imgvault", blocked_regions = ?cfg.blocked_regions, blocked_ips = ?cfg.blocked_ips, trust_edge_headers = cfg.trust_edge_headers, "access gate");
}

pub async fn run_with_config(config: AppConfig) -> anyhow::Result<()> {
    let config = config.finalize();
    log_startup_config(&config);
    let http_port = config.http_port;
    let state = AppState::from_config(config)?;
    let _sweeper = spawn_sweeper(&state);
    let app = build_router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

/// Defaults overlaid with the environment.
pub async fn run() -> anyhow::Result<()> {
    run_with_config(AppConfig::from_env()).await
}

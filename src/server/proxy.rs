use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{self, HeaderName};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use reqwest::Client;
use tracing::{debug, warn};

use super::AppState;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::filestore::paths::validate_repo_path;
use crate::filestore::ContentUrls;

pub const NOT_FOUND_BODY: &str = "File not found.";
pub const PROXY_ERROR_BODY: &str = "Proxy Error";
pub const ASSET_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";
const MAX_FORWARDED_BODY: usize = 32 * 1024 * 1024;

/// Client request headers passed through to the raw host.
const FORWARDED: [HeaderName; 6] = [
    header::ACCEPT,
    header::ACCEPT_ENCODING,
    header::ACCEPT_LANGUAGE,
    header::RANGE,
    header::IF_NONE_MATCH,
    header::IF_MODIFIED_SINCE,
];

/// Upstream response headers never copied back.
const HOP_BY_HOP: [HeaderName; 5] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
];

/// Headers that would stop assets from being embedded or hotlinked.
const STRIPPED: [HeaderName; 3] = [
    header::CONTENT_SECURITY_POLICY,
    header::CONTENT_SECURITY_POLICY_REPORT_ONLY,
    header::X_FRAME_OPTIONS,
];

/// Rewrites public asset requests onto the raw-content host and re-headers the response.
pub struct ProxyRelay {
    client: Client,
    urls: ContentUrls,
    referer: HeaderValue,
}

impl ProxyRelay {
    pub fn new(cfg: &AppConfig, urls: ContentUrls) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()
            .map_err(|e| AppError::internal(format!("http client: {}", e)))?;
        let referer = HeaderValue::from_str(&format!("{}/", cfg.raw_base))
            .map_err(|e| AppError::internal(format!("invalid raw base: {}", e)))?;
        Ok(Self { client, urls, referer })
    }

    pub async fn forward(&self, req: Request) -> Response {
        let Some(rest) = self.urls.strip_prefix(req.uri().path()) else {
            return (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response();
        };
        // The remainder must stay a plain repository path once decoded.
        let contained = urlencoding::decode(rest).map(|p| validate_repo_path(&p).is_ok()).unwrap_or(false);
        if !contained {
            debug!(target: "imgvault::proxy", path = %req.uri().path(), "rejected path outside repository");
            return (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response();
        }
        let mut target = self.urls.raw_url(rest);
        if let Some(q) = req.uri().query() {
            target.push('?');
            target.push_str(q);
        }

        let method = req.method().clone();
        let mut headers = HeaderMap::new();
        for name in FORWARDED.iter() {
            if let Some(v) = req.headers().get(name) {
                headers.insert(name.clone(), v.clone());
            }
        }
        headers.insert(header::REFERER, self.referer.clone());

        let mut upstream = self.client.request(method.clone(), &target).headers(headers);
        if method != Method::GET && method != Method::HEAD {
            match axum::body::to_bytes(req.into_body(), MAX_FORWARDED_BODY).await {
                Ok(body) => upstream = upstream.body(body),
                Err(e) => {
                    warn!(target: "imgvault::proxy", url = %target, error = %e, "unreadable request body");
                    return (StatusCode::BAD_GATEWAY, PROXY_ERROR_BODY).into_response();
                }
            }
        }

        let resp = match upstream.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(target: "imgvault::proxy", url = %target, error = %e, "upstream transport failure");
                return (StatusCode::BAD_GATEWAY, PROXY_ERROR_BODY).into_response();
            }
        };
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            debug!(target: "imgvault::proxy", url = %target, "upstream 404");
            return (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response();
        }

        let mut out_headers = resp.headers().clone();
        for name in HOP_BY_HOP.iter().chain(STRIPPED.iter()) {
            out_headers.remove(name);
        }
        out_headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        out_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(ASSET_CACHE_CONTROL));

        let mut out = Response::new(Body::from_stream(resp.bytes_stream()));
        *out.status_mut() = status;
        *out.headers_mut() = out_headers;
        out
    }
}

pub async fn relay(State(state): State<AppState>, req: Request) -> Response {
    let proxy = state.proxy.clone();
    match super::guarded(async move { Ok(proxy.forward(req).await) }).await {
        Ok(resp) => resp,
        Err(_) => (StatusCode::BAD_GATEWAY, PROXY_ERROR_BODY).into_response(),
    }
}

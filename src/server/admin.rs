use axum::body::Bytes;
use axum::extract::{Query, Request, State};
use axum::http::header::CACHE_CONTROL;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};
use axum::{Extension, Form, Json};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use super::{clear_session_cookie, guarded, pages, parse_cookie, redirect, set_session_cookie, AppState};
use crate::error::{AppError, AppResult};
use crate::filestore::listing::{browse as browse_dir, folder_cache_control};
use crate::filestore::{self, batch_export as export_urls, sample_dashboard, MoveOperation};

/// Authenticated operator, attached to requests by `require_session`.
#[derive(Debug, Clone)]
pub struct Operator(pub String);

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub path: String,
    pub sha: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn session_user(state: &AppState, headers: &HeaderMap) -> Option<String> {
    let token = parse_cookie(headers, &state.config.cookie_name)?;
    state.sessions.validate(&token)
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> AppResult<T> {
    serde_json::from_slice(body).map_err(|e| AppError::invalid(format!("invalid request body: {}", e)))
}

/// Rejects API requests without a live session with `401 {"error":"Unauthorized"}`.
pub async fn require_session(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    match session_user(&state, req.headers()) {
        Some(user) => {
            req.extensions_mut().insert(Operator(user));
            next.run(req).await
        }
        None => AppError::Unauthorized.into_response(),
    }
}

pub async fn api_not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not Found" }))).into_response()
}

pub async fn dashboard(State(state): State<AppState>) -> AppResult<Response> {
    guarded(async {
        let assets = state.index.get_index().await?;
        let mut rng = StdRng::from_entropy();
        Ok(Json(sample_dashboard(assets, &mut rng)).into_response())
    })
    .await
}

pub async fn browse(State(state): State<AppState>, Query(q): Query<PathQuery>) -> AppResult<Response> {
    guarded(async {
        let path = q.path.unwrap_or_default();
        let entries = browse_dir(state.remote.as_ref(), state.index.urls(), &path).await?;
        let mut resp = Json(entries).into_response();
        if let Ok(v) = HeaderValue::from_str(&folder_cache_control(state.config.folder_max_age_secs)) {
            resp.headers_mut().insert(CACHE_CONTROL, v);
        }
        Ok(resp)
    })
    .await
}

pub async fn batch_export(State(state): State<AppState>, Query(q): Query<PathQuery>) -> AppResult<Response> {
    guarded(async {
        let prefix = q.path.unwrap_or_default();
        let assets = state.index.get_index().await?;
        Ok(Json(json!({ "urls": export_urls(&assets, &prefix) })).into_response())
    })
    .await
}

pub async fn move_file(
    State(state): State<AppState>,
    Extension(op_user): Extension<Operator>,
    body: Bytes,
) -> AppResult<Response> {
    guarded(async {
        let op: MoveOperation = parse_body(&body)?;
        let outcome = filestore::move_file(state.remote.as_ref(), state.content.as_ref(), state.index.urls(), &op)
            .await
            .inspect_err(|e| warn!(target: "imgvault::admin", user = %op_user.0, code = e.code_str(), error = %e, "move failed"))?;
        info!(target: "imgvault::admin", user = %op_user.0, from = %op.source_path, to = %op.destination_path, sha = %outcome.destination_sha, "moved");
        Ok(Json(json!({ "success": true })).into_response())
    })
    .await
}

pub async fn delete_file(
    State(state): State<AppState>,
    Extension(op_user): Extension<Operator>,
    body: Bytes,
) -> AppResult<Response> {
    guarded(async {
        let req: DeleteRequest = parse_body(&body)?;
        filestore::delete_file(state.remote.as_ref(), &req.path, &req.sha).await?;
        info!(target: "imgvault::admin", user = %op_user.0, path = %req.path, "deleted");
        Ok(Json(json!({ "success": true })).into_response())
    })
    .await
}

pub async fn index_page(State(state): State<AppState>, headers: HeaderMap) -> Html<String> {
    match session_user(&state, &headers) {
        Some(user) => Html(pages::shell_page(&state.config.admin_route, &user)),
        None => Html(pages::login_page(&state.config.admin_route, None)),
    }
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let cfg = &state.config;
    if !state.credentials.verify(&form.username, &form.password) {
        warn!(target: "imgvault::admin", user = %form.username, "login rejected");
        let page = pages::login_page(&cfg.admin_route, Some("Invalid username or password"));
        return (StatusCode::UNAUTHORIZED, Html(page)).into_response();
    }
    let session = match state.sessions.issue(state.credentials.user()) {
        Ok(s) => s,
        Err(e) => {
            error!(target: "imgvault::admin", error = %e, "login could not start a session");
            return e.into_response();
        }
    };
    info!(target: "imgvault::admin", user = %session.user, "login");
    let mut resp = redirect(&cfg.admin_route);
    set_session_cookie(&mut resp, cfg, &session.token);
    resp
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = parse_cookie(&headers, &state.config.cookie_name) {
        if state.sessions.logout(&token) {
            info!(target: "imgvault::admin", "logout");
        }
    }
    let mut resp = redirect(&state.config.admin_route);
    clear_session_cookie(&mut resp, &state.config);
    resp
}

//! Shared fixtures for integration tests: an app wired to in-memory collaborators and
//! small request helpers.
#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use imgvault::cache::MemoryTtlCache;
use imgvault::config::AppConfig;
use imgvault::identity::OperatorCredentials;
use imgvault::remote::MemoryRemote;
use imgvault::server::{build_router, AppState};

/// Address that passes the default access gate.
pub const CLIENT_IP: &str = "203.0.113.7";

pub struct Harness {
    pub app: Router,
    pub state: AppState,
    pub remote: MemoryRemote,
    pub cache: MemoryTtlCache,
}

pub fn harness() -> Harness {
    harness_with(AppConfig::for_testing())
}

pub fn harness_with(cfg: AppConfig) -> Harness {
    let cfg = cfg.finalize();
    let remote = MemoryRemote::for_config(&cfg);
    let cache = MemoryTtlCache::new();
    let creds = OperatorCredentials::new_insecure_fast(&cfg.admin_user, &cfg.admin_pass).unwrap();
    let state = AppState::new(cfg, Arc::new(remote.clone()), Arc::new(remote.clone()), Arc::new(cache.clone()), creds)
        .unwrap();
    Harness { app: build_router(state.clone()), state, remote, cache }
}

pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).header("cf-connecting-ip", CLIENT_IP).body(Body::empty()).unwrap()
}

pub fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("cf-connecting-ip", CLIENT_IP)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, cookie: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut b = Request::builder()
        .method("POST")
        .uri(uri)
        .header("cf-connecting-ip", CLIENT_IP)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(c) = cookie {
        b = b.header(header::COOKIE, c);
    }
    b.body(Body::from(body.to_string())).unwrap()
}

pub fn post_form(uri: &str, form: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("cf-connecting-ip", CLIENT_IP)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, headers, body)
}

pub async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, _, body) = send(app, req).await;
    let v = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, v)
}

/// Log in as the test operator and return the `name=token` cookie pair.
pub async fn login(app: &Router) -> String {
    let (status, headers, _) = send(app, post_form("/admin/login", "username=admin&password=secret")).await;
    assert_eq!(status, StatusCode::FOUND);
    let set_cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

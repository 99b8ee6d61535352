//! Proxy relay against a mock raw-content host.

mod common;

use axum::http::{header, StatusCode};
use httpmock::prelude::*;

use common::*;
use imgvault::config::AppConfig;

fn config_for(raw_base: &str) -> AppConfig {
    AppConfig { raw_base: raw_base.to_string(), ..AppConfig::for_testing() }
}

#[tokio::test]
async fn relays_bytes_and_rewrites_headers() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }
    let server = MockServer::start_async().await;
    let upstream = server.mock_async(|when, then| {
        when.method(GET)
            .path("/octo/pics/main/img/cat.png")
            .header("referer", format!("{}/", server.base_url()))
            .header("user-agent", "imgvault");
        then.status(200)
            .header("content-type", "image/png")
            .header("content-security-policy", "default-src 'none'")
            .header("x-frame-options", "DENY")
            .header("cache-control", "max-age=300")
            .body("PNGBYTES");
    }).await;

    let h = harness_with(config_for(&server.base_url()));
    let (status, headers, body) = send(&h.app, get("/octo/pics/main/img/cat.png")).await;

    upstream.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"PNGBYTES");
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "image/png");
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "public, max-age=31536000, immutable");
    assert!(headers.get(header::CONTENT_SECURITY_POLICY).is_none());
    assert!(headers.get(header::X_FRAME_OPTIONS).is_none());
}

#[tokio::test]
async fn upstream_404_becomes_fixed_not_found_body() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }
    let server = MockServer::start_async().await;
    server.mock_async(|when, then| {
        when.method(GET).path("/octo/pics/main/missing.png");
        then.status(404).body("404: Not Found (upstream detail)");
    }).await;

    let h = harness_with(config_for(&server.base_url()));
    let (status, headers, body) = send(&h.app, get("/octo/pics/main/missing.png")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(&body[..], b"File not found.");
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn query_string_is_preserved() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }
    let server = MockServer::start_async().await;
    let upstream = server.mock_async(|when, then| {
        when.method(GET).path("/octo/pics/main/a.svg").query_param("v", "2");
        then.status(200).body("<svg/>");
    }).await;

    let h = harness_with(config_for(&server.base_url()));
    let (status, _, body) = send(&h.app, get("/octo/pics/main/a.svg?v=2")).await;
    upstream.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"<svg/>");
}

#[tokio::test]
async fn transport_failure_becomes_502() {
    // Nothing listens on port 9 of localhost; connection is refused.
    let h = harness_with(config_for("http://127.0.0.1:9"));
    let (status, _, body) = send(&h.app, get("/octo/pics/main/a.png")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(&body[..], b"Proxy Error");
}

#[tokio::test]
async fn custom_prefix_maps_onto_repository_root() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }
    let server = MockServer::start_async().await;
    let upstream = server.mock_async(|when, then| {
        when.method(GET).path("/octo/pics/main/x/y.gif");
        then.status(200).body("GIF");
    }).await;

    let cfg = AppConfig { proxy_prefix: "/cdn".into(), ..config_for(&server.base_url()) };
    let h = harness_with(cfg);
    let (status, _, body) = send(&h.app, get("/cdn/x/y.gif")).await;
    upstream.assert_async().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"GIF");
}

#[tokio::test]
async fn dot_segments_cannot_escape_the_repository() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }
    let server = MockServer::start_async().await;
    let other = server.mock_async(|when, then| {
        when.method(GET).path("/evil/repo/main/x.png");
        then.status(200).body("OTHER-REPO");
    }).await;

    let h = harness_with(config_for(&server.base_url()));
    for uri in [
        "/octo/pics/main/../../../evil/repo/main/x.png",
        "/octo/pics/main/%2e%2e/%2E%2E/%2e%2e/evil/repo/main/x.png",
        "/octo/pics/main/img/..%2F..%2F..%2F..%2Fevil/repo/main/x.png",
        "/octo/pics/main/./x.png",
    ] {
        let (status, headers, body) = send(&h.app, get(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(&body[..], b"File not found.");
        assert!(headers.get(header::CACHE_CONTROL).is_none());
    }
    assert_eq!(other.hits_async().await, 0);
}

use super::*;

fn retry() -> RetryDelete {
    RetryDelete { path: "a.png".into(), sha: "abc".into() }
}

#[test]
fn http_status_mapping() {
    assert_eq!(AppError::upstream("down").http_status(), 500);
    assert_eq!(AppError::write_rejected("409").http_status(), 500);
    assert_eq!(AppError::SourceFetchFailed("x".into()).http_status(), 500);
    assert_eq!(AppError::DestinationWriteFailed("x".into()).http_status(), 500);
    assert_eq!(AppError::SourceDeleteFailed { message: "x".into(), retry: retry() }.http_status(), 500);
    assert_eq!(AppError::InvalidDestination("same".into()).http_status(), 500);
    assert_eq!(AppError::invalid("bad").http_status(), 500);
    assert_eq!(AppError::internal("panic").http_status(), 500);
    assert_eq!(AppError::Unauthorized.http_status(), 401);
    assert_eq!(AppError::ProxyTransport("reset".into()).http_status(), 502);
}

#[test]
fn only_source_delete_is_partial() {
    assert!(AppError::SourceDeleteFailed { message: "x".into(), retry: retry() }.is_partial());
    assert!(!AppError::DestinationWriteFailed("x".into()).is_partial());
    assert!(!AppError::SourceFetchFailed("x".into()).is_partial());
}

#[tokio::test]
async fn unauthorized_body_shape() {
    let resp = AppError::Unauthorized.into_response();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], br#"{"error":"Unauthorized"}"#);
}

#[tokio::test]
async fn partial_move_body_carries_retry() {
    let resp = AppError::SourceDeleteFailed { message: "delete failed".into(), retry: retry() }.into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["error"], "delete failed");
    assert_eq!(v["stage"], "written");
    assert_eq!(v["retry"]["path"], "a.png");
    assert_eq!(v["retry"]["sha"], "abc");
}

//! Unified application error model and mapping helpers.
//! Every layer (remote client, index, move saga, HTTP handlers) reports failures through
//! `AppError`; the HTTP boundary turns them into a JSON `{error}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::filestore::ops::MoveStage;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Read call against the upstream API failed or returned non-success.
    #[error("{0}")]
    UpstreamUnavailable(String),
    /// Write/delete call against the upstream API failed or returned non-success.
    #[error("{0}")]
    UpstreamWriteRejected(String),
    #[error("{0}")]
    SourceFetchFailed(String),
    #[error("{0}")]
    DestinationWriteFailed(String),
    /// The destination was written but the source could not be deleted: two copies exist.
    #[error("{message}")]
    SourceDeleteFailed { message: String, retry: RetryDelete },
    #[error("{0}")]
    InvalidDestination(String),
    #[error("{0}")]
    ProxyTransport(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    Internal(String),
}

/// What an operator needs to finish a half-done move by deleting the source alone.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RetryDelete {
    pub path: String,
    pub sha: String,
}

impl AppError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AppError::UpstreamUnavailable(_) => "upstream_unavailable",
            AppError::UpstreamWriteRejected(_) => "upstream_write_rejected",
            AppError::SourceFetchFailed(_) => "source_fetch_failed",
            AppError::DestinationWriteFailed(_) => "destination_write_failed",
            AppError::SourceDeleteFailed { .. } => "source_delete_failed",
            AppError::InvalidDestination(_) => "invalid_destination",
            AppError::ProxyTransport(_) => "proxy_transport_error",
            AppError::Unauthorized => "unauthorized",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Map to HTTP status code. Everything except auth and the proxy's transport failure
    /// collapses to 500 at the admin boundary.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Unauthorized => 401,
            AppError::ProxyTransport(_) => 502,
            _ => 500,
        }
    }

    /// True when the failure left upstream state half-changed (move written, source not deleted).
    pub fn is_partial(&self) -> bool {
        matches!(self, AppError::SourceDeleteFailed { .. })
    }

    pub fn upstream<S: Into<String>>(msg: S) -> Self { AppError::UpstreamUnavailable(msg.into()) }
    pub fn write_rejected<S: Into<String>>(msg: S) -> Self { AppError::UpstreamWriteRejected(msg.into()) }
    pub fn invalid<S: Into<String>>(msg: S) -> Self { AppError::InvalidRequest(msg.into()) }
    pub fn internal<S: Into<String>>(msg: S) -> Self { AppError::Internal(msg.into()) }
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<MoveStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry: Option<RetryDelete>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = match &self {
            AppError::SourceDeleteFailed { message, retry } => ErrorBody {
                error: message.clone(),
                stage: Some(MoveStage::Written),
                retry: Some(retry.clone()),
            },
            other => ErrorBody { error: other.message(), stage: None, retry: None },
        };
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Default mapping: treat as Internal unless mapped explicitly elsewhere
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;

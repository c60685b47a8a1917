//! Server error types with HTTP status code mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kg_sync_protocol::ErrorReportResult;
use kg_sync_service::SyncError;
use serde::Serialize;
use thiserror::Error;

/// Server error type wrapping synchronization errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{0}")]
    Sync(#[from] SyncError),

    /// The run finished but some records could not be indexed
    #[error("Some records could not be indexed")]
    RecordErrors(ErrorReportResult),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Startup configuration problem
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServerError {
    /// Map error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Upstream status passthrough, 502 when the upstream never answered
            ServerError::Sync(SyncError::Graph { status, .. })
            | ServerError::Sync(SyncError::Store { status, .. }) => status
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::BAD_GATEWAY),

            ServerError::Sync(SyncError::UnknownType(_)) | ServerError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,

            ServerError::Sync(SyncError::Mapping(_))
            | ServerError::Sync(SyncError::Json(_))
            | ServerError::Sync(SyncError::Config(_))
            | ServerError::RecordErrors(_)
            | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ServerError::BadRequest(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        ServerError::Config(msg.into())
    }
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            ServerError::RecordErrors(report) => (status, Json(report)).into_response(),
            other => {
                if status.is_server_error() {
                    tracing::error!(error = %other, status = status.as_u16(), "request failed");
                }
                let body = ErrorResponse {
                    error: other.to_string(),
                    status: status.as_u16(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

/// Result type for handlers
pub type Result<T> = std::result::Result<T, ServerError>;

//! Error types for larder-api

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::gousto::GoustoError;
use crate::ingest::IngestError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g., recipe already stored
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upstream payload understood as a request but unusable (422)
    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    /// Upstream service unreachable or misbehaving (502)
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// larder-common error
    #[error("Common error: {0}")]
    Common(#[from] larder_common::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::AlreadyExists { slug } => {
                ApiError::Conflict(format!("Recipe already exists for slug '{}'", slug))
            }
            IngestError::Failed { slug, cause } => {
                if cause.is_transport() {
                    ApiError::UpstreamUnavailable(format!(
                        "Could not fetch '{}': {}",
                        slug, cause
                    ))
                } else {
                    ApiError::Unprocessable(format!("Could not ingest '{}': {}", slug, cause))
                }
            }
            IngestError::Discovery(cause) => match cause {
                GoustoError::Transport(_) | GoustoError::EndOfListing => {
                    ApiError::UpstreamUnavailable(cause.to_string())
                }
                other => ApiError::Unprocessable(other.to_string()),
            },
            IngestError::Storage(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Unprocessable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE",
                msg,
            ),
            ApiError::UpstreamUnavailable(msg) => (
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_UNAVAILABLE",
                msg,
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg,
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

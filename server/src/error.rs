use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use llm_core::LlmError;
use serde::Serialize;
use thiserror::Error;

/// Errors reported to the caller before streaming starts
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error response structure
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ErrorResponse { error: error_message })).into_response()
    }
}

/// Failures after the 200 has gone out.
///
/// These never become a response of their own. Yielding one from the body
/// stream aborts the chunked body, so the caller sees a broken read instead
/// of a clean end.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("upstream generation failed: {0}")]
    Upstream(#[from] LlmError),

    #[error("stream exceeded its {0:?} deadline")]
    DeadlineExceeded(Duration),
}

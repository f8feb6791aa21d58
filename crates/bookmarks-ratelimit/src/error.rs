//! Rate limiting error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RateLimitError {
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    Exceeded { retry_after_secs: u64 },

    #[error("Rate limit store error: {0}")]
    Store(String),

    #[error("Invalid rate limit policy: {0}")]
    InvalidPolicy(String),
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            RateLimitError::Exceeded { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "TOO_MANY_REQUESTS",
                "Too many requests, please try again later.",
            ),
            RateLimitError::Store(_) | RateLimitError::InvalidPolicy(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "Internal error",
            ),
        };

        let body = axum::Json(json!({
            "code": code,
            "message": message,
            "error": { "message": message },
            "serverTime": Utc::now().timestamp_millis(),
        }));

        (status, body).into_response()
    }
}

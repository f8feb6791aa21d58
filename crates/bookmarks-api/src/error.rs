//! API error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bookmarks_auth::AuthError;
use bookmarks_db::DbError;
use bookmarks_ratelimit::RateLimitError;
use thiserror::Error;
use tracing::error;

use crate::response::error_response;
use crate::validation::FieldError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed ({} fields)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Rate limit error: {0}")]
    RateLimit(#[from] RateLimitError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(details) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "Validation Error".to_string(),
                    Some(details),
                );
            }
            // The auth and rate-limit layers own their outward shapes
            ApiError::Auth(e) => return e.into_response(),
            ApiError::RateLimit(e) => return e.into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            ApiError::Database(e) => match e {
                DbError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
                DbError::Duplicate(msg) | DbError::Conflict(msg) => (StatusCode::CONFLICT, msg),
                e => {
                    error!("Database error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal Server Error".to_string(),
                    )
                }
            },
        };

        error_response::<()>(status, message, None)
    }
}

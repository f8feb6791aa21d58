//! Authentication error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde_json::json;
use thiserror::Error;

use crate::jwt::TokenError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing or malformed authorization header")]
    MissingCredential,

    #[error("Invalid or expired token: {0}")]
    InvalidOrExpiredToken(#[from] TokenError),

    #[error("Token subject no longer exists")]
    IdentityGone,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl AuthError {
    /// Short label used in logs and metrics; never sent to the client
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::InvalidOrExpiredToken(_) => "invalid_or_expired_token",
            AuthError::IdentityGone => "identity_gone",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::Configuration(_) => "configuration",
            AuthError::PasswordHash(_) => "password_hash",
            AuthError::Jwt(_) => "jwt",
        }
    }

    /// Whether this error is one of the request-time rejections that
    /// collapse into a single unauthorized response
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::MissingCredential
                | AuthError::InvalidOrExpiredToken(_)
                | AuthError::IdentityGone
        )
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AuthError::MissingCredential
            | AuthError::InvalidOrExpiredToken(_)
            | AuthError::IdentityGone => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Unauthorized"),
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Invalid email or password",
            ),
            AuthError::Configuration(_) | AuthError::PasswordHash(_) | AuthError::Jwt(_) => (
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

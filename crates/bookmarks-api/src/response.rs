//! Response envelope
//!
//! Every JSON body has the shape
//! `{code, message, data?, error?: {message, details?}, serverTime}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;

/// Error portion of the envelope
#[derive(Debug, Serialize)]
pub struct ErrorBody<D: Serialize> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<D>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T: Serialize, D: Serialize = ()> {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody<D>>,
    pub server_time: i64,
}

/// Envelope code for an error status
pub fn error_code(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "BAD_REQUEST",
        StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
        StatusCode::FORBIDDEN => "FORBIDDEN",
        StatusCode::NOT_FOUND => "NOT_FOUND",
        StatusCode::CONFLICT => "CONFLICT",
        StatusCode::UNPROCESSABLE_ENTITY => "VALIDATION_ERROR",
        StatusCode::TOO_MANY_REQUESTS => "TOO_MANY_REQUESTS",
        StatusCode::INTERNAL_SERVER_ERROR => "INTERNAL_SERVER_ERROR",
        _ => "ERROR",
    }
}

/// Build an error response body
pub fn error_response<D: Serialize>(
    status: StatusCode,
    message: String,
    details: Option<D>,
) -> Response {
    let body = Envelope::<(), D> {
        code: error_code(status).to_string(),
        message: message.clone(),
        data: None,
        error: Some(ErrorBody { message, details }),
        server_time: Utc::now().timestamp_millis(),
    };
    (status, Json(body)).into_response()
}

/// Successful response carrying `data`
pub struct ApiResponse<T: Serialize> {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with data
    pub fn ok(code: &'static str, message: &'static str, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            code,
            message,
            data: Some(data),
        }
    }

    /// 201 with data
    pub fn created(code: &'static str, message: &'static str, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            code,
            message,
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// 200 with no data
    pub fn empty(code: &'static str, message: &'static str) -> Self {
        Self {
            status: StatusCode::OK,
            code,
            message,
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope::<T> {
            code: self.code.to_string(),
            message: self.message.to_string(),
            data: self.data,
            error: None,
            server_time: Utc::now().timestamp_millis(),
        };
        (self.status, Json(body)).into_response()
    }
}

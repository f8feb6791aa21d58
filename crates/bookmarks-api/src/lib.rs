//! Bookmarks REST API
//!
//! This crate provides the Axum-based HTTP API for the bookmarks service:
//! account registration and login, token refresh, and the protected
//! bookmark, category and tag routes.

pub mod error;
pub mod extract;
pub mod response;
pub mod routes;
pub mod state;
pub mod validation;

pub use error::ApiError;
pub use response::ApiResponse;
pub use routes::create_router;
pub use state::{AppState, LimitSettings, MetricsHandle, RateLimits};

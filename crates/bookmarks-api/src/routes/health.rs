//! Health check endpoints

use axum::{Json, Router, routing::get};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health status response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
}

/// Health check handler
async fn health() -> Json<HealthResponse> {
    metrics::counter!("bookmarks_health_checks_total").increment(1);

    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

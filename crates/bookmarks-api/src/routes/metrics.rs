//! Prometheus metrics endpoint

use axum::{Router, extract::State, response::IntoResponse, routing::get};

use crate::state::MetricsHandle;

/// Create metrics routes with the Prometheus handle
pub fn routes(handle: MetricsHandle) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(handle)
}

/// GET /metrics
async fn render_metrics(State(handle): State<MetricsHandle>) -> impl IntoResponse {
    handle.render()
}

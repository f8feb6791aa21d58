//! Tag routes

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

use super::types::{PopularTagsParams, PopularTagsResponse, TagListResponse};

const DEFAULT_POPULAR_LIMIT: i64 = 10;
const MAX_POPULAR_LIMIT: i64 = 100;

/// GET /tags
async fn list_tags(State(state): State<AppState>) -> Result<ApiResponse<TagListResponse>, ApiError> {
    let tags = state.db.list_tags().await?;

    Ok(ApiResponse::ok(
        "TAGS_RETRIEVED",
        "Tags retrieved successfully",
        TagListResponse { tags },
    ))
}

/// GET /tags/popular
async fn popular_tags(
    State(state): State<AppState>,
    Query(params): Query<PopularTagsParams>,
) -> Result<ApiResponse<PopularTagsResponse>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_POPULAR_LIMIT)
        .clamp(1, MAX_POPULAR_LIMIT);
    let tags = state.db.popular_tags(limit).await?;

    Ok(ApiResponse::ok(
        "TAGS_RETRIEVED",
        "Popular tags retrieved successfully",
        PopularTagsResponse { tags },
    ))
}

/// Create tag routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags))
        .route("/tags/popular", get(popular_tags))
}

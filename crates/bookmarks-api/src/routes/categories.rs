//! Category routes

use axum::{
    Router,
    extract::{Path, State},
    middleware,
    routing::{get, put},
};
use bookmarks_auth::AuthUser;
use bookmarks_db::{Category, NewCategory};
use bookmarks_ratelimit::rate_limit_middleware;
use tracing::info;

use crate::error::ApiError;
use crate::extract::AppJson;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::Validator;

use super::types::{CategoryEnvelope, CategoryListResponse, CategoryRequest};

const NAME_LENGTH: (usize, usize) = (1, 100);

fn validated_name(request: CategoryRequest) -> Result<String, ApiError> {
    let name = request.name.trim().to_string();
    Validator::new()
        .length("name", &name, NAME_LENGTH.0, NAME_LENGTH.1)
        .finish()?;
    Ok(name)
}

async fn owned_category(state: &AppState, id: i64, user_id: i64) -> Result<Category, ApiError> {
    let category = state
        .db
        .get_category(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

    if category.user_id != user_id {
        return Err(ApiError::Forbidden(
            "You do not have permission to access this category".to_string(),
        ));
    }
    Ok(category)
}

/// GET /categories
async fn list_categories(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ApiResponse<CategoryListResponse>, ApiError> {
    let categories = state.db.list_categories(user.id).await?;

    Ok(ApiResponse::ok(
        "CATEGORIES_RETRIEVED",
        "Categories retrieved successfully",
        CategoryListResponse { categories },
    ))
}

/// POST /categories
async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(request): AppJson<CategoryRequest>,
) -> Result<ApiResponse<CategoryEnvelope>, ApiError> {
    let name = validated_name(request)?;

    let category = state
        .db
        .insert_category(NewCategory {
            user_id: user.id,
            name,
        })
        .await?;

    info!("User {} created category {}", user.id, category.id);

    Ok(ApiResponse::created(
        "CATEGORY_CREATED",
        "Category created successfully",
        CategoryEnvelope { category },
    ))
}

/// PUT /categories/{id}
async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    AppJson(request): AppJson<CategoryRequest>,
) -> Result<ApiResponse<CategoryEnvelope>, ApiError> {
    let name = validated_name(request)?;
    owned_category(&state, id, user.id).await?;

    let category = state.db.update_category(id, user.id, &name).await?;

    Ok(ApiResponse::ok(
        "CATEGORY_UPDATED",
        "Category updated successfully",
        CategoryEnvelope { category },
    ))
}

/// DELETE /categories/{id}
async fn delete_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>, ApiError> {
    owned_category(&state, id, user.id).await?;
    state.db.delete_category(id, user.id).await?;

    info!("User {} deleted category {}", user.id, id);

    Ok(ApiResponse::empty(
        "CATEGORY_DELETED",
        "Category deleted successfully",
    ))
}

/// Create category routes
pub fn routes(state: &AppState) -> Router<AppState> {
    let list_limit = middleware::from_fn_with_state(
        state.limits.categories_list.clone(),
        rate_limit_middleware,
    );

    Router::new()
        .route(
            "/categories",
            get(list_categories).layer(list_limit).post(create_category),
        )
        .route(
            "/categories/{id}",
            put(update_category).delete(delete_category),
        )
}

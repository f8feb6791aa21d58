//! Bookmark routes

use axum::{
    Router,
    extract::{Path, Query, State},
    middleware,
    routing::get,
};
use bookmarks_auth::AuthUser;
use bookmarks_db::{Bookmark, BookmarkQuery, BookmarkUpdate, NewBookmark, Tag};
use bookmarks_ratelimit::rate_limit_middleware;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::extract::AppJson;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::Validator;

use super::types::{
    BookmarkEnvelope, BookmarkListResponse, BookmarkView, CreateBookmarkRequest,
    ListBookmarksParams, Pagination, UpdateBookmarkRequest,
};

const TITLE_LENGTH: (usize, usize) = (1, 255);
const DESCRIPTION_MAX: usize = 1000;
const TAG_NAME_MAX: usize = 50;
const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

// ==================== Helpers ====================

/// Load a bookmark and confirm `user_id` owns it
async fn owned_bookmark(state: &AppState, id: i64, user_id: i64) -> Result<Bookmark, ApiError> {
    let bookmark = state
        .db
        .get_bookmark(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Bookmark not found".to_string()))?;

    if bookmark.user_id != user_id {
        return Err(ApiError::Forbidden(
            "You do not have permission to access this bookmark".to_string(),
        ));
    }
    Ok(bookmark)
}

/// A bookmark may only be filed under one of its owner's categories
async fn check_category(state: &AppState, category_id: i64, user_id: i64) -> Result<(), ApiError> {
    match state.db.get_category(category_id).await? {
        Some(category) if category.user_id == user_id => Ok(()),
        _ => Err(ApiError::BadRequest(format!(
            "Category {} does not exist",
            category_id
        ))),
    }
}

fn validate_tags(validator: &mut Validator, tags: &[String]) {
    for (i, tag) in tags.iter().enumerate() {
        validator.length(&format!("tags.{}", i), tag.trim(), 1, TAG_NAME_MAX);
    }
}

/// Find or create each named tag, dropping duplicates after normalisation
async fn resolve_tags(state: &AppState, names: &[String]) -> Result<Vec<Tag>, ApiError> {
    let mut seen = HashSet::new();
    let mut tags = Vec::with_capacity(names.len());
    for name in names {
        let tag = state.db.find_or_create_tag(name).await?;
        if seen.insert(tag.id) {
            tags.push(tag);
        }
    }
    Ok(tags)
}

async fn view(state: &AppState, bookmark: Bookmark) -> Result<BookmarkView, ApiError> {
    let tags = state.db.bookmark_tags(bookmark.id).await?;
    Ok(BookmarkView { bookmark, tags })
}

fn parse_or<T: std::str::FromStr>(value: Option<&str>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

impl ListBookmarksParams {
    fn into_query(self, user_id: i64) -> BookmarkQuery {
        let tags = self
            .tags
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        BookmarkQuery {
            user_id,
            category_id: self.category_id.as_deref().and_then(|v| v.trim().parse().ok()),
            search: self.search.filter(|s| !s.trim().is_empty()),
            tags,
            page: parse_or::<i64>(self.page.as_deref(), 1).max(1),
            limit: parse_or::<i64>(self.limit.as_deref(), DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }
}

// ==================== Bookmark Routes ====================

/// GET /bookmarks
async fn list_bookmarks(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<ListBookmarksParams>,
) -> Result<ApiResponse<BookmarkListResponse>, ApiError> {
    let query = params.into_query(user.id);
    let page = state.db.list_bookmarks(&query).await?;

    let mut bookmarks = Vec::with_capacity(page.bookmarks.len());
    for bookmark in page.bookmarks {
        bookmarks.push(view(&state, bookmark).await?);
    }

    Ok(ApiResponse::ok(
        "BOOKMARKS_RETRIEVED",
        "Bookmarks retrieved successfully",
        BookmarkListResponse {
            bookmarks,
            pagination: Pagination {
                total: page.total,
                page: query.page,
                limit: query.limit,
                pages: (page.total + query.limit - 1) / query.limit,
            },
        },
    ))
}

/// POST /bookmarks
async fn create_bookmark(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(request): AppJson<CreateBookmarkRequest>,
) -> Result<ApiResponse<BookmarkEnvelope>, ApiError> {
    let mut validator = Validator::new();
    validator
        .url("url", &request.url)
        .length("title", &request.title, TITLE_LENGTH.0, TITLE_LENGTH.1);
    if let Some(description) = &request.description {
        validator.length("description", description, 0, DESCRIPTION_MAX);
    }
    if let Some(category_id) = request.category_id {
        validator.positive("category_id", category_id);
    }
    if let Some(preview_image) = &request.preview_image {
        validator.url("preview_image", preview_image);
    }
    validate_tags(&mut validator, request.tags.as_deref().unwrap_or_default());
    validator.finish()?;

    if let Some(category_id) = request.category_id {
        check_category(&state, category_id, user.id).await?;
    }

    let bookmark = state
        .db
        .insert_bookmark(NewBookmark {
            user_id: user.id,
            category_id: request.category_id,
            url: request.url,
            title: request.title,
            description: request.description,
            preview_image: request.preview_image,
        })
        .await?;

    if let Some(names) = &request.tags {
        let tag_ids: Vec<i64> = resolve_tags(&state, names).await?.iter().map(|t| t.id).collect();
        state.db.add_bookmark_tags(bookmark.id, &tag_ids).await?;
    }

    info!("User {} created bookmark {}", user.id, bookmark.id);

    Ok(ApiResponse::created(
        "BOOKMARK_CREATED",
        "Bookmark created successfully",
        BookmarkEnvelope {
            bookmark: view(&state, bookmark).await?,
        },
    ))
}

/// GET /bookmarks/{id}
async fn get_bookmark(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<ApiResponse<BookmarkEnvelope>, ApiError> {
    let bookmark = owned_bookmark(&state, id, user.id).await?;

    Ok(ApiResponse::ok(
        "BOOKMARK_RETRIEVED",
        "Bookmark retrieved successfully",
        BookmarkEnvelope {
            bookmark: view(&state, bookmark).await?,
        },
    ))
}

/// PUT /bookmarks/{id}
async fn update_bookmark(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    AppJson(request): AppJson<UpdateBookmarkRequest>,
) -> Result<ApiResponse<BookmarkEnvelope>, ApiError> {
    let existing = owned_bookmark(&state, id, user.id).await?;

    let mut validator = Validator::new();
    if let Some(url) = &request.url {
        validator.url("url", url);
    }
    if let Some(title) = &request.title {
        validator.length("title", title, TITLE_LENGTH.0, TITLE_LENGTH.1);
    }
    if let Some(Some(description)) = &request.description {
        validator.length("description", description, 0, DESCRIPTION_MAX);
    }
    if let Some(Some(category_id)) = request.category_id {
        validator.positive("category_id", category_id);
    }
    if let Some(Some(preview_image)) = &request.preview_image {
        validator.url("preview_image", preview_image);
    }
    validate_tags(&mut validator, request.tags.as_deref().unwrap_or_default());
    validator.finish()?;

    if let Some(Some(category_id)) = request.category_id {
        check_category(&state, category_id, user.id).await?;
    }

    let update = BookmarkUpdate {
        category_id: request.category_id,
        url: request.url,
        title: request.title,
        description: request.description,
        preview_image: request.preview_image,
    };
    let bookmark = if update.is_empty() {
        existing
    } else {
        state.db.update_bookmark(id, user.id, &update).await?
    };

    if let Some(names) = &request.tags {
        let wanted = resolve_tags(&state, names).await?;
        let current = state.db.bookmark_tags(id).await?;

        let wanted_ids: HashSet<i64> = wanted.iter().map(|t| t.id).collect();
        let current_ids: HashSet<i64> = current.iter().map(|t| t.id).collect();

        let to_add: Vec<i64> = wanted_ids.difference(&current_ids).copied().collect();
        let to_remove: Vec<i64> = current_ids.difference(&wanted_ids).copied().collect();

        debug!(
            "Bookmark {}: adding {} tags, removing {}",
            id,
            to_add.len(),
            to_remove.len()
        );
        state.db.add_bookmark_tags(id, &to_add).await?;
        state.db.remove_bookmark_tags(id, &to_remove).await?;
    }

    Ok(ApiResponse::ok(
        "BOOKMARK_UPDATED",
        "Bookmark updated successfully",
        BookmarkEnvelope {
            bookmark: view(&state, bookmark).await?,
        },
    ))
}

/// DELETE /bookmarks/{id}
async fn delete_bookmark(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<ApiResponse<()>, ApiError> {
    owned_bookmark(&state, id, user.id).await?;

    if !state.db.delete_bookmark(id, user.id).await? {
        return Err(ApiError::NotFound("Bookmark not found".to_string()));
    }

    info!("User {} deleted bookmark {}", user.id, id);

    Ok(ApiResponse::empty(
        "BOOKMARK_DELETED",
        "Bookmark deleted successfully",
    ))
}

/// Create bookmark routes
///
/// Listing carries its own limiter on top of the group-wide one.
pub fn routes(state: &AppState) -> Router<AppState> {
    let list_limit =
        middleware::from_fn_with_state(state.limits.bookmarks_list.clone(), rate_limit_middleware);

    Router::new()
        .route(
            "/bookmarks",
            get(list_bookmarks).layer(list_limit).post(create_bookmark),
        )
        .route(
            "/bookmarks/{id}",
            get(get_bookmark).put(update_bookmark).delete(delete_bookmark),
        )
}

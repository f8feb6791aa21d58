//! Request/Response DTOs

use bookmarks_db::{Bookmark, Category, Tag, TagUsage, User};
use serde::{Deserialize, Serialize};

use crate::validation::double_option;

// ==================== Auth Types ====================

/// Registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token refresh request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Public view of an account
#[derive(Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

/// Registration and login response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: UserSummary,
    pub token: String,
    pub refresh_token: String,
}

/// Token refresh response
#[derive(Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

// ==================== Bookmark Types ====================

/// Create bookmark request
#[derive(Deserialize)]
pub struct CreateBookmarkRequest {
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub preview_image: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Update bookmark request
///
/// Nullable fields distinguish "absent" (unchanged) from `null` (cleared).
#[derive(Deserialize)]
pub struct UpdateBookmarkRequest {
    pub url: Option<String>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub preview_image: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

/// Bookmark list query parameters
///
/// Kept as raw strings; unparseable numbers fall back to defaults.
#[derive(Deserialize, Default)]
pub struct ListBookmarksParams {
    pub category_id: Option<String>,
    pub search: Option<String>,
    /// Comma-separated tag names
    pub tags: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Bookmark with its tags
#[derive(Serialize)]
pub struct BookmarkView {
    #[serde(flatten)]
    pub bookmark: Bookmark,
    pub tags: Vec<Tag>,
}

#[derive(Serialize)]
pub struct BookmarkEnvelope {
    pub bookmark: BookmarkView,
}

#[derive(Serialize)]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

#[derive(Serialize)]
pub struct BookmarkListResponse {
    pub bookmarks: Vec<BookmarkView>,
    pub pagination: Pagination,
}

// ==================== Category Types ====================

/// Create or rename category request
#[derive(Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Serialize)]
pub struct CategoryEnvelope {
    pub category: Category,
}

#[derive(Serialize)]
pub struct CategoryListResponse {
    pub categories: Vec<Category>,
}

// ==================== Tag Types ====================

#[derive(Deserialize, Default)]
pub struct PopularTagsParams {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct TagListResponse {
    pub tags: Vec<Tag>,
}

#[derive(Serialize)]
pub struct PopularTagsResponse {
    pub tags: Vec<TagUsage>,
}

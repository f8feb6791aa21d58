//! Database models

use crate::utils::parse_datetime_or_now;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;

/// User model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Number of bookmarks filed under this category (only set by listings)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmark_count: Option<i64>,
}

/// Bookmark model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: i64,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub preview_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tag model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Tag with the number of bookmarks carrying it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagUsage {
    pub id: i64,
    pub name: String,
    pub count: i64,
}

/// New user (for insertion)
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// New category (for insertion)
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub user_id: i64,
    pub name: String,
}

/// New bookmark (for insertion)
#[derive(Debug, Clone)]
pub struct NewBookmark {
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub preview_image: Option<String>,
}

/// Partial bookmark update
///
/// The outer `Option` means "leave unchanged"; for nullable columns an inner
/// `None` clears the stored value.
#[derive(Debug, Clone, Default)]
pub struct BookmarkUpdate {
    pub category_id: Option<Option<i64>>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub preview_image: Option<Option<String>>,
}

impl BookmarkUpdate {
    pub fn is_empty(&self) -> bool {
        self.category_id.is_none()
            && self.url.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.preview_image.is_none()
    }
}

// ==================== TryFrom Implementations ====================

impl TryFrom<&sqlx::sqlite::SqliteRow> for User {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for Category {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(Category {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
            bookmark_count: row.try_get("bookmark_count").ok(),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for Bookmark {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(Bookmark {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            category_id: row.try_get("category_id")?,
            url: row.try_get("url")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            preview_image: row.try_get("preview_image")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
            updated_at: parse_datetime_or_now(&row.try_get::<String, _>("updated_at")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for Tag {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(Tag {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            created_at: parse_datetime_or_now(&row.try_get::<String, _>("created_at")?),
        })
    }
}

impl TryFrom<&sqlx::sqlite::SqliteRow> for TagUsage {
    type Error = sqlx::Error;

    fn try_from(row: &sqlx::sqlite::SqliteRow) -> Result<Self, Self::Error> {
        Ok(TagUsage {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            count: row.try_get("count")?,
        })
    }
}

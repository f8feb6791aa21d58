//! Bookmark operations

use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite};

use crate::error::DbError;
use crate::models::{Bookmark, BookmarkUpdate, NewBookmark, Tag};
use crate::repository::Database;
use crate::utils::{like_pattern, normalize_tag_name};

const BOOKMARK_COLUMNS: &str = "b.id, b.user_id, b.category_id, b.url, b.title, b.description, \
                                b.preview_image, b.created_at, b.updated_at";

/// Filters and pagination for listing a user's bookmarks
#[derive(Debug, Clone)]
pub struct BookmarkQuery {
    pub user_id: i64,
    pub category_id: Option<i64>,
    /// Substring matched against title, description and URL
    pub search: Option<String>,
    /// Matches bookmarks carrying any of these tags
    pub tags: Vec<String>,
    /// 1-based page number
    pub page: i64,
    pub limit: i64,
}

impl BookmarkQuery {
    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id,
            category_id: None,
            search: None,
            tags: Vec::new(),
            page: 1,
            limit: 10,
        }
    }

    /// Row offset for the requested page; saturates instead of overflowing
    fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.limit)
    }

    fn push_filters<'a>(&'a self, builder: &mut QueryBuilder<'a, Sqlite>) {
        builder.push(" WHERE b.user_id = ").push_bind(self.user_id);

        if let Some(category_id) = self.category_id {
            builder.push(" AND b.category_id = ").push_bind(category_id);
        }

        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            builder
                .push(" AND (b.title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR b.description LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR b.url LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }

        if !self.tags.is_empty() {
            builder.push(
                " AND EXISTS (SELECT 1 FROM bookmark_tags bt JOIN tags t ON t.id = bt.tag_id \
                 WHERE bt.bookmark_id = b.id AND t.name IN (",
            );
            let mut names = builder.separated(", ");
            for tag in &self.tags {
                names.push_bind(normalize_tag_name(tag));
            }
            builder.push("))");
        }
    }
}

/// One page of bookmarks plus the total number of matches
#[derive(Debug, Clone)]
pub struct BookmarkPage {
    pub bookmarks: Vec<Bookmark>,
    pub total: i64,
}

impl Database {
    /// Insert a new bookmark
    pub async fn insert_bookmark(&self, bookmark: NewBookmark) -> Result<Bookmark, DbError> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO bookmarks (user_id, category_id, url, title, description, preview_image, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(bookmark.user_id)
        .bind(bookmark.category_id)
        .bind(&bookmark.url)
        .bind(&bookmark.title)
        .bind(&bookmark.description)
        .bind(&bookmark.preview_image)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        Ok(Bookmark {
            id: result.get("id"),
            user_id: bookmark.user_id,
            category_id: bookmark.category_id,
            url: bookmark.url,
            title: bookmark.title,
            description: bookmark.description,
            preview_image: bookmark.preview_image,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a bookmark by ID
    pub async fn get_bookmark(&self, id: i64) -> Result<Option<Bookmark>, DbError> {
        let result = sqlx::query(&format!(
            "SELECT {} FROM bookmarks b WHERE b.id = ?",
            BOOKMARK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| Bookmark::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// List a user's bookmarks, newest first
    pub async fn list_bookmarks(&self, query: &BookmarkQuery) -> Result<BookmarkPage, DbError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS total FROM bookmarks b");
        query.push_filters(&mut count);
        let total: i64 = count.build().fetch_one(&self.pool).await?.get("total");

        let mut select =
            QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM bookmarks b", BOOKMARK_COLUMNS));
        query.push_filters(&mut select);
        select
            .push(" ORDER BY b.created_at DESC, b.id DESC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset());

        let rows = select.build().fetch_all(&self.pool).await?;
        let bookmarks = rows
            .iter()
            .map(|row| Bookmark::try_from(row).map_err(DbError::from))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BookmarkPage { bookmarks, total })
    }

    /// Apply a partial update to a bookmark owned by `user_id`
    pub async fn update_bookmark(
        &self,
        id: i64,
        user_id: i64,
        update: &BookmarkUpdate,
    ) -> Result<Bookmark, DbError> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE bookmarks SET updated_at = ");
        builder.push_bind(Utc::now().to_rfc3339());

        if let Some(category_id) = update.category_id {
            builder.push(", category_id = ").push_bind(category_id);
        }
        if let Some(url) = &update.url {
            builder.push(", url = ").push_bind(url.clone());
        }
        if let Some(title) = &update.title {
            builder.push(", title = ").push_bind(title.clone());
        }
        if let Some(description) = &update.description {
            builder.push(", description = ").push_bind(description.clone());
        }
        if let Some(preview_image) = &update.preview_image {
            builder.push(", preview_image = ").push_bind(preview_image.clone());
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND user_id = ")
            .push_bind(user_id)
            .push(" RETURNING id, user_id, category_id, url, title, description, preview_image, created_at, updated_at");

        match builder.build().fetch_optional(&self.pool).await? {
            Some(row) => Ok(Bookmark::try_from(&row)?),
            None => Err(DbError::NotFound("Bookmark not found".to_string())),
        }
    }

    /// Delete a bookmark owned by `user_id`
    pub async fn delete_bookmark(&self, id: i64, user_id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM bookmarks WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Attach tags to a bookmark; already attached tags are ignored
    pub async fn add_bookmark_tags(&self, bookmark_id: i64, tag_ids: &[i64]) -> Result<(), DbError> {
        if tag_ids.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("INSERT INTO bookmark_tags (bookmark_id, tag_id) ");
        builder.push_values(tag_ids, |mut row, tag_id| {
            row.push_bind(bookmark_id).push_bind(*tag_id);
        });
        builder.push(" ON CONFLICT (bookmark_id, tag_id) DO NOTHING");
        builder.build().execute(&self.pool).await?;
        Ok(())
    }

    /// Detach tags from a bookmark
    pub async fn remove_bookmark_tags(&self, bookmark_id: i64, tag_ids: &[i64]) -> Result<(), DbError> {
        if tag_ids.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM bookmark_tags WHERE bookmark_id = ");
        builder.push_bind(bookmark_id).push(" AND tag_id IN (");
        let mut ids = builder.separated(", ");
        for tag_id in tag_ids {
            ids.push_bind(*tag_id);
        }
        builder.push(")");
        builder.build().execute(&self.pool).await?;
        Ok(())
    }

    /// Tags attached to a bookmark, ordered by name
    pub async fn bookmark_tags(&self, bookmark_id: i64) -> Result<Vec<Tag>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.name, t.created_at
            FROM tags t
            JOIN bookmark_tags bt ON bt.tag_id = t.id
            WHERE bt.bookmark_id = ?
            ORDER BY t.name
            "#,
        )
        .bind(bookmark_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Tag::try_from(row).map_err(DbError::from))
            .collect()
    }
}

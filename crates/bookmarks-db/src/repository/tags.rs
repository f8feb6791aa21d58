//! Tag operations

use chrono::Utc;

use crate::error::DbError;
use crate::models::{Tag, TagUsage};
use crate::repository::Database;
use crate::utils::normalize_tag_name;

impl Database {
    /// Find a tag by (normalized) name, creating it if it does not exist
    pub async fn find_or_create_tag(&self, name: &str) -> Result<Tag, DbError> {
        let name = normalize_tag_name(name);

        if let Some(tag) = self.get_tag_by_name(&name).await? {
            return Ok(tag);
        }

        // A concurrent insert of the same name is absorbed by the conflict clause
        sqlx::query("INSERT INTO tags (name, created_at) VALUES (?, ?) ON CONFLICT(name) DO NOTHING")
            .bind(&name)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        self.get_tag_by_name(&name)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("Tag: {}", name)))
    }

    /// Get a tag by name
    pub async fn get_tag_by_name(&self, name: &str) -> Result<Option<Tag>, DbError> {
        let result = sqlx::query("SELECT id, name, created_at FROM tags WHERE name = ?")
            .bind(normalize_tag_name(name))
            .fetch_optional(&self.pool)
            .await?;

        result.map(|row| Tag::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// List all tags ordered by name
    pub async fn list_tags(&self) -> Result<Vec<Tag>, DbError> {
        let rows = sqlx::query("SELECT id, name, created_at FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| Tag::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Most used tags, highest count first
    pub async fn popular_tags(&self, limit: i64) -> Result<Vec<TagUsage>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.name, COUNT(bt.bookmark_id) AS count
            FROM tags t
            JOIN bookmark_tags bt ON bt.tag_id = t.id
            GROUP BY t.id, t.name
            ORDER BY count DESC, t.name
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| TagUsage::try_from(row).map_err(DbError::from))
            .collect()
    }
}

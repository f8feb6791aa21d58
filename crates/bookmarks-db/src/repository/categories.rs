//! Category operations

use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{Category, NewCategory};
use crate::repository::Database;

impl Database {
    /// Insert a new category
    pub async fn insert_category(&self, category: NewCategory) -> Result<Category, DbError> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO categories (user_id, name, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(category.user_id)
        .bind(&category.name)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, "Category with this name"))?;

        Ok(Category {
            id: result.get("id"),
            user_id: category.user_id,
            name: category.name,
            created_at: now,
            updated_at: now,
            bookmark_count: None,
        })
    }

    /// Get a category by ID
    pub async fn get_category(&self, id: i64) -> Result<Option<Category>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, user_id, name, created_at, updated_at
            FROM categories
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| Category::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// List a user's categories with their bookmark counts, ordered by name
    pub async fn list_categories(&self, user_id: i64) -> Result<Vec<Category>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.user_id, c.name, c.created_at, c.updated_at,
                   COUNT(b.id) AS bookmark_count
            FROM categories c
            LEFT JOIN bookmarks b ON b.category_id = c.id
            WHERE c.user_id = ?
            GROUP BY c.id
            ORDER BY c.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Category::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Rename a category owned by `user_id`
    pub async fn update_category(
        &self,
        id: i64,
        user_id: i64,
        name: &str,
    ) -> Result<Category, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE categories
            SET name = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING id, user_id, name, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(now.to_rfc3339())
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DbError::from_insert(e, "Category with this name"))?;

        match result {
            Some(row) => Ok(Category::try_from(&row)?),
            None => Err(DbError::NotFound(
                "Category not found or you do not have permission to update it".to_string(),
            )),
        }
    }

    /// Delete a category owned by `user_id`
    ///
    /// Refuses while any bookmark is still filed under it.
    pub async fn delete_category(&self, id: i64, user_id: i64) -> Result<(), DbError> {
        let count: i64 = sqlx::query(
            "SELECT COUNT(*) AS count FROM bookmarks WHERE category_id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?
        .get("count");

        if count > 0 {
            return Err(DbError::Conflict(format!(
                "Cannot delete category with {} bookmarks. Remove or reassign the bookmarks first.",
                count
            )));
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(
                "Category not found or you do not have permission to delete it".to_string(),
            ));
        }
        Ok(())
    }
}

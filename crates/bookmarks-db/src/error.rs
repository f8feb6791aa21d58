//! Database error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Migration error: {0}")]
    Migration(String),
}

impl DbError {
    /// Map a sqlx error to `Duplicate` when it is a unique-constraint violation
    pub(crate) fn from_insert(err: sqlx::Error, what: &str) -> Self {
        match err.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => {
                DbError::Duplicate(format!("{} already exists", what))
            }
            _ => DbError::Connection(err),
        }
    }
}

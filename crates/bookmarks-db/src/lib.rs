//! Bookmarks Database Layer
//!
//! This crate provides the persistence layer for the bookmarks service,
//! using SQLite via sqlx for users, bookmarks, categories and tags.

pub mod error;
pub mod models;
pub mod repository;
pub mod utils;

pub use error::DbError;
pub use models::*;
pub use repository::{BookmarkPage, BookmarkQuery, Database};

/// Re-export sqlx types for convenience
pub use sqlx::SqlitePool;

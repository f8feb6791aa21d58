//! Shared utility functions

use chrono::{DateTime, Utc};

/// Parse a datetime string (RFC3339 format) or return current time
///
/// Rows store timestamps as RFC3339 text; a value that fails to parse
/// falls back to the current time rather than failing the whole row.
pub fn parse_datetime_or_now(s: &str) -> DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Normalize a tag name for storage and lookup
///
/// # Examples
///
/// ```
/// use bookmarks_db::utils::normalize_tag_name;
///
/// assert_eq!(normalize_tag_name("  Rust "), "rust");
/// ```
pub fn normalize_tag_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Escape `%`, `_` and `\` so user input is matched literally inside a LIKE pattern
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

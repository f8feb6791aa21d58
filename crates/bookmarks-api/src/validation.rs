//! Request field validation

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::error::ApiError;

/// A single rejected field
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

/// Collects field errors so a request reports all of them at once
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    fn reject(&mut self, path: &str, message: String) {
        self.errors.push(FieldError {
            path: path.to_string(),
            message,
        });
    }

    /// Length in characters must fall within `min..=max`
    pub fn length(&mut self, path: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let len = value.chars().count();
        if len < min {
            self.reject(path, format!("Must be at least {} characters", min));
        } else if len > max {
            self.reject(path, format!("Must be at most {} characters", max));
        }
        self
    }

    pub fn email(&mut self, path: &str, value: &str) -> &mut Self {
        if !is_email(value) {
            self.reject(path, "Invalid email".to_string());
        }
        self
    }

    pub fn url(&mut self, path: &str, value: &str) -> &mut Self {
        if Url::parse(value).is_err() {
            self.reject(path, "Invalid url".to_string());
        }
        self
    }

    pub fn positive(&mut self, path: &str, value: i64) -> &mut Self {
        if value <= 0 {
            self.reject(path, "Must be a positive integer".to_string());
        }
        self
    }

    pub fn finish(&mut self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

/// Minimal address check: one `@`, a non-empty local part, and a dotted domain
fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty())
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Deserialize a field where absent, `null` and a value are all distinct
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`: an
/// absent field stays `None`, `null` becomes `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

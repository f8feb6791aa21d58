//! Rate limit record store trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::RateLimitError;

/// Request count for one key within its current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u64,
    pub window_reset_at: DateTime<Utc>,
}

impl RateLimitRecord {
    /// A window has elapsed once `now` reaches its reset instant
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.window_reset_at
    }
}

/// Computes the next record from the current one (if any)
pub type RecordUpdate<'a> = &'a (dyn Fn(Option<RateLimitRecord>) -> RateLimitRecord + Send + Sync);

/// Rate limit record store
///
/// The in-process implementation is [`crate::InMemoryStore`]; a
/// multi-instance deployment would back this with a shared key-value
/// service instead.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Get the record for a key
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, RateLimitError>;

    /// Overwrite the record for a key
    async fn set(&self, key: &str, record: RateLimitRecord) -> Result<(), RateLimitError>;

    /// Delete the record for a key
    async fn delete(&self, key: &str) -> Result<bool, RateLimitError>;

    /// Replace the record for a key with `apply(current)` as one atomic step
    ///
    /// No other update, set or sweep of the same key may interleave between
    /// reading the current record and writing the new one.
    async fn update(
        &self,
        key: &str,
        apply: RecordUpdate<'_>,
    ) -> Result<RateLimitRecord, RateLimitError>;

    /// Remove every record whose window has elapsed at `now`
    async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, RateLimitError>;

    /// Number of records currently held
    async fn len(&self) -> Result<usize, RateLimitError>;
}

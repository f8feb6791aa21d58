//! In-process record store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::error::RateLimitError;
use crate::store::{RateLimitRecord, RateLimitStore, RecordUpdate};

/// Record store backed by a mutex-guarded map
///
/// The lock is never held across an await point.
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<HashMap<String, RateLimitRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, RateLimitError> {
        Ok(self.records.lock().get(key).copied())
    }

    async fn set(&self, key: &str, record: RateLimitRecord) -> Result<(), RateLimitError> {
        self.records.lock().insert(key.to_string(), record);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, RateLimitError> {
        Ok(self.records.lock().remove(key).is_some())
    }

    async fn update(
        &self,
        key: &str,
        apply: RecordUpdate<'_>,
    ) -> Result<RateLimitRecord, RateLimitError> {
        let mut records = self.records.lock();
        let next = apply(records.get(key).copied());
        records.insert(key.to_string(), next);
        Ok(next)
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, RateLimitError> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now));
        Ok(before - records.len())
    }

    async fn len(&self) -> Result<usize, RateLimitError> {
        Ok(self.records.lock().len())
    }
}

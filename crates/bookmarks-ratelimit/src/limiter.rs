//! Fixed-window rate limiter

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::error::RateLimitError;
use crate::store::{RateLimitRecord, RateLimitStore};

/// Limit applied to one route group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Namespace for store keys, so several policies can share one store
    pub group: String,
    pub window: TimeDelta,
    pub max_requests: u64,
}

impl RateLimitPolicy {
    pub fn new(
        group: impl Into<String>,
        window_secs: u64,
        max_requests: u64,
    ) -> Result<Self, RateLimitError> {
        let group = group.into();
        if window_secs == 0 {
            return Err(RateLimitError::InvalidPolicy(format!(
                "{}: window must be at least one second",
                group
            )));
        }
        if max_requests == 0 {
            return Err(RateLimitError::InvalidPolicy(format!(
                "{}: max requests must be at least 1",
                group
            )));
        }
        let window = i64::try_from(window_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(|| {
                RateLimitError::InvalidPolicy(format!("{}: window is too large", group))
            })?;

        Ok(Self {
            group,
            window,
            max_requests,
        })
    }

    fn store_key(&self, client_key: &str) -> String {
        format!("{}:{}", self.group, client_key)
    }
}

/// Outcome of one admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
    /// Whole seconds until the window resets; set only on denial
    pub retry_after_secs: Option<u64>,
}

impl Decision {
    /// Window reset as Unix seconds, rounded up
    pub fn reset_epoch_secs(&self) -> i64 {
        ceil_div_ms(self.reset_at.timestamp_millis())
    }
}

fn ceil_div_ms(ms: i64) -> i64 {
    (ms + 999).div_euclid(1000)
}

/// Fixed-window counter over a shared [`RateLimitStore`]
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    policy: Arc<RateLimitPolicy>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, policy: RateLimitPolicy) -> Self {
        Self {
            store,
            policy: Arc::new(policy),
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Count a request from `client_key` and decide whether to admit it
    pub async fn admit(&self, client_key: &str) -> Result<Decision, RateLimitError> {
        self.admit_at(client_key, Utc::now()).await
    }

    /// Count a request as if the current time were `now`
    ///
    /// A record whose window has elapsed (`now >= window_reset_at`) is
    /// replaced by a fresh window before counting. Denied requests still
    /// count, so a client that keeps retrying stays denied until the reset.
    pub async fn admit_at(
        &self,
        client_key: &str,
        now: DateTime<Utc>,
    ) -> Result<Decision, RateLimitError> {
        let window = self.policy.window;
        let key = self.policy.store_key(client_key);

        let bump = move |current: Option<RateLimitRecord>| {
            let mut record = match current {
                Some(record) if !record.is_expired(now) => record,
                _ => RateLimitRecord {
                    count: 0,
                    window_reset_at: now + window,
                },
            };
            record.count = record.count.saturating_add(1);
            record
        };
        let record = self.store.update(&key, &bump).await?;

        let limit = self.policy.max_requests;
        let allowed = record.count <= limit;
        let retry_after_secs = if allowed {
            None
        } else {
            let wait_ms = (record.window_reset_at - now).num_milliseconds().max(1);
            Some(ceil_div_ms(wait_ms).unsigned_abs())
        };

        if !allowed {
            debug!(
                "Rate limit hit for {} ({} of {})",
                key, record.count, limit
            );
        }

        Ok(Decision {
            allowed,
            limit,
            remaining: limit.saturating_sub(record.count),
            reset_at: record.window_reset_at,
            retry_after_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use chrono::Duration;

    fn limiter(store: Arc<InMemoryStore>, group: &str, window: u64, max: u64) -> RateLimiter {
        RateLimiter::new(store, RateLimitPolicy::new(group, window, max).unwrap())
    }

    #[test]
    fn test_policy_rejects_zero_values() {
        assert!(matches!(
            RateLimitPolicy::new("g", 0, 10),
            Err(RateLimitError::InvalidPolicy(_))
        ));
        assert!(matches!(
            RateLimitPolicy::new("g", 60, 0),
            Err(RateLimitError::InvalidPolicy(_))
        ));
    }

    #[tokio::test]
    async fn test_counts_down_then_denies() {
        let limiter = limiter(Arc::new(InMemoryStore::new()), "api", 60, 3);
        let now = Utc::now();

        let mut remaining = Vec::new();
        for _ in 0..3 {
            let decision = limiter.admit_at("10.0.0.1", now).await.unwrap();
            assert!(decision.allowed);
            assert_eq!(decision.retry_after_secs, None);
            remaining.push(decision.remaining);
        }
        assert_eq!(remaining, vec![2, 1, 0]);

        let denied = limiter.admit_at("10.0.0.1", now).await.unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.limit, 3);
        assert_eq!(denied.retry_after_secs, Some(60));
    }

    #[tokio::test]
    async fn test_retry_after_rounds_up() {
        let limiter = limiter(Arc::new(InMemoryStore::new()), "api", 60, 1);
        let start = Utc::now();

        limiter.admit_at("c", start).await.unwrap();
        let denied = limiter
            .admit_at("c", start + Duration::milliseconds(30_500))
            .await
            .unwrap();
        assert_eq!(denied.retry_after_secs, Some(30));

        let denied = limiter
            .admit_at("c", start + Duration::milliseconds(59_999))
            .await
            .unwrap();
        assert_eq!(denied.retry_after_secs, Some(1));
    }

    #[tokio::test]
    async fn test_window_resets_at_boundary() {
        let limiter = limiter(Arc::new(InMemoryStore::new()), "api", 60, 2);
        let start = Utc::now();

        limiter.admit_at("c", start).await.unwrap();
        limiter.admit_at("c", start).await.unwrap();
        assert!(!limiter.admit_at("c", start).await.unwrap().allowed);

        let just_before = start + Duration::seconds(60) - Duration::milliseconds(1);
        assert!(!limiter.admit_at("c", just_before).await.unwrap().allowed);

        let at_reset = start + Duration::seconds(60);
        let fresh = limiter.admit_at("c", at_reset).await.unwrap();
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 1);
        assert_eq!(fresh.reset_at, at_reset + Duration::seconds(60));
    }

    #[tokio::test]
    async fn test_reset_epoch_rounds_up() {
        let limiter = limiter(Arc::new(InMemoryStore::new()), "api", 60, 5);
        let now = DateTime::from_timestamp_millis(1_700_000_000_250).unwrap();

        let decision = limiter.admit_at("c", now).await.unwrap();
        assert_eq!(decision.reset_epoch_secs(), 1_700_000_061);
    }

    #[tokio::test]
    async fn test_clients_and_groups_are_independent() {
        let store = Arc::new(InMemoryStore::new());
        let general = limiter(store.clone(), "api", 60, 1);
        let listing = limiter(store.clone(), "bookmarks:list", 60, 1);
        let now = Utc::now();

        assert!(general.admit_at("a", now).await.unwrap().allowed);
        assert!(general.admit_at("b", now).await.unwrap().allowed);
        assert!(listing.admit_at("a", now).await.unwrap().allowed);
        assert!(!general.admit_at("a", now).await.unwrap().allowed);

        assert_eq!(store.len().await.unwrap(), 3);
        assert!(store.get("bookmarks:list:a").await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_admissions_never_exceed_limit() {
        let limiter = limiter(Arc::new(InMemoryStore::new()), "api", 60, 25);
        let now = Utc::now();

        let handles: Vec<_> = (0..200)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.admit_at("shared", now).await.unwrap() })
            })
            .collect();

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap().allowed {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 25);
    }
}

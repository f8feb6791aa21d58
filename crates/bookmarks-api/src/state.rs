//! Application state

use bookmarks_auth::{AuthGate, CredentialHasher, TokenIssuer};
use bookmarks_db::Database;
use bookmarks_ratelimit::{RateLimitError, RateLimitPolicy, RateLimitStore, RateLimiter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Handle used to render the Prometheus exposition
pub type MetricsHandle = metrics_exporter_prometheus::PrometheusHandle;

/// Window and request ceiling for one route group
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LimitSettings {
    pub window_secs: u64,
    pub max_requests: u64,
}

impl LimitSettings {
    pub const fn per_minute(max_requests: u64) -> Self {
        Self {
            window_secs: 60,
            max_requests,
        }
    }

    fn policy(&self, group: &str) -> Result<RateLimitPolicy, RateLimitError> {
        RateLimitPolicy::new(group, self.window_secs, self.max_requests)
    }
}

/// The limiters guarding each route group, all sharing one store
#[derive(Clone)]
pub struct RateLimits {
    pub auth: RateLimiter,
    pub general: RateLimiter,
    pub bookmarks_list: RateLimiter,
    pub categories_list: RateLimiter,
}

impl RateLimits {
    pub fn new(
        store: Arc<dyn RateLimitStore>,
        default: LimitSettings,
        bookmarks_list: LimitSettings,
        categories_list: LimitSettings,
    ) -> Result<Self, RateLimitError> {
        Ok(Self {
            auth: RateLimiter::new(store.clone(), default.policy("auth")?),
            general: RateLimiter::new(store.clone(), default.policy("api")?),
            bookmarks_list: RateLimiter::new(store.clone(), bookmarks_list.policy("bookmarks:list")?),
            categories_list: RateLimiter::new(store, categories_list.policy("categories:list")?),
        })
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub hasher: Arc<CredentialHasher>,
    pub tokens: Arc<TokenIssuer>,
    pub gate: AuthGate,
    pub limits: RateLimits,
}

impl AppState {
    pub fn new(
        db: Database,
        hasher: Arc<CredentialHasher>,
        tokens: Arc<TokenIssuer>,
        limits: RateLimits,
    ) -> Self {
        let gate = AuthGate::new(tokens.clone(), Arc::new(db.clone()));
        Self {
            db,
            hasher,
            tokens,
            gate,
            limits,
        }
    }
}

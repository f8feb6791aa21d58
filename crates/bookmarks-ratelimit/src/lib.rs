//! Bookmarks Request Throttling
//!
//! This crate provides a fixed-window rate limiter over a pluggable record
//! store, the Axum middleware that applies it per route group, and the
//! background task that sweeps expired windows.

pub mod error;
pub mod limiter;
pub mod memory;
pub mod middleware;
pub mod store;
pub mod sweep;

pub use error::RateLimitError;
pub use limiter::{Decision, RateLimitPolicy, RateLimiter};
pub use memory::InMemoryStore;
pub use middleware::{UNKNOWN_CLIENT, client_key, rate_limit_middleware};
pub use store::{RateLimitRecord, RateLimitStore, RecordUpdate};
pub use sweep::{SWEEP_INTERVAL, SweepTask};

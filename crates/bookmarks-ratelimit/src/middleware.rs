//! Rate limiting middleware for Axum

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::error::RateLimitError;
use crate::limiter::{Decision, RateLimiter};

/// Client key used when no forwarded address is present
pub const UNKNOWN_CLIENT: &str = "unknown";

const X_FORWARDED_FOR: &str = "x-forwarded-for";

static LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
static REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
static RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Identify the caller by the first address in `X-Forwarded-For`
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get(X_FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

/// Attach the decision's headers unless a limiter further in already did
fn apply_headers(headers: &mut HeaderMap, decision: &Decision) {
    if headers.contains_key(&LIMIT_HEADER) {
        return;
    }
    headers.insert(LIMIT_HEADER.clone(), HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER.clone(), HeaderValue::from(decision.remaining));
    headers.insert(RESET_HEADER.clone(), HeaderValue::from(decision.reset_epoch_secs()));
    if let Some(retry_after) = decision.retry_after_secs {
        headers.insert(RETRY_AFTER, HeaderValue::from(retry_after));
    }
}

/// Rate limiting middleware
///
/// Admitted requests continue with the `X-RateLimit-*` headers attached to
/// the response; denied requests get a 429 and never reach `next`. When
/// limiters are nested the innermost one's headers are kept. If the store
/// itself fails the request ends there with a 500.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(request.headers());

    let decision = match limiter.admit(&client).await {
        Ok(decision) => decision,
        Err(e) => {
            warn!(
                "Rate limit check failed for group {}: {}",
                limiter.policy().group,
                e
            );
            return e.into_response();
        }
    };

    let mut response = match decision.retry_after_secs {
        Some(retry_after_secs) if !decision.allowed => {
            metrics::counter!(
                "bookmarks_rate_limited_total",
                "group" => limiter.policy().group.clone()
            )
            .increment(1);
            RateLimitError::Exceeded { retry_after_secs }.into_response()
        }
        _ => next.run(request).await,
    };

    apply_headers(response.headers_mut(), &decision);
    response
}

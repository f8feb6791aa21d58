//! Authentication middleware for Axum
//!
//! A request moves through: header read → bearer token split off → token
//! verified with the access key → subject confirmed to still exist →
//! [`AuthUser`] inserted into the request extensions. Any failed step ends the
//! request with the same unauthorized response; the specific reason is only
//! logged.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use bookmarks_db::{Database, DbError, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::jwt::{TokenClass, TokenIssuer};

const BEARER_PREFIX: &str = "Bearer ";

/// Authenticated user information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

/// Identity lookup used to confirm a token's subject still exists
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    async fn find_identity(&self, id: i64) -> Result<Option<User>, DbError>;
}

#[async_trait]
impl IdentityLookup for Database {
    async fn find_identity(&self, id: i64) -> Result<Option<User>, DbError> {
        self.get_user_by_id(id).await
    }
}

/// Extract bearer token from the authorization header value
pub fn extract_bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let token = header
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .ok_or(AuthError::MissingCredential)?;

    if token.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(token)
}

/// Resolves bearer tokens to live identities
#[derive(Clone)]
pub struct AuthGate {
    tokens: Arc<TokenIssuer>,
    identities: Arc<dyn IdentityLookup>,
}

impl AuthGate {
    pub fn new(tokens: Arc<TokenIssuer>, identities: Arc<dyn IdentityLookup>) -> Self {
        Self { tokens, identities }
    }

    /// Run the gate against a request's headers
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
        let header = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok());
        let token = extract_bearer_token(header)?;

        let claims = self.tokens.verify(token, TokenClass::Access)?;

        match self.identities.find_identity(claims.user_id).await {
            Ok(Some(_)) => {}
            Ok(None) => return Err(AuthError::IdentityGone),
            Err(e) => {
                warn!("Identity lookup failed for user {}: {}", claims.user_id, e);
                return Err(AuthError::IdentityGone);
            }
        }

        Ok(AuthUser {
            id: claims.user_id,
            username: claims.username,
        })
    }
}

/// Authentication middleware
///
/// On success the [`AuthUser`] is added to request extensions before the
/// rest of the pipeline runs. On failure `next` is never called.
pub async fn auth_middleware(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = match gate.authenticate(request.headers()).await {
        Ok(user) => user,
        Err(e) => {
            debug!("Rejected request to {}: {}", request.uri().path(), e);
            if e.is_rejection() {
                metrics::counter!("bookmarks_auth_rejections_total", "kind" => e.kind())
                    .increment(1);
            }
            return Err(e);
        }
    };

    debug!("Authenticated user: {} ({})", user.username, user.id);

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingCredential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::StatusCode, middleware, routing::get};
    use chrono::{Duration, Utc};
    use std::collections::HashMap;
    use tower::ServiceExt;

    struct FakeIdentities {
        users: HashMap<i64, User>,
        fail: bool,
    }

    #[async_trait]
    impl IdentityLookup for FakeIdentities {
        async fn find_identity(&self, id: i64) -> Result<Option<User>, DbError> {
            if self.fail {
                return Err(DbError::NotFound("lookup unavailable".to_string()));
            }
            Ok(self.users.get(&id).cloned())
        }
    }

    fn user(id: i64, username: &str) -> User {
        User {
            id,
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn issuer() -> Arc<TokenIssuer> {
        Arc::new(TokenIssuer::new("gate-secret", "1h", "7d").unwrap())
    }

    fn gate(tokens: Arc<TokenIssuer>, fail: bool) -> AuthGate {
        let users = HashMap::from([(1, user(1, "alice"))]);
        AuthGate::new(tokens, Arc::new(FakeIdentities { users, fail }))
    }

    fn app(gate: AuthGate) -> Router {
        Router::new()
            .route(
                "/me",
                get(|user: AuthUser| async move { format!("{}:{}", user.id, user.username) }),
            )
            .route_layer(middleware::from_fn_with_state(gate, auth_middleware))
    }

    async fn call(app: Router, authorization: Option<String>) -> (StatusCode, String) {
        let mut builder = axum::http::Request::builder().uri("/me");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert!(matches!(extract_bearer_token(None), Err(AuthError::MissingCredential)));
        assert!(matches!(
            extract_bearer_token(Some("Basic abc")),
            Err(AuthError::MissingCredential)
        ));
        assert!(matches!(
            extract_bearer_token(Some("Bearer ")),
            Err(AuthError::MissingCredential)
        ));
        assert!(matches!(
            extract_bearer_token(Some("bearer abc")),
            Err(AuthError::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn test_valid_token_publishes_identity() {
        let tokens = issuer();
        let token = tokens.issue_access_token(1, "alice").unwrap();

        let (status, body) = call(app(gate(tokens, false)), Some(format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "1:alice");
    }

    #[tokio::test]
    async fn test_every_rejection_looks_the_same() {
        let tokens = issuer();
        let foreign = TokenIssuer::new("other-secret", "1h", "7d").unwrap();
        let expired = tokens
            .issue_at(TokenClass::Access, 1, "alice", Utc::now() - Duration::hours(2))
            .unwrap();
        let refresh = tokens.issue_refresh_token(1, "alice").unwrap();
        let deleted = tokens.issue_access_token(99, "ghost").unwrap();
        let wrong_key = foreign.issue_access_token(1, "alice").unwrap();

        let cases = vec![
            None,
            Some("Basic dXNlcjpwYXNz".to_string()),
            Some("Bearer ".to_string()),
            Some(format!("Bearer {}", wrong_key)),
            Some(format!("Bearer {}", refresh)),
            Some(format!("Bearer {}", expired)),
            Some(format!("Bearer {}", deleted)),
        ];

        let mut bodies = Vec::new();
        for case in cases {
            let (status, body) = call(app(gate(tokens.clone(), false)), case).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            let mut json: serde_json::Value = serde_json::from_str(&body).unwrap();
            json.as_object_mut().unwrap().remove("serverTime");
            bodies.push(json);
        }
        assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_identity_gone() {
        let tokens = issuer();
        let token = tokens.issue_access_token(1, "alice").unwrap();
        let gate = gate(tokens, true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {}", token).parse().unwrap());
        let err = gate.authenticate(&headers).await.unwrap_err();
        assert!(matches!(err, AuthError::IdentityGone));
    }

    #[tokio::test]
    async fn test_rejection_kinds_are_distinguished_internally() {
        let tokens = issuer();
        let gate = gate(tokens.clone(), false);

        let headers = HeaderMap::new();
        assert!(matches!(
            gate.authenticate(&headers).await,
            Err(AuthError::MissingCredential)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer not.a.jwt".parse().unwrap());
        assert!(matches!(
            gate.authenticate(&headers).await,
            Err(AuthError::InvalidOrExpiredToken(_))
        ));

        let token = tokens.issue_access_token(5, "nobody").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {}", token).parse().unwrap());
        assert!(matches!(
            gate.authenticate(&headers).await,
            Err(AuthError::IdentityGone)
        ));
    }
}

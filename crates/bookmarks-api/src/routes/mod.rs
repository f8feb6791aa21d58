//! API routes

mod auth;
mod bookmarks;
mod categories;
mod health;
pub mod metrics;
mod tags;
pub mod types;

use axum::{
    Router,
    http::{Method, Uri},
    middleware,
};
use bookmarks_auth::auth_middleware;
use bookmarks_ratelimit::rate_limit_middleware;

use crate::error::ApiError;
use crate::state::{AppState, MetricsHandle};

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route found for {} {}", method, uri))
}

/// Create the main router
///
/// Protected routes run the authentication gate first, then the group-wide
/// limiter, then any route-specific limiter.
pub fn create_router(state: AppState, metrics_handle: Option<MetricsHandle>) -> Router {
    let auth_limit =
        middleware::from_fn_with_state(state.limits.auth.clone(), rate_limit_middleware);
    let general_limit =
        middleware::from_fn_with_state(state.limits.general.clone(), rate_limit_middleware);
    let gate = middleware::from_fn_with_state(state.gate.clone(), auth_middleware);

    let protected = Router::new()
        .merge(bookmarks::routes(&state))
        .merge(categories::routes(&state))
        .merge(tags::routes())
        .route_layer(general_limit)
        .route_layer(gate);

    let mut router = Router::new()
        .merge(health::routes())
        .merge(auth::routes().route_layer(auth_limit))
        .merge(protected)
        .fallback(not_found)
        .with_state(state);

    if let Some(handle) = metrics_handle {
        router = router.merge(metrics::routes(handle));
    }

    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{LimitSettings, RateLimits};
    use axum::{
        body::Body,
        http::{HeaderMap, Request, StatusCode, header},
    };
    use bookmarks_auth::{CredentialHasher, TokenIssuer};
    use bookmarks_db::Database;
    use bookmarks_ratelimit::InMemoryStore;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn app_with_limits(bookmarks_list: u64, categories_list: u64) -> Router {
        let db = Database::new("sqlite::memory:").await.unwrap();
        app_over(db, bookmarks_list, categories_list)
    }

    fn app_over(db: Database, bookmarks_list: u64, categories_list: u64) -> Router {
        let hasher = Arc::new(CredentialHasher::new(1).unwrap());
        let tokens = Arc::new(TokenIssuer::new("router-test-secret", "1h", "7d").unwrap());
        let limits = RateLimits::new(
            Arc::new(InMemoryStore::new()),
            LimitSettings::per_minute(1000),
            LimitSettings::per_minute(bookmarks_list),
            LimitSettings::per_minute(categories_list),
        )
        .unwrap();

        create_router(AppState::new(db, hasher, tokens, limits), None)
    }

    async fn app() -> Router {
        app_with_limits(1000, 1000).await
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, json)
    }

    /// Register `name` and return its access token
    async fn register(app: &Router, name: &str) -> String {
        let (status, _, body) = send(
            app,
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "username": name,
                "email": format!("{}@example.com", name),
                "password": "correct horse battery",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    fn tag_names(bookmark: &Value) -> Vec<String> {
        bookmark["tags"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app().await;
        let (status, _, body) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = app().await;
        let (status, _, body) = send(&app, "GET", "/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No route found for GET /nope");
    }

    #[tokio::test]
    async fn test_register_login_refresh() {
        let app = app().await;

        let (status, _, body) = send(
            &app,
            "POST",
            "/auth/register",
            None,
            Some(json!({"username": "alice", "email": "alice@example.com", "password": "s3cret-pass"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["code"], "USER_REGISTERED");
        assert_eq!(body["data"]["user"]["username"], "alice");
        assert!(body["data"]["user"].get("password_hash").is_none());
        assert!(body["serverTime"].is_i64());

        let (status, _, body) = send(
            &app,
            "POST",
            "/auth/register",
            None,
            Some(json!({"username": "alice2", "email": "alice@example.com", "password": "s3cret-pass"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");

        let (status, _, wrong_password) = send(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "alice@example.com", "password": "not-the-password"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, unknown_email) = send(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "nobody@example.com", "password": "s3cret-pass"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password["message"], unknown_email["message"]);

        let (status, _, body) = send(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "alice@example.com", "password": "s3cret-pass"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let access = body["data"]["token"].as_str().unwrap().to_string();
        let refresh = body["data"]["refreshToken"].as_str().unwrap().to_string();

        let (status, _, body) = send(
            &app,
            "POST",
            "/auth/refresh",
            None,
            Some(json!({"refreshToken": refresh})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["token"].is_string());

        // An access token is not accepted where a refresh token is expected
        let (status, _, _) = send(
            &app,
            "POST",
            "/auth/refresh",
            None,
            Some(json!({"refreshToken": access})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // ...and a refresh token does not open protected routes
        let (status, _, _) = send(&app, "GET", "/bookmarks", Some(&refresh), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_with_database_down_is_unauthorized() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        let app = app_over(db.clone(), 1000, 1000);

        let (status, _, body) = send(
            &app,
            "POST",
            "/auth/register",
            None,
            Some(json!({"username": "dave", "email": "dave@example.com", "password": "s3cret-pass"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let access = body["data"]["token"].as_str().unwrap().to_string();
        let refresh = body["data"]["refreshToken"].as_str().unwrap().to_string();

        db.pool().close().await;

        let (status, _, refreshed) = send(
            &app,
            "POST",
            "/auth/refresh",
            None,
            Some(json!({"refreshToken": refresh})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(refreshed["code"], "UNAUTHORIZED");

        // Same outward shape as the gate when its lookup fails
        let (status, _, gated) = send(&app, "GET", "/bookmarks", Some(&access), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(refreshed["message"], gated["message"]);
    }

    #[tokio::test]
    async fn test_register_reports_every_invalid_field() {
        let app = app().await;

        let (status, _, body) = send(
            &app,
            "POST",
            "/auth/register",
            None,
            Some(json!({"username": "al", "email": "nope", "password": "short"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Validation Error");
        assert_eq!(body["error"]["details"].as_array().unwrap().len(), 3);

        let (status, _, body) = send(&app, "POST", "/auth/register", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        let app = app().await;

        for uri in ["/bookmarks", "/categories", "/tags", "/tags/popular"] {
            let (status, headers, body) = send(&app, "GET", uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
            assert_eq!(body["code"], "UNAUTHORIZED");
            // Rejected before reaching the limiter
            assert!(headers.get("x-ratelimit-limit").is_none());
        }

        let token = register(&app, "carol").await;
        let (status, headers, body) = send(&app, "GET", "/bookmarks", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["pagination"]["total"], 0);
        // The list limiter is innermost, so its headers are the ones left
        assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "1000");
        assert!(headers.get("x-ratelimit-reset").is_some());
    }

    #[tokio::test]
    async fn test_list_page_past_the_end() {
        let app = app().await;
        let token = register(&app, "erin").await;

        let uri = format!("/bookmarks?page={}&limit=100", i64::MAX);
        let (status, _, body) = send(&app, "GET", &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["data"]["bookmarks"].as_array().unwrap().len(), 0);
        assert_eq!(body["data"]["pagination"]["page"], i64::MAX);
        assert_eq!(body["data"]["pagination"]["limit"], 100);
    }

    #[tokio::test]
    async fn test_bookmark_lifecycle() {
        let app = app().await;
        let alice = register(&app, "alice").await;
        let bob = register(&app, "bob").await;

        let (status, _, body) = send(
            &app,
            "POST",
            "/categories",
            Some(&alice),
            Some(json!({"name": "Reading"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let category_id = body["data"]["category"]["id"].as_i64().unwrap();

        let (status, _, body) = send(
            &app,
            "POST",
            "/bookmarks",
            Some(&alice),
            Some(json!({
                "url": "https://doc.rust-lang.org/book/",
                "title": "The Book",
                "description": "Learn Rust",
                "category_id": category_id,
                "tags": ["Rust", " rust ", "web"],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        assert_eq!(body["code"], "BOOKMARK_CREATED");
        let bookmark = &body["data"]["bookmark"];
        let id = bookmark["id"].as_i64().unwrap();
        assert_eq!(tag_names(bookmark), vec!["rust", "web"]);

        send(
            &app,
            "POST",
            "/bookmarks",
            Some(&alice),
            Some(json!({"url": "https://tokio.rs", "title": "Tokio", "tags": ["async"]})),
        )
        .await;

        let (status, _, body) =
            send(&app, "GET", "/bookmarks?tags=web,missing", Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["pagination"]["total"], 1);
        assert_eq!(body["data"]["bookmarks"][0]["id"], id);

        let (_, _, body) = send(&app, "GET", "/bookmarks?limit=1", Some(&alice), None).await;
        assert_eq!(body["data"]["pagination"]["pages"], 2);
        assert_eq!(body["data"]["bookmarks"].as_array().unwrap().len(), 1);

        let (status, _, body) = send(
            &app,
            "PUT",
            &format!("/bookmarks/{}", id),
            Some(&alice),
            Some(json!({"description": null, "tags": ["web", "async"]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        let bookmark = &body["data"]["bookmark"];
        assert!(bookmark["description"].is_null());
        assert_eq!(bookmark["title"], "The Book");
        assert_eq!(bookmark["category_id"], category_id);
        assert_eq!(tag_names(bookmark), vec!["async", "web"]);

        let (status, _, _) = send(&app, "GET", &format!("/bookmarks/{}", id), Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _, _) =
            send(&app, "DELETE", &format!("/bookmarks/{}", id), Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _, _) = send(&app, "GET", "/bookmarks/9999", Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, body) =
            send(&app, "DELETE", &format!("/bookmarks/{}", id), Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], "BOOKMARK_DELETED");
        let (status, _, _) = send(&app, "GET", &format!("/bookmarks/{}", id), Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bookmark_validation_and_foreign_category() {
        let app = app().await;
        let alice = register(&app, "alice").await;
        let bob = register(&app, "bob").await;

        let (_, _, body) = send(
            &app,
            "POST",
            "/categories",
            Some(&bob),
            Some(json!({"name": "Private"})),
        )
        .await;
        let bobs_category = body["data"]["category"]["id"].as_i64().unwrap();

        let (status, _, body) = send(
            &app,
            "POST",
            "/bookmarks",
            Some(&alice),
            Some(json!({"url": "https://example.com", "title": "Mine", "category_id": bobs_category})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");

        let (status, _, body) = send(
            &app,
            "POST",
            "/bookmarks",
            Some(&alice),
            Some(json!({"url": "not a url", "title": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["details"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_category_routes() {
        let app = app().await;
        let alice = register(&app, "alice").await;
        let bob = register(&app, "bob").await;

        let (_, _, body) = send(
            &app,
            "POST",
            "/categories",
            Some(&alice),
            Some(json!({"name": "Tools"})),
        )
        .await;
        let id = body["data"]["category"]["id"].as_i64().unwrap();

        let (status, _, _) = send(
            &app,
            "POST",
            "/categories",
            Some(&alice),
            Some(json!({"name": "Tools"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _, _) = send(
            &app,
            "PUT",
            &format!("/categories/{}", id),
            Some(&bob),
            Some(json!({"name": "Stolen"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, body) = send(
            &app,
            "PUT",
            &format!("/categories/{}", id),
            Some(&alice),
            Some(json!({"name": "Dev Tools"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["category"]["name"], "Dev Tools");

        send(
            &app,
            "POST",
            "/bookmarks",
            Some(&alice),
            Some(json!({"url": "https://crates.io", "title": "Crates", "category_id": id})),
        )
        .await;

        let (_, _, body) = send(&app, "GET", "/categories", Some(&alice), None).await;
        assert_eq!(body["data"]["categories"][0]["bookmark_count"], 1);

        let (status, _, _) =
            send(&app, "DELETE", &format!("/categories/{}", id), Some(&alice), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _, _) = send(&app, "DELETE", "/categories/9999", Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_routes_have_their_own_limit() {
        let app = app_with_limits(2, 1000).await;
        let token = register(&app, "dave").await;

        for expected_remaining in ["1", "0"] {
            let (status, headers, _) = send(&app, "GET", "/bookmarks", Some(&token), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), expected_remaining);
        }

        let (status, headers, body) = send(&app, "GET", "/bookmarks", Some(&token), None).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["code"], "TOO_MANY_REQUESTS");
        assert!(headers.get(header::RETRY_AFTER).is_some());

        // Creating is only under the group-wide limit
        let (status, _, _) = send(
            &app,
            "POST",
            "/bookmarks",
            Some(&token),
            Some(json!({"url": "https://example.org", "title": "Still allowed"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_tags_routes() {
        let app = app().await;
        let token = register(&app, "erin").await;

        for (url, tags) in [
            ("https://a.example", json!(["rust", "cli"])),
            ("https://b.example", json!(["rust"])),
            ("https://c.example", json!(["web"])),
        ] {
            send(
                &app,
                "POST",
                "/bookmarks",
                Some(&token),
                Some(json!({"url": url, "title": "t", "tags": tags})),
            )
            .await;
        }

        let (status, _, body) = send(&app, "GET", "/tags", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["tags"].as_array().unwrap().len(), 3);

        let (_, _, body) = send(&app, "GET", "/tags/popular?limit=1", Some(&token), None).await;
        let popular = body["data"]["tags"].as_array().unwrap();
        assert_eq!(popular.len(), 1);
        assert_eq!(popular[0]["name"], "rust");
        assert_eq!(popular[0]["count"], 2);
    }
}

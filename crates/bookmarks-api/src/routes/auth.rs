//! Account routes: register, login, token refresh

use axum::{Router, extract::State, routing::post};
use bookmarks_auth::{AuthError, CredentialHasher, TokenClass};
use bookmarks_db::{NewUser, User};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::extract::AppJson;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::Validator;

use super::types::{LoginRequest, RefreshRequest, RefreshResponse, RegisterRequest, SessionResponse};

const USERNAME_LENGTH: (usize, usize) = (3, 50);
const PASSWORD_LENGTH: (usize, usize) = (8, 100);

/// Run a hashing operation off the async runtime
async fn blocking<R, F>(hasher: &Arc<CredentialHasher>, f: F) -> Result<R, ApiError>
where
    F: FnOnce(&CredentialHasher) -> R + Send + 'static,
    R: Send + 'static,
{
    let hasher = hasher.clone();
    tokio::task::spawn_blocking(move || f(&hasher))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {}", e)))
}

fn session(state: &AppState, user: User) -> Result<SessionResponse, ApiError> {
    let token = state.tokens.issue_access_token(user.id, &user.username)?;
    let refresh_token = state.tokens.issue_refresh_token(user.id, &user.username)?;
    Ok(SessionResponse {
        user: user.into(),
        token,
        refresh_token,
    })
}

/// POST /auth/register
async fn register(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<ApiResponse<SessionResponse>, ApiError> {
    Validator::new()
        .length("username", &request.username, USERNAME_LENGTH.0, USERNAME_LENGTH.1)
        .email("email", &request.email)
        .length("password", &request.password, PASSWORD_LENGTH.0, PASSWORD_LENGTH.1)
        .finish()?;

    debug!("Registering user: {}", request.username);

    let password = request.password;
    let password_hash = blocking(&state.hasher, move |h| h.hash(&password)).await??;

    let user = state
        .db
        .insert_user(NewUser {
            username: request.username,
            email: request.email,
            password_hash,
        })
        .await?;

    info!("Registered user {} ({})", user.username, user.id);

    Ok(ApiResponse::created(
        "USER_REGISTERED",
        "User registered successfully",
        session(&state, user)?,
    ))
}

/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<ApiResponse<SessionResponse>, ApiError> {
    Validator::new()
        .email("email", &request.email)
        .length("password", &request.password, 1, PASSWORD_LENGTH.1)
        .finish()?;

    let user = state.db.get_user_by_email(&request.email).await?;

    // Unknown accounts still pay for one verification
    let password = request.password;
    let stored = user.as_ref().map(|u| u.password_hash.clone());
    let valid = blocking(&state.hasher, move |h| match stored {
        Some(hash) => h.verify(&password, &hash),
        None => h.verify_absent(&password),
    })
    .await?;

    let user = match (user, valid) {
        (Some(user), true) => user,
        _ => {
            debug!("Failed login for {}", request.email);
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    info!("User {} logged in", user.username);

    Ok(ApiResponse::ok(
        "LOGIN_SUCCESS",
        "Login successful",
        session(&state, user)?,
    ))
}

/// POST /auth/refresh
async fn refresh(
    State(state): State<AppState>,
    AppJson(request): AppJson<RefreshRequest>,
) -> Result<ApiResponse<RefreshResponse>, ApiError> {
    let claims = state
        .tokens
        .verify(&request.refresh_token, TokenClass::Refresh)
        .map_err(AuthError::from)?;

    let user = match state.db.get_user_by_id(claims.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(AuthError::IdentityGone.into()),
        Err(e) => {
            warn!("Identity lookup failed for user {}: {}", claims.user_id, e);
            return Err(AuthError::IdentityGone.into());
        }
    };

    let token = state.tokens.issue_access_token(user.id, &user.username)?;

    debug!("Refreshed access token for user {}", user.id);

    Ok(ApiResponse::ok(
        "TOKEN_REFRESHED",
        "Token refreshed successfully",
        RefreshResponse { token },
    ))
}

/// Create auth routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

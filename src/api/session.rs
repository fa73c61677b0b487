//! Session endpoints.
//!
//! - POST `/` - Log in with email and password, issue a session token
//! - GET `/` - Current principal
//! - DELETE `/` - Log out: revoke the presented token and clear the cookie

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::{ApiError, ResultExt};
use super::users::MAX_PASSWORD_LEN;
use crate::auth::{
    ApiAuthError, Auth, AuthErrorKind, AuthValidator, Principal, clear_session_cookie,
    session_cookie,
};
use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::jwt::unix_now;
use crate::password::{verify_dummy, verify_password};
use crate::rate_limit::{RateLimitConfig, rate_limit_login};

#[derive(Clone)]
pub struct SessionState {
    pub db: Database,
    pub validator: AuthValidator,
    pub secure_cookies: bool,
    pub session_ttl: u64,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

impl_has_auth_backend!(SessionState);

pub fn router(state: SessionState) -> Router {
    let login_router = Router::new()
        .route("/", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_login,
        ));

    let session_router = Router::new()
        .route("/", get(current_session).delete(logout))
        .with_state(state);

    Router::new().merge(login_router).merge(session_router)
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    expires_at: u64,
    user: Principal,
}

#[derive(Serialize)]
struct SessionResponse {
    user: Principal,
    expires_at: u64,
}

const INVALID_CREDENTIALS: &str = "Invalid email or password";

async fn login(
    State(state): State<SessionState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.password.chars().count() > MAX_PASSWORD_LEN {
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let user = state
        .db
        .users()
        .get_by_email(payload.email.trim())
        .await
        .db_err("Failed to get user")?;

    let password = payload.password;
    let user = match user {
        Some(user) => {
            let hash = user.password_hash.clone();
            let ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
                .await
                .internal_err("Failed to verify password")?;
            if !ok {
                debug!(user_id = user.id, "Login with wrong password");
                return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
            }
            user
        }
        None => {
            tokio::task::spawn_blocking(move || verify_dummy(&password))
                .await
                .internal_err("Failed to verify password")?;
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }
    };

    let now = unix_now().internal_err("Failed to read clock")?;
    let principal = user.principal();
    let issued = state
        .validator
        .codec()
        .encode(&principal, now, state.session_ttl)
        .internal_err("Failed to generate token")?;

    info!(user_id = user.id, "User logged in");

    let cookie = session_cookie(&issued.token, issued.duration, state.secure_cookies);

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            token: issued.token,
            expires_at: issued.expires_at,
            user: principal,
        }),
    ))
}

/// Return the authenticated principal. Also serves as a cheap session check.
async fn current_session(Auth(auth): Auth) -> impl IntoResponse {
    Json(SessionResponse {
        user: auth.principal,
        expires_at: auth.expires_at,
    })
}

/// Revoke the presented token and clear the session cookie.
async fn logout(
    State(state): State<SessionState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiAuthError> {
    let to_auth_error = |kind: AuthErrorKind| ApiAuthError::new(kind, state.secure_cookies);
    let now = unix_now().map_err(|_| to_auth_error(AuthErrorKind::ValidatorUnavailable))?;

    state
        .validator
        .logout(&headers, now)
        .await
        .map_err(to_auth_error)?;

    info!("Session logged out");

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, clear_session_cookie(state.secure_cookies))],
        Json(serde_json::json!({ "success": true })),
    ))
}

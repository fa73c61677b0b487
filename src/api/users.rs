use axum::{
    Json, Router, extract::State, http::StatusCode, middleware, response::IntoResponse,
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ResultExt, is_unique_violation};
use crate::db::Database;
use crate::password::hash_password;
use crate::rate_limit::{RateLimitConfig, rate_limit_signup};

const MAX_EMAIL_LEN: usize = 254;
const MAX_DISPLAY_NAME_LEN: usize = 64;
pub(super) const MIN_PASSWORD_LEN: usize = 8;
pub(super) const MAX_PASSWORD_LEN: usize = 128;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/", post(create_user))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config,
            rate_limit_signup,
        ))
}

#[derive(Deserialize)]
struct CreateUserRequest {
    email: String,
    display_name: String,
    password: String,
}

#[derive(Serialize)]
struct CreateUserResponse {
    id: i64,
    email: String,
    display_name: String,
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() {
        return Err(ApiError::bad_request("Email cannot be empty"));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(ApiError::bad_request("Email is too long"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ApiError::bad_request("Invalid email address")),
    }
}

async fn create_user(
    State(state): State<UsersState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim();
    let display_name = payload.display_name.trim();

    validate_email(email)?;

    if display_name.is_empty() {
        return Err(ApiError::bad_request("Display name cannot be empty"));
    }
    if display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Display name cannot be longer than {} characters",
            MAX_DISPLAY_NAME_LEN
        )));
    }

    let password_len = payload.password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password_len) {
        return Err(ApiError::bad_request(format!(
            "Password must be between {} and {} characters",
            MIN_PASSWORD_LEN, MAX_PASSWORD_LEN
        )));
    }

    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .internal_err("Failed to hash password")?
        .internal_err("Failed to hash password")?;

    let id = match state
        .db
        .users()
        .create(email, display_name, &password_hash)
        .await
    {
        Ok(id) => id,
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::conflict("Email is already registered"));
        }
        Err(e) => return Err(ApiError::db_error("Failed to create user", e)),
    };

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            id,
            email: email.to_string(),
            display_name: display_name.to_string(),
        }),
    ))
}

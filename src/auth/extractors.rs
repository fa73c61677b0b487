//! Axum extractors for authentication.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, error};

use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use super::types::Authenticated;
use crate::jwt::unix_now;

/// Run the validator against a request's headers at the current time.
async fn authenticate_request<S>(parts: &Parts, state: &S) -> Result<Authenticated, AuthErrorKind>
where
    S: HasAuthBackend + Send + Sync,
{
    let now = unix_now().map_err(|e| {
        error!(error = %e, "Clock unavailable during authentication");
        AuthErrorKind::ValidatorUnavailable
    })?;

    state
        .validator()
        .validate(&parts.headers, now)
        .await
        .inspect_err(|kind| debug!(reason = %kind, "Request rejected"))
}

/// Extractor for API endpoints that require authentication.
/// Returns JSON errors and clears the session cookie on rejection.
pub struct Auth(pub Authenticated);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state)
            .await
            .map(Auth)
            .map_err(|kind| ApiAuthError::new(kind, state.secure_cookies()))
    }
}

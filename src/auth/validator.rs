//! Request authentication and logout.
//!
//! Validation runs in a fixed order and stops at the first failure:
//! extract the token, check the blacklist, verify signature and expiry, then
//! confirm the subject still exists. The blacklist is consulted before any
//! cryptographic work so a revoked token is rejected even while its signature
//! is still good.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use tracing::{debug, error};

use super::blacklist::{BlacklistStore, StoreError};
use super::errors::AuthErrorKind;
use super::extract::extract_token;
use super::types::{Authenticated, Principal};
use crate::jwt::TokenCodec;

/// Looks up users by ID.
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Principal>, StoreError>;
}

/// Authenticates requests against signed session tokens and a revocation list.
///
/// Holds no per-request state; one instance is shared by every handler.
#[derive(Clone)]
pub struct AuthValidator {
    codec: Arc<TokenCodec>,
    blacklist: Arc<dyn BlacklistStore>,
    users: Arc<dyn UserLookup>,
}

impl AuthValidator {
    pub fn new(
        codec: Arc<TokenCodec>,
        blacklist: Arc<dyn BlacklistStore>,
        users: Arc<dyn UserLookup>,
    ) -> Self {
        Self {
            codec,
            blacklist,
            users,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn blacklist(&self) -> &Arc<dyn BlacklistStore> {
        &self.blacklist
    }

    /// Authenticate a request from its headers at time `now`.
    pub async fn validate(
        &self,
        headers: &HeaderMap,
        now: u64,
    ) -> Result<Authenticated, AuthErrorKind> {
        let token = extract_token(headers).ok_or(AuthErrorKind::NoCredentials)?;
        self.validate_token(token, now).await
    }

    /// Authenticate an already extracted token at time `now`.
    pub async fn validate_token(
        &self,
        token: &str,
        now: u64,
    ) -> Result<Authenticated, AuthErrorKind> {
        self.check_not_revoked(token, now).await?;

        let claims = self
            .codec
            .decode(token, now)
            .map_err(|_| AuthErrorKind::InvalidOrExpiredToken)?;

        let found = self
            .users
            .find_by_id(claims.subject_id)
            .await
            .map_err(|e| {
                error!(error = %e, "User lookup failed");
                AuthErrorKind::ValidatorUnavailable
            })?;
        if found.is_none() {
            debug!(subject = claims.subject_id, "Token subject no longer exists");
            return Err(AuthErrorKind::UnknownPrincipal);
        }

        Ok(Authenticated::new(
            claims.principal(),
            claims.expires_at,
            token.to_string(),
        ))
    }

    /// Re-check an earlier authentication: fails once the token has been
    /// logged out or has expired.
    pub async fn recheck(&self, auth: &Authenticated, now: u64) -> Result<(), AuthErrorKind> {
        self.check_not_revoked(auth.token(), now).await?;
        if now >= auth.expires_at {
            return Err(AuthErrorKind::InvalidOrExpiredToken);
        }
        Ok(())
    }

    /// Revoke the token carried by a request.
    ///
    /// A token that no longer verifies cannot be replayed, so it is accepted
    /// without being recorded. A storage fault is reported, never swallowed.
    pub async fn logout(&self, headers: &HeaderMap, now: u64) -> Result<(), AuthErrorKind> {
        let token = extract_token(headers).ok_or(AuthErrorKind::NoCredentials)?;

        let Ok(claims) = self.codec.decode(token, now) else {
            debug!("Logout with unverifiable token, nothing to revoke");
            return Ok(());
        };

        self.blacklist
            .invalidate(token, claims.expires_at)
            .await
            .map_err(|e| {
                error!(error = %e, token_id = %claims.token_id, "Failed to revoke token");
                AuthErrorKind::ValidatorUnavailable
            })?;

        debug!(
            token_id = %claims.token_id,
            subject = claims.subject_id,
            "Token revoked"
        );
        Ok(())
    }

    async fn check_not_revoked(&self, token: &str, now: u64) -> Result<(), AuthErrorKind> {
        let revoked = self
            .blacklist
            .is_blacklisted(token, now)
            .await
            .map_err(|e| {
                error!(error = %e, "Blacklist lookup failed");
                AuthErrorKind::ValidatorUnavailable
            })?;
        if revoked {
            return Err(AuthErrorKind::RevokedToken);
        }
        Ok(())
    }
}

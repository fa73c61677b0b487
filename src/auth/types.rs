//! Authenticated identity types.

use serde::Serialize;

/// A user identity as embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: i64,
    pub email: String,
    pub display_name: String,
}

/// Outcome of a successful validation.
///
/// Keeps the raw token so the session can be re-checked for revocation later
/// (for example on a long-lived WebSocket). The token is never exposed.
#[derive(Clone)]
pub struct Authenticated {
    pub principal: Principal,
    /// Expiration timestamp of the session token (Unix seconds)
    pub expires_at: u64,
    token: String,
}

impl Authenticated {
    pub(super) fn new(principal: Principal, expires_at: u64, token: String) -> Self {
        Self {
            principal,
            expires_at,
            token,
        }
    }

    pub(super) fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Authenticated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticated")
            .field("principal", &self.principal)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

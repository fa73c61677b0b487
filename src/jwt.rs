//! Session token encoding and verification.
//!
//! Tokens are HS256 JWTs that embed the user's identity at login time. Expiry is
//! checked against a caller-supplied clock so validation stays a pure function of
//! its inputs.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::Principal;

/// Default session lifetime: 24 hours
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;

/// Wire claims. The subject is carried as a string, as JWT expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionClaims {
    /// Subject (user ID)
    sub: String,
    /// Email at issuance
    email: String,
    /// Display name at issuance
    name: String,
    /// Unique per issued token
    jti: String,
    /// Issued at (Unix timestamp)
    iat: u64,
    /// Expiration time (Unix timestamp)
    exp: u64,
}

/// Verified contents of a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub subject_id: i64,
    pub email: String,
    pub display_name: String,
    pub token_id: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

impl TokenClaims {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.subject_id,
            email: self.email.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// Result of issuing a session token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub duration: u64,
}

/// Signs and verifies session tokens with a server-held secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    /// Create a codec with the given secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Issue a token for `principal`, valid from `issued_at` for `ttl` seconds.
    pub fn encode(
        &self,
        principal: &Principal,
        issued_at: u64,
        ttl: u64,
    ) -> Result<IssuedToken, JwtError> {
        let exp = issued_at
            .checked_add(ttl)
            .ok_or(JwtError::InvalidLifetime)?;

        let claims = SessionClaims {
            sub: principal.id.to_string(),
            email: principal.email.clone(),
            name: principal.display_name.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: issued_at,
            exp,
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )
        .map_err(JwtError::Encoding)?;

        Ok(IssuedToken {
            token,
            issued_at,
            expires_at: exp,
            duration: ttl,
        })
    }

    /// Verify the signature of `token`, then check it has not expired at `now`.
    ///
    /// Every failure collapses into [`InvalidToken`]; callers cannot learn which
    /// check failed.
    pub fn decode(&self, token: &str, now: u64) -> Result<TokenClaims, InvalidToken> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Expiry is compared against the injected clock below.
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| InvalidToken)?;
        let claims = data.claims;

        if now >= claims.exp {
            return Err(InvalidToken);
        }

        let subject_id = claims.sub.parse::<i64>().map_err(|_| InvalidToken)?;

        Ok(TokenClaims {
            subject_id,
            email: claims.email,
            display_name: claims.name,
            token_id: claims.jti,
            issued_at: claims.iat,
            expires_at: claims.exp,
        })
    }
}

/// Current Unix time in seconds.
pub fn unix_now() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

/// Errors that can occur while issuing tokens.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
    /// Expiry would overflow
    InvalidLifetime,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
            JwtError::InvalidLifetime => write!(f, "Token lifetime out of range"),
        }
    }
}

impl std::error::Error for JwtError {}

/// A token failed verification. Deliberately carries no detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidToken;

impl std::fmt::Display for InvalidToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid or expired token")
    }
}

impl std::error::Error for InvalidToken {}

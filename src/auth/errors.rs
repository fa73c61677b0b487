//! Authentication error types.

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use super::cookie::clear_session_cookie;

/// Why a request was not authenticated.
///
/// Distinguished for logs only. Every variant except `ValidatorUnavailable`
/// produces the same 401 response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    NoCredentials,
    RevokedToken,
    InvalidOrExpiredToken,
    UnknownPrincipal,
    /// The blacklist or user store could not be reached. Retryable.
    ValidatorUnavailable,
}

impl AuthErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthErrorKind::ValidatorUnavailable)
    }
}

impl std::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuthErrorKind::NoCredentials => "no_credentials",
            AuthErrorKind::RevokedToken => "revoked_token",
            AuthErrorKind::InvalidOrExpiredToken => "invalid_or_expired_token",
            AuthErrorKind::UnknownPrincipal => "unknown_principal",
            AuthErrorKind::ValidatorUnavailable => "validator_unavailable",
        };
        f.write_str(s)
    }
}

impl std::error::Error for AuthErrorKind {}

/// API authentication error (JSON body, clears the session cookie on 401).
#[derive(Debug)]
pub struct ApiAuthError {
    pub kind: AuthErrorKind,
    secure_cookies: bool,
}

impl ApiAuthError {
    pub fn new(kind: AuthErrorKind, secure_cookies: bool) -> Self {
        Self {
            kind,
            secure_cookies,
        }
    }

    fn status_code(&self) -> StatusCode {
        if self.kind.is_retryable() {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::UNAUTHORIZED
        }
    }

    fn message(&self) -> &'static str {
        if self.kind.is_retryable() {
            "Service temporarily unavailable"
        } else {
            "Not authenticated"
        }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        use axum::Json;
        use axum::http::HeaderValue;
        use serde::Serialize;

        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        let mut response = (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response();

        let headers = response.headers_mut();
        if self.kind.is_retryable() {
            headers.insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        } else if let Ok(value) = HeaderValue::from_str(&clear_session_cookie(self.secure_cookies))
        {
            headers.append(header::SET_COOKIE, value);
        }

        response
    }
}

//! Locating the session token in an inbound request.

use axum::http::{HeaderMap, header};

use super::cookie::{SESSION_COOKIE_NAME, get_cookie};

/// Find the raw session token in a request.
///
/// The session cookie is checked first and wins whenever it is present and
/// non-empty, so a browser session is never overridden by a stale
/// `Authorization` header. Otherwise a `Bearer` credential is accepted.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    get_cookie(headers, SESSION_COOKIE_NAME).or_else(|| bearer_token(headers))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

//! Cookie parsing and session cookie construction.

use axum::http::header;

/// Cookie name for the session token.
pub const SESSION_COOKIE_NAME: &str = "session_token";

/// Extract a cookie value from the Cookie header.
///
/// Empty values are skipped, so `a=; a=x` yields `x`.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    for cookie_header in headers.get_all(header::COOKIE) {
        let Ok(cookie_header) = cookie_header.to_str() else {
            continue;
        };
        for part in cookie_header.split(';') {
            let part = part.trim();
            if let Some((key, value)) = part.split_once('=') {
                let value = value.trim();
                if key.trim() == name && !value.is_empty() {
                    return Some(value);
                }
            }
        }
    }
    None
}

/// Build the Set-Cookie value carrying a freshly issued session token.
pub fn session_cookie(token: &str, max_age: u64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
        SESSION_COOKIE_NAME, token, max_age, secure
    )
}

/// Build the Set-Cookie value that clears the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0{}",
        SESSION_COOKIE_NAME, secure
    )
}

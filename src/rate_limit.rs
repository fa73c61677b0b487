//! Rate limiting for credential endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password guessing.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc};

use crate::api::ApiError;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Login: 1 request per second per IP, bursts of 10
const LOGIN_PER_SEC: NonZeroU32 = NonZeroU32::new(1).unwrap();
const LOGIN_BURST: NonZeroU32 = NonZeroU32::new(10).unwrap();

/// Signup: 5 requests per minute per IP
const SIGNUP_PER_MIN: NonZeroU32 = NonZeroU32::new(5).unwrap();

/// Rate limiting configuration for credential endpoints.
#[derive(Clone)]
pub struct RateLimitConfig {
    pub login: Arc<IpLimiter>,
    pub signup: Arc<IpLimiter>,
}

impl RateLimitConfig {
    pub fn new() -> Self {
        Self {
            login: Arc::new(RateLimiter::keyed(
                Quota::per_second(LOGIN_PER_SEC).allow_burst(LOGIN_BURST),
            )),
            signup: Arc::new(RateLimiter::keyed(Quota::per_minute(SIGNUP_PER_MIN))),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Peer address of the request. Requests without connection info (in-process
/// callers) share one bucket.
fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "local".to_string())
}

/// Middleware for rate limiting login.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match config.login.check_key(&client_key(&request)) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            ApiError::too_many_requests("Too many login attempts. Please wait before trying again.")
                .into_response()
        }
    }
}

/// Middleware for rate limiting signup.
pub async fn rate_limit_signup(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match config.signup.check_key(&client_key(&request)) {
        Ok(_) => next.run(request).await,
        Err(_) => ApiError::too_many_requests(
            "Too many signup attempts. Please wait before trying again.",
        )
        .into_response(),
    }
}

mod error;
mod session;
mod users;
mod ws;

use axum::Router;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthValidator;
use crate::db::Database;
use crate::rate_limit::RateLimitConfig;

pub use error::ApiError;
pub use ws::ServerMessage;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    validator: AuthValidator,
    secure_cookies: bool,
    session_ttl: u64,
    ws_ping_interval: Option<Duration>,
) -> Router {
    let rate_limit_config = Arc::new(RateLimitConfig::new());

    let users_state = users::UsersState {
        db: db.clone(),
        rate_limit_config: rate_limit_config.clone(),
    };

    let session_state = session::SessionState {
        db,
        validator: validator.clone(),
        secure_cookies,
        session_ttl,
        rate_limit_config,
    };

    let ws_state = ws::WsState {
        validator,
        secure_cookies,
        ping_interval: ws_ping_interval.unwrap_or(ws::DEFAULT_PING_INTERVAL),
    };

    Router::new()
        .nest("/users", users::router(users_state))
        .nest("/session", session::router(session_state))
        .nest("/ws", ws::router(ws_state))
}

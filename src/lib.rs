pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;

use api::create_api_router;
use auth::{AuthValidator, BlacklistStore};
use axum::Router;
use db::Database;
use jwt::TokenCodec;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Revocation list consulted on every authenticated request
    pub blacklist: Arc<dyn BlacklistStore>,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Session token lifetime in seconds
    pub session_ttl: u64,
    /// Interval between purges of expired revocations
    pub purge_interval: Duration,
    /// Interval between WebSocket keepalives and session re-checks (30s when unset)
    pub ws_ping_interval: Option<Duration>,
}

/// Build the request validator for the given configuration.
pub fn create_validator(config: &ServerConfig) -> AuthValidator {
    AuthValidator::new(
        Arc::new(TokenCodec::new(&config.jwt_secret)),
        config.blacklist.clone(),
        Arc::new(config.db.users()),
    )
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let validator = create_validator(config);

    Router::new().nest(
        "/api",
        create_api_router(
            config.db.clone(),
            validator,
            config.secure_cookies,
            config.session_ttl,
            config.ws_ping_interval,
        ),
    )
}

/// Purge expired revocations once and spawn the background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(config: &ServerConfig) -> tokio::task::JoinHandle<()> {
    if let Ok(now) = jwt::unix_now() {
        cleanup::run_cleanup(config.blacklist.as_ref(), now).await;
    }
    cleanup::spawn_cleanup_scheduler(config.blacklist.clone(), config.purge_interval)
}

/// Run the server on the given listener. This function blocks until the server exits.
/// Call `init_cleanup` before this to start purging on startup.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a
/// random port. Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    init_cleanup(&config).await;

    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}

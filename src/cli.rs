//! CLI argument parsing, validation, and startup helpers.

use std::sync::Arc;
use std::time::Duration;

use crate::ServerConfig;
use crate::auth::{BlacklistStore, MemoryBlacklist};
use crate::cleanup::DEFAULT_PURGE_INTERVAL;
use crate::db::Database;
use crate::jwt::DEFAULT_SESSION_TTL_SECS;
use clap::Parser;
use tracing::{error, info, warn};

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// Where revoked tokens are recorded.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlacklistBackend {
    /// Shared through the database; every process on the same file sees every logout
    #[default]
    Database,
    /// Process-local; logouts are lost on restart and invisible to other processes
    Memory,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "parley", about = "Real-time chat server")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PARLEY_PORT", default_value = "7300")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "PARLEY_DATABASE", default_value = "parley.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Session token lifetime in seconds
    #[arg(long, env = "PARLEY_SESSION_TTL_SECS", default_value_t = DEFAULT_SESSION_TTL_SECS,
        value_parser = clap::value_parser!(u64).range(60..))]
    pub session_ttl_secs: u64,

    /// Revocation list backend
    #[arg(long, env = "PARLEY_BLACKLIST", value_enum, default_value_t = BlacklistBackend::Database)]
    pub blacklist: BlacklistBackend,

    /// Seconds between purges of expired revocations
    #[arg(long, env = "PARLEY_PURGE_INTERVAL_SECS",
        default_value_t = DEFAULT_PURGE_INTERVAL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..))]
    pub purge_interval_secs: u64,

    /// Seconds between WebSocket keepalives; open sockets re-check their session on each one
    #[arg(long, env = "PARLEY_WS_PING_INTERVAL_SECS",
        value_parser = clap::value_parser!(u64).range(1..))]
    pub ws_ping_interval_secs: Option<u64>,

    /// Set the Secure flag on session cookies (enable when served over HTTPS)
    #[arg(long, env = "PARLEY_SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    validate_jwt_secret(&secret).then_some(secret)
}

fn validate_jwt_secret(secret: &str) -> bool {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return false;
    }
    true
}

/// Construct the configured revocation list.
pub fn build_blacklist(backend: BlacklistBackend, db: &Database) -> Arc<dyn BlacklistStore> {
    match backend {
        BlacklistBackend::Database => Arc::new(db.revoked_tokens()),
        BlacklistBackend::Memory => {
            warn!("Using in-memory blacklist: logouts are not shared between processes");
            Arc::new(MemoryBlacklist::new())
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, jwt_secret: String) -> ServerConfig {
    let blacklist = build_blacklist(args.blacklist, &db);

    ServerConfig {
        db,
        blacklist,
        jwt_secret: jwt_secret.into_bytes(),
        secure_cookies: args.secure_cookies,
        session_ttl: args.session_ttl_secs,
        purge_interval: Duration::from_secs(args.purge_interval_secs),
        ws_ping_interval: args.ws_ping_interval_secs.map(Duration::from_secs),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

//! Scheduled purge of expired revocation entries.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::auth::BlacklistStore;
use crate::jwt::unix_now;

/// Default interval between purge runs.
pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Purge entries whose tokens expired at or before `now`. Returns the number removed.
pub async fn run_cleanup(blacklist: &dyn BlacklistStore, now: u64) -> u64 {
    match blacklist.purge_expired(now).await {
        Ok(count) => {
            if count > 0 {
                info!("Purged {} expired revoked tokens", count);
            }
            count
        }
        Err(e) => {
            error!(error = %e, "Failed to purge expired revoked tokens");
            0
        }
    }
}

/// Spawn a background task that purges periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(
    blacklist: Arc<dyn BlacklistStore>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately; startup already purged.
        interval.tick().await;

        loop {
            interval.tick().await;
            match unix_now() {
                Ok(now) => {
                    run_cleanup(blacklist.as_ref(), now).await;
                }
                Err(e) => error!(error = %e, "Skipping purge"),
            }
        }
    })
}

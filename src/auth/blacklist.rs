//! Revocation list for session tokens that were logged out before expiry.
//!
//! Entries are keyed by the SHA-256 digest of the token so raw credentials never
//! sit in the store, and each entry carries the token's own expiry. Once that
//! expiry passes the entry is dead weight: the token already fails verification.

use async_trait::async_trait;
use dashmap::DashMap;

/// Fixed-size key identifying a token in the store.
pub type TokenDigest = [u8; 32];

/// Digest used as the revocation key for `token`.
pub fn token_digest(token: &str) -> TokenDigest {
    openssl::sha::sha256(token.as_bytes())
}

/// Storage-layer fault in a blacklist or user store.
#[derive(Debug)]
pub struct StoreError(Box<dyn std::error::Error + Send + Sync>);

impl StoreError {
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(source.into())
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Store error: {}", self.0)
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.0.as_ref())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::new(e)
    }
}

/// A set of revoked tokens, each retained until its natural expiry.
///
/// Implementations synchronize internally and are shared across request
/// handlers behind an `Arc`.
#[async_trait]
pub trait BlacklistStore: Send + Sync {
    /// Revoke `token` until `expires_at`. Revoking twice is a no-op.
    async fn invalidate(&self, token: &str, expires_at: u64) -> Result<(), StoreError>;

    /// Whether `token` is revoked at `now`. Entries with `expires_at <= now` are
    /// treated as absent.
    async fn is_blacklisted(&self, token: &str, now: u64) -> Result<bool, StoreError>;

    /// Remove every entry with `expires_at <= now`. Returns the number removed.
    async fn purge_expired(&self, now: u64) -> Result<u64, StoreError>;

    /// Remove every entry.
    async fn flush(&self) -> Result<(), StoreError>;

    /// Number of retained entries, including expired ones not yet purged.
    async fn len(&self) -> Result<u64, StoreError>;
}

/// Process-local blacklist.
///
/// Revocations are not visible to other processes; use the database-backed
/// store when more than one server shares a user base.
#[derive(Default)]
pub struct MemoryBlacklist {
    entries: DashMap<TokenDigest, u64>,
}

impl MemoryBlacklist {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlacklistStore for MemoryBlacklist {
    async fn invalidate(&self, token: &str, expires_at: u64) -> Result<(), StoreError> {
        self.entries
            .entry(token_digest(token))
            .and_modify(|exp| *exp = (*exp).max(expires_at))
            .or_insert(expires_at);
        Ok(())
    }

    async fn is_blacklisted(&self, token: &str, now: u64) -> Result<bool, StoreError> {
        let digest = token_digest(token);
        let live = match self.entries.get(&digest) {
            Some(entry) => *entry.value() > now,
            None => return Ok(false),
        };
        if !live {
            self.entries.remove_if(&digest, |_, exp| *exp <= now);
        }
        Ok(live)
    }

    async fn purge_expired(&self, now: u64) -> Result<u64, StoreError> {
        // retain locks one shard at a time, so lookups on other shards proceed
        let mut removed = 0u64;
        self.entries.retain(|_, exp| {
            let live = *exp > now;
            if !live {
                removed += 1;
            }
            live
        });
        Ok(removed)
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.entries.clear();
        Ok(())
    }

    async fn len(&self) -> Result<u64, StoreError> {
        Ok(self.entries.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const NOW: u64 = 1_700_000_000;

    #[tokio::test]
    async fn test_invalidate_and_lookup() {
        let store = MemoryBlacklist::new();

        assert!(!store.is_blacklisted("tok-a", NOW).await.unwrap());
        store.invalidate("tok-a", NOW + 60).await.unwrap();

        assert!(store.is_blacklisted("tok-a", NOW).await.unwrap());
        assert!(!store.is_blacklisted("tok-b", NOW).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let store = MemoryBlacklist::new();

        store.invalidate("tok-a", NOW + 60).await.unwrap();
        store.invalidate("tok-a", NOW + 60).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 1);
        assert!(store.is_blacklisted("tok-a", NOW).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_absent() {
        let store = MemoryBlacklist::new();
        store.invalidate("tok-a", NOW + 60).await.unwrap();

        assert!(store.is_blacklisted("tok-a", NOW + 59).await.unwrap());
        assert!(!store.is_blacklisted("tok-a", NOW + 60).await.unwrap());
        // Lookup dropped the dead entry
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_keeps_live_entries() {
        let store = MemoryBlacklist::new();
        store.invalidate("past", NOW - 1).await.unwrap();
        store.invalidate("boundary", NOW).await.unwrap();
        store.invalidate("future", NOW + 1).await.unwrap();

        let removed = store.purge_expired(NOW).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.len().await.unwrap(), 1);
        assert!(store.is_blacklisted("future", NOW).await.unwrap());
    }

    #[tokio::test]
    async fn test_flush() {
        let store = MemoryBlacklist::new();
        store.invalidate("tok-a", NOW + 60).await.unwrap();
        store.invalidate("tok-b", NOW + 60).await.unwrap();

        store.flush().await.unwrap();
        assert_eq!(store.len().await.unwrap(), 0);
        assert!(!store.is_blacklisted("tok-a", NOW).await.unwrap());
    }

    #[tokio::test]
    async fn test_digest_is_stable_and_distinct() {
        assert_eq!(token_digest("abc"), token_digest("abc"));
        assert_ne!(token_digest("abc"), token_digest("abd"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_invalidate_and_purge() {
        let store = Arc::new(MemoryBlacklist::new());

        let mut handles = Vec::new();
        for i in 0..8u64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut removed = 0;
                for j in 0..100u64 {
                    let token = format!("tok-{}-{}", i, j);
                    // Even tokens are already expired, odd ones live
                    let exp = if j % 2 == 0 { NOW - 1 } else { NOW + 3600 };
                    store.invalidate(&token, exp).await.unwrap();
                    removed += store.purge_expired(NOW).await.unwrap();
                }
                removed
            }));
        }
        let mut removed = 0;
        for handle in handles {
            removed += handle.await.unwrap();
        }
        removed += store.purge_expired(NOW).await.unwrap();

        // Every expired insert is counted exactly once, even while others write
        assert_eq!(removed, 400);
        assert_eq!(store.len().await.unwrap(), 400);
        assert!(store.is_blacklisted("tok-3-1", NOW).await.unwrap());
        assert!(!store.is_blacklisted("tok-3-2", NOW).await.unwrap());
    }
}

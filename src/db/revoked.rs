//! Database-backed revocation list.
//!
//! Every server process opened on the same database file sees the same
//! revocations, so a logout handled by one process is honored by all of them.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;

use crate::auth::{BlacklistStore, StoreError, token_digest};

/// Store for revoked session tokens, keyed by token digest.
#[derive(Clone)]
pub struct RevokedTokenStore {
    pool: SqlitePool,
}

/// SQLite integers are signed; clamp far-future expiries instead of wrapping.
fn to_sql_time(ts: u64) -> i64 {
    i64::try_from(ts).unwrap_or(i64::MAX)
}

impl RevokedTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlacklistStore for RevokedTokenStore {
    async fn invalidate(&self, token: &str, expires_at: u64) -> Result<(), StoreError> {
        let digest = token_digest(token);
        sqlx::query(
            "INSERT INTO revoked_tokens (digest, expires_at) VALUES (?, ?)
             ON CONFLICT(digest) DO UPDATE SET expires_at = MAX(expires_at, excluded.expires_at)",
        )
        .bind(&digest[..])
        .bind(to_sql_time(expires_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_blacklisted(&self, token: &str, now: u64) -> Result<bool, StoreError> {
        let digest = token_digest(token);
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM revoked_tokens WHERE digest = ? AND expires_at > ?")
                .bind(&digest[..])
                .bind(to_sql_time(now))
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn purge_expired(&self, now: u64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= ?")
            .bind(to_sql_time(now))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM revoked_tokens")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn len(&self) -> Result<u64, StoreError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM revoked_tokens")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use crate::auth::BlacklistStore;
    use crate::db::Database;

    const NOW: u64 = 1_700_000_000;

    #[tokio::test]
    async fn test_invalidate_and_lookup() {
        let db = Database::open(":memory:").await.unwrap();
        let store = db.revoked_tokens();

        assert!(!store.is_blacklisted("tok-a", NOW).await.unwrap());
        store.invalidate("tok-a", NOW + 60).await.unwrap();

        assert!(store.is_blacklisted("tok-a", NOW).await.unwrap());
        assert!(!store.is_blacklisted("tok-b", NOW).await.unwrap());
        assert!(!store.is_blacklisted("tok-a", NOW + 60).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let db = Database::open(":memory:").await.unwrap();
        let store = db.revoked_tokens();

        store.invalidate("tok-a", NOW + 60).await.unwrap();
        store.invalidate("tok-a", NOW + 60).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_raw_token_not_stored() {
        let db = Database::open(":memory:").await.unwrap();
        db.revoked_tokens()
            .invalidate("very-secret-token", NOW + 60)
            .await
            .unwrap();

        let (digest,): (Vec<u8>,) = sqlx::query_as("SELECT digest FROM revoked_tokens")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(digest.len(), 32);
        assert!(!digest.windows(6).any(|w| w == b"secret"));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let db = Database::open(":memory:").await.unwrap();
        let store = db.revoked_tokens();

        store.invalidate("past", NOW - 1).await.unwrap();
        store.invalidate("boundary", NOW).await.unwrap();
        store.invalidate("future", NOW + 1).await.unwrap();

        assert_eq!(store.purge_expired(NOW).await.unwrap(), 2);
        assert_eq!(store.len().await.unwrap(), 1);
        assert!(store.is_blacklisted("future", NOW).await.unwrap());
    }

    #[tokio::test]
    async fn test_flush() {
        let db = Database::open(":memory:").await.unwrap();
        let store = db.revoked_tokens();

        store.invalidate("tok-a", NOW + 60).await.unwrap();
        store.flush().await.unwrap();

        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_shared_between_handles() {
        let db = Database::open(":memory:").await.unwrap();

        // Two independent store handles over one database
        let writer = db.revoked_tokens();
        writer.invalidate("tok-a", NOW + 60).await.unwrap();
        assert!(
            db.revoked_tokens()
                .is_blacklisted("tok-a", NOW)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_logout_visible_across_database_handles() {
        use crate::auth::{AuthErrorKind, AuthValidator, Principal};
        use crate::jwt::TokenCodec;
        use axum::http::{HeaderMap, HeaderValue, header};
        use std::sync::Arc;

        const SECRET: &[u8] = b"test-secret-key-for-testing";

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parley.db");
        let path = path.to_str().unwrap();

        // Two independently opened pools, as two server processes would have
        let first = Database::open(path).await.unwrap();
        let second = Database::open(path).await.unwrap();

        let validator_for = |db: &Database| {
            AuthValidator::new(
                Arc::new(TokenCodec::new(SECRET)),
                Arc::new(db.revoked_tokens()),
                Arc::new(db.users()),
            )
        };
        let first_validator = validator_for(&first);
        let second_validator = validator_for(&second);

        let id = first
            .users()
            .create("alice@example.com", "Alice", "hash")
            .await
            .unwrap();
        let principal = Principal {
            id,
            email: "alice@example.com".to_string(),
            display_name: "Alice".to_string(),
        };
        let token = TokenCodec::new(SECRET)
            .encode(&principal, NOW, 3600)
            .unwrap()
            .token;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );

        let auth = second_validator.validate(&headers, NOW).await.unwrap();
        assert_eq!(auth.principal.id, id);

        first_validator.logout(&headers, NOW + 1).await.unwrap();

        let result = second_validator.validate(&headers, NOW + 2).await;
        assert_eq!(result.unwrap_err(), AuthErrorKind::RevokedToken);
    }
}

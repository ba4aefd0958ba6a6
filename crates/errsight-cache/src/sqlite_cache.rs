//! SQLite-backed `ICacheStore`
//!
//! Every check-and-set is a single `INSERT ... ON CONFLICT DO UPDATE ...
//! WHERE` statement, so atomicity comes from SQLite itself and holds for
//! every process that opens the same database file. Expiry instants are
//! stored as Unix milliseconds.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use errsight_core::ports::ICacheStore;

use crate::CacheError;

/// Shared key-value store and lock table in SQLite
pub struct SqliteCacheStore {
    pool: SqlitePool,
}

impl SqliteCacheStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn expiry_after(ttl: Duration) -> i64 {
    let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365));
    (Utc::now() + ttl).timestamp_millis()
}

#[async_trait::async_trait]
impl ICacheStore for SqliteCacheStore {
    async fn add(&self, key: &str, value: i64, ttl: Duration) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "INSERT INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at \
             WHERE cache_entries.expires_at <= ?",
        )
        .bind(key)
        .bind(value)
        .bind(expiry_after(ttl))
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(CacheError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<i64>> {
        let value: Option<i64> =
            sqlx::query_scalar("SELECT value FROM cache_entries WHERE key = ? AND expires_at > ?")
                .bind(key)
                .bind(Utc::now().timestamp_millis())
                .fetch_optional(&self.pool)
                .await
                .map_err(CacheError::from)?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: i64, expires_at: DateTime<Utc>) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(expires_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(CacheError::from)?;
        Ok(())
    }

    async fn forget(&self, key: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(CacheError::from)?;
        Ok(())
    }

    async fn acquire_lock(&self, name: &str, owner: &str, ttl: Duration) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "INSERT INTO cache_locks (name, owner, expires_at) VALUES (?, ?, ?) \
             ON CONFLICT(name) DO UPDATE SET owner = excluded.owner, expires_at = excluded.expires_at \
             WHERE cache_locks.expires_at <= ?",
        )
        .bind(name)
        .bind(owner)
        .bind(expiry_after(ttl))
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(CacheError::from)?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_lock(&self, name: &str, owner: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM cache_locks WHERE name = ? AND owner = ?")
            .bind(name)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(CacheError::from)?;
        Ok(())
    }

    async fn purge_expired(&self) -> anyhow::Result<u64> {
        let now = Utc::now().timestamp_millis();
        let entries = sqlx::query("DELETE FROM cache_entries WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(CacheError::from)?;
        let locks = sqlx::query("DELETE FROM cache_locks WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(CacheError::from)?;
        let purged = entries.rows_affected() + locks.rows_affected();
        if purged > 0 {
            tracing::debug!(purged, "Purged expired cache rows");
        }
        Ok(purged)
    }
}

//! Shared key-value store port (driven/secondary port)
//!
//! Backs the ephemeral dedupe keys and the daily quota counter. Every
//! implementation must make `add` and `acquire_lock` atomic across all
//! callers that share the store; for the SQLite backend this includes
//! other processes.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Atomic key-value store with expiring entries and named locks
#[async_trait::async_trait]
pub trait ICacheStore: Send + Sync {
    /// Stores `value` under `key` only if no live entry exists
    ///
    /// Returns `true` when this call created the entry.
    async fn add(&self, key: &str, value: i64, ttl: Duration) -> anyhow::Result<bool>;

    /// Reads a live entry
    async fn get(&self, key: &str) -> anyhow::Result<Option<i64>>;

    /// Stores `value` unconditionally until `expires_at`
    async fn put(&self, key: &str, value: i64, expires_at: DateTime<Utc>) -> anyhow::Result<()>;

    /// Removes an entry
    async fn forget(&self, key: &str) -> anyhow::Result<()>;

    /// Takes the lock `name` for `owner` unless a live holder exists
    async fn acquire_lock(&self, name: &str, owner: &str, ttl: Duration) -> anyhow::Result<bool>;

    /// Releases the lock if `owner` still holds it
    async fn release_lock(&self, name: &str, owner: &str) -> anyhow::Result<()>;

    /// Removes expired entries and locks, returning how many were dropped
    ///
    /// Expired data is already invisible to readers; this only reclaims space.
    async fn purge_expired(&self) -> anyhow::Result<u64>;
}

//! Daily quota gate for AI calls
//!
//! The counter lives in an [`ICacheStore`] under a key scoped to the UTC
//! calendar day and expires at the next UTC midnight. Increments happen
//! inside a short named lock so concurrent workers, including workers in
//! other processes sharing the store, never spend more than the limit.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::ports::ICacheStore;

/// Prefix of the per-day counter key
pub const COUNTER_KEY_PREFIX: &str = "error_analysis_count";

/// Default lifetime of the counter lock
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(5);

/// Default time spent waiting for the counter lock
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(5);

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Atomic check-and-increment of the daily AI call counter
pub struct QuotaGate {
    cache: Arc<dyn ICacheStore + Send + Sync>,
    daily_limit: u32,
    lock_ttl: Duration,
    lock_wait: Duration,
}

impl QuotaGate {
    pub fn new(cache: Arc<dyn ICacheStore + Send + Sync>, daily_limit: u32) -> Self {
        Self {
            cache,
            daily_limit,
            lock_ttl: DEFAULT_LOCK_TTL,
            lock_wait: DEFAULT_LOCK_WAIT,
        }
    }

    /// Overrides how long the lock lives and how long callers wait for it
    pub fn with_lock_timing(mut self, ttl: Duration, wait: Duration) -> Self {
        self.lock_ttl = ttl;
        self.lock_wait = wait;
        self
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Counter key for a UTC day, e.g. `error_analysis_count:20260131`
    pub fn counter_key(day: NaiveDate) -> String {
        format!("{}:{}", COUNTER_KEY_PREFIX, day.format("%Y%m%d"))
    }

    /// Consumes one unit of today's quota
    ///
    /// Returns `false` when the limit is reached, when the lock cannot be
    /// taken in time, or when the store fails. It never double-spends.
    pub async fn try_consume(&self) -> bool {
        self.try_consume_at(Utc::now()).await
    }

    /// [`QuotaGate::try_consume`] against an explicit clock
    pub async fn try_consume_at(&self, now: DateTime<Utc>) -> bool {
        let key = Self::counter_key(now.date_naive());
        let lock = format!("{}:lock", key);
        let owner = uuid::Uuid::new_v4().to_string();

        match self.acquire(&lock, &owner).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(key = %key, "Quota lock not acquired in time, refusing");
                return false;
            }
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Quota lock failed, refusing");
                return false;
            }
        }

        let outcome = self.increment(&key, now).await;

        if let Err(e) = self.cache.release_lock(&lock, &owner).await {
            tracing::warn!(error = %e, lock = %lock, "Failed to release quota lock");
        }

        match outcome {
            Ok(granted) => granted,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Quota counter update failed, refusing");
                false
            }
        }
    }

    /// `max(0, limit - count)` for today; advisory only
    pub async fn remaining_quota(&self) -> Result<u32> {
        self.remaining_quota_at(Utc::now()).await
    }

    pub async fn remaining_quota_at(&self, now: DateTime<Utc>) -> Result<u32> {
        let key = Self::counter_key(now.date_naive());
        let count = self
            .cache
            .get(&key)
            .await
            .context("Failed to read quota counter")?
            .unwrap_or(0);
        let remaining = i64::from(self.daily_limit) - count;
        Ok(u32::try_from(remaining.max(0)).unwrap_or(u32::MAX))
    }

    /// Clears today's counter
    pub async fn reset(&self) -> Result<()> {
        self.reset_at(Utc::now()).await
    }

    pub async fn reset_at(&self, now: DateTime<Utc>) -> Result<()> {
        let key = Self::counter_key(now.date_naive());
        self.cache
            .forget(&key)
            .await
            .context("Failed to reset quota counter")?;
        tracing::info!(key = %key, "Quota counter reset");
        Ok(())
    }

    async fn acquire(&self, lock: &str, owner: &str) -> Result<bool> {
        let deadline = tokio::time::Instant::now() + self.lock_wait;
        loop {
            if self.cache.acquire_lock(lock, owner, self.lock_ttl).await? {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(LOCK_RETRY_INTERVAL).await;
        }
    }

    async fn increment(&self, key: &str, now: DateTime<Utc>) -> Result<bool> {
        let count = self.cache.get(key).await?.unwrap_or(0);
        if count >= i64::from(self.daily_limit) {
            tracing::warn!(key = %key, count, limit = self.daily_limit, "Daily AI quota exhausted");
            return Ok(false);
        }
        self.cache.put(key, count + 1, end_of_day(now)).await?;
        tracing::debug!(key = %key, count = count + 1, "Quota unit consumed");
        Ok(true)
    }
}

/// Next UTC midnight after `now`
fn end_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    match now.date_naive().succ_opt() {
        Some(tomorrow) => tomorrow.and_time(NaiveTime::MIN).and_utc(),
        None => now + chrono::Duration::days(1),
    }
}

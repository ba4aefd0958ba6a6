//! In-process `ICacheStore`
//!
//! Uses `DashMap` entry locking for atomic add-if-absent. Only suitable
//! when every worker runs inside one process; the quota and dedupe
//! guarantees do not extend to other processes.
//!
//! Dedupe keys embed their window, so an expired key is never written
//! again. `add` therefore drops expired entries itself, at most once per
//! sweep interval.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use errsight_core::ports::ICacheStore;

#[derive(Debug, Clone)]
struct Slot<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

impl<T> Slot<T> {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Default minimum time between two sweeps triggered by `add`
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Process-local expiring key-value store with named locks
#[derive(Debug)]
pub struct InMemoryCacheStore {
    entries: DashMap<String, Slot<i64>>,
    locks: DashMap<String, Slot<String>>,
    sweep_interval: Duration,
    /// Unix milliseconds of the last sweep
    last_sweep: AtomicI64,
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            locks: DashMap::new(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            last_sweep: AtomicI64::new(Utc::now().timestamp_millis()),
        }
    }
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Number of stored entries, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every expired entry and lock
    fn sweep(&self) -> u64 {
        let now = Utc::now();
        let before = self.entries.len() + self.locks.len();
        self.entries.retain(|_, slot| slot.is_live(now));
        self.locks.retain(|_, slot| slot.is_live(now));
        let after = self.entries.len() + self.locks.len();
        self.last_sweep.store(now.timestamp_millis(), Ordering::Relaxed);
        before.saturating_sub(after) as u64
    }

    /// Sweeps when the interval has elapsed; only one caller wins the slot
    fn maybe_sweep(&self) {
        let now = Utc::now().timestamp_millis();
        let interval = i64::try_from(self.sweep_interval.as_millis()).unwrap_or(i64::MAX);
        let last = self.last_sweep.load(Ordering::Relaxed);
        if now.saturating_sub(last) < interval {
            return;
        }
        if self
            .last_sweep
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            let purged = self.sweep();
            if purged > 0 {
                tracing::debug!(purged, "Swept expired in-memory cache entries");
            }
        }
    }
}

fn expiry_after(ttl: Duration) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365))
}

/// Inserts `slot` unless a live value occupies `key`
fn insert_if_vacant<T>(map: &DashMap<String, Slot<T>>, key: &str, slot: Slot<T>) -> bool {
    let now = Utc::now();
    match map.entry(key.to_string()) {
        Entry::Occupied(mut occupied) => {
            if occupied.get().is_live(now) {
                false
            } else {
                occupied.insert(slot);
                true
            }
        }
        Entry::Vacant(vacant) => {
            vacant.insert(slot);
            true
        }
    }
}

#[async_trait::async_trait]
impl ICacheStore for InMemoryCacheStore {
    async fn add(&self, key: &str, value: i64, ttl: Duration) -> anyhow::Result<bool> {
        self.maybe_sweep();
        let slot = Slot {
            value,
            expires_at: expiry_after(ttl),
        };
        Ok(insert_if_vacant(&self.entries, key, slot))
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<i64>> {
        let now = Utc::now();
        Ok(self
            .entries
            .get(key)
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.value))
    }

    async fn put(&self, key: &str, value: i64, expires_at: DateTime<Utc>) -> anyhow::Result<()> {
        self.entries
            .insert(key.to_string(), Slot { value, expires_at });
        Ok(())
    }

    async fn forget(&self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn acquire_lock(&self, name: &str, owner: &str, ttl: Duration) -> anyhow::Result<bool> {
        let slot = Slot {
            value: owner.to_string(),
            expires_at: expiry_after(ttl),
        };
        Ok(insert_if_vacant(&self.locks, name, slot))
    }

    async fn release_lock(&self, name: &str, owner: &str) -> anyhow::Result<()> {
        self.locks.remove_if(name, |_, slot| slot.value == owner);
        Ok(())
    }

    async fn purge_expired(&self) -> anyhow::Result<u64> {
        Ok(self.sweep())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_only_succeeds_once() {
        let store = InMemoryCacheStore::new();
        assert!(store.add("k", 1, Duration::from_secs(60)).await.unwrap());
        assert!(!store.add("k", 2, Duration::from_secs(60)).await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn expired_entries_can_be_replaced() {
        let store = InMemoryCacheStore::new();
        store
            .put("k", 1, Utc::now() - chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.add("k", 2, Duration::from_secs(60)).await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn lock_release_requires_owner() {
        let store = InMemoryCacheStore::new();
        let ttl = Duration::from_secs(5);
        assert!(store.acquire_lock("l", "a", ttl).await.unwrap());
        assert!(!store.acquire_lock("l", "b", ttl).await.unwrap());

        store.release_lock("l", "b").await.unwrap();
        assert!(!store.acquire_lock("l", "b", ttl).await.unwrap());

        store.release_lock("l", "a").await.unwrap();
        assert!(store.acquire_lock("l", "b", ttl).await.unwrap());
    }

    #[tokio::test]
    async fn add_sweeps_expired_dedupe_keys() {
        let store = InMemoryCacheStore::new().with_sweep_interval(Duration::ZERO);
        for window in 0..1000 {
            let key = format!("error_analyzer:dedupe:abc:{}", window);
            assert!(store.add(&key, 1, Duration::from_millis(1)).await.unwrap());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(store.get("error_analyzer:dedupe:abc:0").await.unwrap(), None);

        assert!(store.add("fresh", 1, Duration::from_secs(60)).await.unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn add_waits_for_the_sweep_interval() {
        let store = InMemoryCacheStore::new().with_sweep_interval(Duration::from_secs(3600));
        store
            .put("stale", 1, Utc::now() - chrono::Duration::seconds(1))
            .await
            .unwrap();
        store.add("fresh", 1, Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn purge_expired_drops_entries_and_locks() {
        let store = InMemoryCacheStore::new();
        let past = Utc::now() - chrono::Duration::seconds(1);
        store.put("a", 1, past).await.unwrap();
        store.put("b", 1, past).await.unwrap();
        store.add("live", 1, Duration::from_secs(60)).await.unwrap();
        store
            .acquire_lock("l", "owner", Duration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(store.purge_expired().await.unwrap(), 3);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("live").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn forget_removes_entry() {
        let store = InMemoryCacheStore::new();
        store.add("k", 1, Duration::from_secs(60)).await.unwrap();
        store.forget("k").await.unwrap();
        assert!(store.is_empty());
    }
}

//! DashMap Counter Store
//!
//! Implements CounterStore using DashMap for concurrent access.
//! Increments hold the shard lock of the key, so they are atomic.

use crate::domain::ports::{CounterStore, CounterStoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A counter value and its optional deadline.
#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    value: i64,
    expires_at: Option<Instant>,
}

impl CounterEntry {
    fn new(now: Instant, expires_in: Option<Duration>) -> Self {
        Self {
            value: 0,
            expires_at: expires_in.map(|ttl| now + ttl),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

/// DashMap-backed counter store.
///
/// Expired keys are treated as missing on access and removed by the
/// optional background garbage collection task.
pub struct DashMapCounterStore {
    counters: Arc<DashMap<String, CounterEntry>>,
}

impl DashMapCounterStore {
    /// Create a new store.
    pub fn new() -> Self {
        Self {
            counters: Arc::new(DashMap::new()),
        }
    }

    /// Start the background garbage collection task.
    ///
    /// Removes keys whose expiry has passed.
    pub fn start_gc(&self, interval: Duration) {
        let counters = self.counters.clone();

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                let removed = Self::purge_expired(&counters);
                if removed > 0 {
                    tracing::debug!("counter GC removed {} expired keys", removed);
                }
            }
        });
    }

    /// Remove expired keys now. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        Self::purge_expired(&self.counters)
    }

    fn purge_expired(counters: &DashMap<String, CounterEntry>) -> usize {
        let now = Instant::now();
        let before = counters.len();
        counters.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(counters.len())
    }

    /// Time left before `key` expires (for debugging and tests).
    pub fn time_to_live(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.counters
            .get(key)
            .and_then(|e| e.expires_at)
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

impl Default for DashMapCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for DashMapCounterStore {
    async fn increment_and_get(
        &self,
        key: &str,
        delta: i64,
        expires_in: Option<Duration>,
    ) -> Result<i64, CounterStoreError> {
        let now = Instant::now();
        let mut entry = self
            .counters
            .entry(key.to_string())
            .or_insert_with(|| CounterEntry::new(now, expires_in));

        if entry.is_expired(now) {
            *entry = CounterEntry::new(now, expires_in);
        }

        entry.value += delta;
        Ok(entry.value)
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, CounterStoreError> {
        let now = Instant::now();
        Ok(self
            .counters
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.value))
    }

    async fn set_expiration(&self, key: &str, ttl: Duration) -> Result<(), CounterStoreError> {
        if let Some(mut entry) = self.counters.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn remove_all(&self) -> Result<(), CounterStoreError> {
        self.counters.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize, CounterStoreError> {
        let now = Instant::now();
        Ok(self
            .counters
            .iter()
            .filter(|e| !e.value().is_expired(now))
            .count())
    }
}

//! Counter Store Port
//!
//! Defines the interface for the cache holding usage counters.

use async_trait::async_trait;
use std::time::Duration;

/// Errors raised by counter stores.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CounterStoreError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
}

/// Store of integer counters with per-key expiry.
///
/// This is an outbound port for usage metering. Correctness of the usage
/// counters depends entirely on `increment_and_get` being atomic: each call
/// must observe every increment that completed before it.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Add `delta` to the counter at `key` and return the new value.
    ///
    /// A missing or expired key starts at zero; `expires_in` is applied
    /// only when the key is created.
    async fn increment_and_get(
        &self,
        key: &str,
        delta: i64,
        expires_in: Option<Duration>,
    ) -> Result<i64, CounterStoreError>;

    /// Get the current value, or None if the key is missing or expired.
    async fn get(&self, key: &str) -> Result<Option<i64>, CounterStoreError>;

    /// Set the time-to-live of an existing key.
    async fn set_expiration(&self, key: &str, ttl: Duration) -> Result<(), CounterStoreError>;

    /// Remove every key.
    async fn remove_all(&self) -> Result<(), CounterStoreError>;

    /// Number of live keys.
    async fn count(&self) -> Result<usize, CounterStoreError>;
}

//! Usage Counter
//!
//! Per-organization hourly and monthly event counters on top of a
//! CounterStore. Every update is a single atomic increment per key; no
//! application-level locking is involved.

use crate::domain::entities::UsageSnapshot;
use crate::domain::ports::{Clock, CounterStore, CounterStoreError};
use crate::domain::value_objects::{CounterKind, UsageWindow};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Hourly and monthly values of one counter kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageTotals {
    pub hourly: i64,
    pub monthly: i64,
}

/// Usage counters for organizations.
pub struct UsageCounter {
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
}

impl UsageCounter {
    pub fn new(store: Arc<dyn CounterStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Current time according to the counter's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Add `count` events to the totals, and to the blocked counters too
    /// when `is_blocked`.
    pub async fn increment(
        &self,
        organization_id: &str,
        is_blocked: bool,
        count: u32,
    ) -> Result<UsageSnapshot, CounterStoreError> {
        let now = self.now();
        let count = i64::from(count);

        let totals = self.increment_totals(organization_id, count, now).await?;
        let blocked = if is_blocked {
            self.increment_blocked(organization_id, count, now).await?
        } else {
            self.get_totals(organization_id, CounterKind::Blocked, now).await?
        };

        Ok(snapshot(totals, blocked))
    }

    /// Add `count` to the hourly and monthly totals for the windows at `now`.
    pub async fn increment_totals(
        &self,
        organization_id: &str,
        count: i64,
        now: DateTime<Utc>,
    ) -> Result<UsageTotals, CounterStoreError> {
        self.increment_kind(organization_id, CounterKind::Total, count, now)
            .await
    }

    /// Add `count` to the hourly and monthly blocked counters for the windows at `now`.
    ///
    /// Callers must have added at least `count` to the totals first so that
    /// blocked never exceeds total.
    pub async fn increment_blocked(
        &self,
        organization_id: &str,
        count: i64,
        now: DateTime<Utc>,
    ) -> Result<UsageTotals, CounterStoreError> {
        self.increment_kind(organization_id, CounterKind::Blocked, count, now)
            .await
    }

    /// Read all four counters for the current windows. Missing keys read as zero.
    pub async fn current(&self, organization_id: &str) -> Result<UsageSnapshot, CounterStoreError> {
        self.snapshot_at(organization_id, self.now()).await
    }

    /// Read all four counters for the windows at `now`.
    pub async fn snapshot_at(
        &self,
        organization_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UsageSnapshot, CounterStoreError> {
        let (totals, blocked) = tokio::try_join!(
            self.get_totals(organization_id, CounterKind::Total, now),
            self.get_totals(organization_id, CounterKind::Blocked, now),
        )?;
        Ok(snapshot(totals, blocked))
    }

    /// Read the hourly and monthly values of one counter kind.
    pub async fn get_totals(
        &self,
        organization_id: &str,
        kind: CounterKind,
        now: DateTime<Utc>,
    ) -> Result<UsageTotals, CounterStoreError> {
        let hourly_key = UsageWindow::Hourly.counter_key(kind, now, organization_id);
        let monthly_key = UsageWindow::Monthly.counter_key(kind, now, organization_id);

        let (hourly, monthly) = tokio::try_join!(
            self.store.get(&hourly_key),
            self.store.get(&monthly_key),
        )?;

        Ok(UsageTotals {
            hourly: hourly.unwrap_or(0),
            monthly: monthly.unwrap_or(0),
        })
    }

    async fn increment_kind(
        &self,
        organization_id: &str,
        kind: CounterKind,
        count: i64,
        now: DateTime<Utc>,
    ) -> Result<UsageTotals, CounterStoreError> {
        let hourly_key = UsageWindow::Hourly.counter_key(kind, now, organization_id);
        let monthly_key = UsageWindow::Monthly.counter_key(kind, now, organization_id);

        let (hourly, monthly) = tokio::try_join!(
            self.store.increment_and_get(
                &hourly_key,
                count,
                Some(UsageWindow::Hourly.expires_in())
            ),
            self.store.increment_and_get(
                &monthly_key,
                count,
                Some(UsageWindow::Monthly.expires_in())
            ),
        )?;

        tracing::debug!(
            "usage {} +{} for {}: hourly={} monthly={}",
            kind.as_str(),
            count,
            organization_id,
            hourly,
            monthly
        );

        Ok(UsageTotals { hourly, monthly })
    }
}

fn snapshot(totals: UsageTotals, blocked: UsageTotals) -> UsageSnapshot {
    UsageSnapshot {
        hourly_total: totals.hourly,
        monthly_total: totals.monthly,
        hourly_blocked: blocked.hourly,
        monthly_blocked: blocked.monthly,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::adapters::outbound::{DashMapCounterStore, ManualClock};
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn counter() -> (UsageCounter, Arc<DashMapCounterStore>, Arc<ManualClock>) {
        let store = Arc::new(DashMapCounterStore::new());
        let clock = Arc::new(ManualClock::new(start()));
        (UsageCounter::new(store.clone(), clock.clone()), store, clock)
    }

    #[tokio::test]
    async fn test_increment_not_blocked() {
        let (counter, store, _) = counter();

        let usage = counter.increment("org1", false, 4).await.unwrap();

        assert_eq!(
            usage,
            UsageSnapshot {
                hourly_total: 4,
                monthly_total: 4,
                hourly_blocked: 0,
                monthly_blocked: 0,
            }
        );
        assert_eq!(store.get("usage-total:010100:org1").await.unwrap(), Some(4));
        assert_eq!(store.get("usage-total:01:org1").await.unwrap(), Some(4));
        assert_eq!(store.get("usage-blocked:01:org1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_increment_blocked_counts_both() {
        let (counter, _, _) = counter();

        counter.increment("org1", false, 4).await.unwrap();
        let usage = counter.increment("org1", true, 3).await.unwrap();

        assert_eq!(usage.hourly_total, 7);
        assert_eq!(usage.monthly_total, 7);
        assert_eq!(usage.hourly_blocked, 3);
        assert_eq!(usage.monthly_blocked, 3);
    }

    #[tokio::test]
    async fn test_organizations_are_isolated() {
        let (counter, _, _) = counter();

        counter.increment("a", false, 5).await.unwrap();
        counter.increment("b", true, 2).await.unwrap();

        assert_eq!(counter.current("a").await.unwrap().monthly_total, 5);
        assert_eq!(counter.current("b").await.unwrap().monthly_blocked, 2);
        assert_eq!(counter.current("c").await.unwrap(), UsageSnapshot::default());
    }

    #[tokio::test]
    async fn test_new_hour_resets_hourly_only() {
        let (counter, _, clock) = counter();

        counter.increment("org1", false, 10).await.unwrap();
        clock.advance(chrono::Duration::hours(1));
        let usage = counter.increment("org1", false, 2).await.unwrap();

        assert_eq!(usage.hourly_total, 2);
        assert_eq!(usage.monthly_total, 12);
    }

    #[tokio::test]
    async fn test_new_month_resets_both() {
        let (counter, _, clock) = counter();

        counter.increment("org1", true, 10).await.unwrap();
        clock.set(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());

        assert_eq!(counter.current("org1").await.unwrap(), UsageSnapshot::default());
    }

    #[tokio::test]
    async fn test_keys_created_with_window_expiry() {
        let (counter, store, _) = counter();

        counter.increment("org1", true, 1).await.unwrap();

        let hourly = store.time_to_live("usage-blocked:010100:org1").unwrap();
        let monthly = store.time_to_live("usage-total:01:org1").unwrap();
        assert!(hourly <= UsageWindow::Hourly.expires_in());
        assert!(hourly > UsageWindow::Hourly.expires_in() / 2);
        assert!(monthly > UsageWindow::Hourly.expires_in());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_sum_exactly() {
        let (counter, _, _) = counter();
        let counter = Arc::new(counter);

        let handles: Vec<_> = (1..=40u32)
            .map(|i| {
                let c = counter.clone();
                tokio::spawn(async move { c.increment("org1", i % 2 == 0, i).await })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let usage = counter.current("org1").await.unwrap();
        // 1 + 2 + ... + 40
        assert_eq!(usage.hourly_total, 820);
        assert_eq!(usage.monthly_total, 820);
        // 2 + 4 + ... + 40
        assert_eq!(usage.monthly_blocked, 420);
        assert!(usage.hourly_blocked <= usage.hourly_total);
    }
}

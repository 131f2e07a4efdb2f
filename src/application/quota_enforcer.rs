//! Quota Enforcer
//!
//! Meters incoming event batches against an organization's plan, decides
//! how much of each batch is blocked, and publishes a notification the
//! first time an organization goes over its allowance in a window.

use crate::application::{QuotaError, UsageCounter};
use crate::domain::entities::{Organization, PlanOverage, UsageInfo, UsageSnapshot};
use crate::domain::ports::{Clock, CounterStore, MessagePublisher, OrganizationRepository, PublishError};
use crate::domain::services::QuotaPolicy;
use crate::domain::value_objects::{CounterKind, UsageMonth, UsageWindow, USAGE_METRIC};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Minimum time between two saves of an organization's usage to the repository.
pub const USAGE_SAVE_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub struct QuotaEnforcer {
    organizations: Arc<dyn OrganizationRepository>,
    store: Arc<dyn CounterStore>,
    publisher: Arc<dyn MessagePublisher>,
    counter: UsageCounter,
}

impl QuotaEnforcer {
    pub fn new(
        organizations: Arc<dyn OrganizationRepository>,
        store: Arc<dyn CounterStore>,
        publisher: Arc<dyn MessagePublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            organizations,
            counter: UsageCounter::new(store.clone(), clock),
            store,
            publisher,
        }
    }

    /// The usage counter this enforcer updates.
    pub fn counter(&self) -> &UsageCounter {
        &self.counter
    }

    /// Record a batch of `count` events. Returns true when any part of the
    /// batch was blocked.
    pub async fn record_usage(&self, organization_id: &str, count: u32) -> Result<bool, QuotaError> {
        self.increment_usage(organization_id, false, count).await
    }

    /// Record a batch of `count` events; a `too_big` batch is blocked whole.
    pub async fn increment_usage(
        &self,
        organization_id: &str,
        too_big: bool,
        count: u32,
    ) -> Result<bool, QuotaError> {
        if organization_id.is_empty() {
            tracing::debug!("usage recorded without an organization id, ignoring");
            return Ok(false);
        }

        let Some(organization) = self.organizations.get_by_id(organization_id).await? else {
            tracing::warn!("usage recorded for unknown organization {}", organization_id);
            return Ok(false);
        };

        let now = self.counter.now();
        let count = i64::from(count);

        let totals = self
            .counter
            .increment_totals(organization_id, count, now)
            .await?;

        let decision = QuotaPolicy::evaluate(
            organization.max_events_per_month,
            too_big,
            count,
            totals.hourly,
            totals.monthly,
            now,
        );

        let blocked = if decision.is_blocked() {
            tracing::info!(
                "blocking {} of {} events for {} (hourly={} limit={:?} monthly={} max={})",
                decision.blocked,
                count,
                organization_id,
                totals.hourly,
                decision.hourly_limit,
                totals.monthly,
                organization.max_events_per_month
            );
            self.counter
                .increment_blocked(organization_id, decision.blocked, now)
                .await?
        } else {
            self.counter
                .get_totals(organization_id, CounterKind::Blocked, now)
                .await?
        };

        let usage = UsageSnapshot {
            hourly_total: totals.hourly,
            monthly_total: totals.monthly,
            hourly_blocked: blocked.hourly,
            monthly_blocked: blocked.monthly,
        };

        if let Some(window) = decision.exceeded_window() {
            self.notify_overage(organization_id, window, &usage, now).await?;
        }

        self.save_usage_if_due(&organization, &usage, now).await;

        Ok(decision.is_blocked())
    }

    /// Publish a `PlanOverage` unless one was already sent for this window.
    async fn notify_overage(
        &self,
        organization_id: &str,
        window: UsageWindow,
        usage: &UsageSnapshot,
        now: DateTime<Utc>,
    ) -> Result<(), QuotaError> {
        let marker = window.overage_key(now, organization_id);
        let seen = self
            .store
            .increment_and_get(&marker, 1, Some(window.expires_in()))
            .await?;
        if seen != 1 {
            return Ok(());
        }

        let message = PlanOverage {
            organization_id: organization_id.to_string(),
            is_hourly: window == UsageWindow::Hourly,
            date: now,
            hourly_total: usage.hourly_total,
            monthly_total: usage.monthly_total,
            hourly_blocked: usage.hourly_blocked,
            monthly_blocked: usage.monthly_blocked,
        };
        let payload =
            serde_json::to_value(&message).map_err(|e| PublishError::Serialize(e.to_string()))?;

        if let Err(e) = self.publisher.publish(PlanOverage::TOPIC, payload).await {
            tracing::error!(
                "failed to publish {} overage for {}: {}",
                window,
                organization_id,
                e
            );
            // Release the marker so a retry in this window can notify.
            if let Err(rollback) = self.store.increment_and_get(&marker, -1, None).await {
                tracing::warn!("failed to release overage marker {}: {}", marker, rollback);
            }
            return Err(e.into());
        }

        tracing::info!("published {} overage for {}", window, organization_id);
        Ok(())
    }

    /// Save the month's usage to the repository at most once per save interval.
    async fn save_usage_if_due(&self, organization: &Organization, usage: &UsageSnapshot, now: DateTime<Utc>) {
        let Some(id) = organization.id.as_deref() else {
            return;
        };

        let key = format!("{}-saved:{}", USAGE_METRIC, id);
        match self
            .store
            .increment_and_get(&key, 1, Some(USAGE_SAVE_INTERVAL))
            .await
        {
            Ok(1) => {}
            Ok(_) => return,
            Err(e) => {
                tracing::warn!("could not check usage save marker for {}: {}", id, e);
                return;
            }
        }

        let info = UsageInfo {
            date: UsageMonth::from_datetime(now),
            limit: organization.max_events_per_month,
            total: usage.monthly_total,
            blocked: usage.monthly_blocked,
        };
        if let Err(e) = self.organizations.update_usage(id, info).await {
            tracing::warn!("failed to save usage for {}: {}", id, e);
        }
    }
}

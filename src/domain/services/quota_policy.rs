//! Quota Policy Service
//!
//! Pure domain logic deciding how much of an incoming batch is blocked.
//! This service has NO external dependencies - it works on counter values
//! that were already incremented atomically by the caller.

use crate::domain::value_objects::UsageWindow;
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};

/// Factor applied to the even per-hour share of the remaining monthly
/// budget. Allows bursts while stopping a single hour from draining a month.
pub const HOURLY_BURST_MULTIPLIER: f64 = 5.0;

/// Outcome of evaluating one batch against an organization's limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaDecision {
    /// Hourly limit in effect, `None` when the organization is unlimited
    pub hourly_limit: Option<i64>,
    /// Events of the batch above the hourly limit
    pub hourly_overage: i64,
    /// Events of the batch above the monthly limit
    pub monthly_overage: i64,
    /// Events of the batch that must be counted as blocked
    pub blocked: i64,
}

impl QuotaDecision {
    pub fn is_blocked(&self) -> bool {
        self.blocked > 0
    }

    /// The window whose limit this batch went over.
    ///
    /// The monthly window wins when both are over, so an organization past
    /// its monthly limit is not notified again every hour.
    pub fn exceeded_window(&self) -> Option<UsageWindow> {
        if self.monthly_overage > 0 {
            Some(UsageWindow::Monthly)
        } else if self.hourly_overage > 0 {
            Some(UsageWindow::Hourly)
        } else {
            None
        }
    }
}

/// Quota policy for usage metering.
pub struct QuotaPolicy;

impl QuotaPolicy {
    /// Hours from the start of the current UTC hour until the next month begins.
    ///
    /// Measured from the hour start so the result (and the hourly limit
    /// derived from it) stays constant for the whole hourly window.
    pub fn hours_left_in_month(now: DateTime<Utc>) -> f64 {
        let (year, month) = if now.month() == 12 {
            (now.year() + 1, 1)
        } else {
            (now.year(), now.month() + 1)
        };

        let hour_start = now.date_naive().and_hms_opt(now.hour(), 0, 0);
        let next_month = NaiveDate::from_ymd_opt(year, month, 1).and_then(|d| d.and_hms_opt(0, 0, 0));

        match (hour_start, next_month) {
            (Some(start), Some(end)) => (end - start).num_minutes() as f64 / 60.0,
            _ => 0.0,
        }
    }

    /// Hourly event limit given the monthly limit and the events accepted
    /// in the month before the current hour.
    ///
    /// Returns `None` for unlimited organizations.
    pub fn hourly_event_limit(
        max_events_per_month: i64,
        used_before_hour: i64,
        now: DateTime<Utc>,
    ) -> Option<i64> {
        if max_events_per_month < 0 {
            return None;
        }

        let left = (max_events_per_month - used_before_hour).max(0);
        if left == 0 {
            return Some(0);
        }

        let hours_left = Self::hours_left_in_month(now);
        if hours_left < 1.0 {
            return Some(left);
        }

        Some((left as f64 / hours_left * HOURLY_BURST_MULTIPLIER).ceil() as i64)
    }

    /// Evaluate a batch of `count` events.
    ///
    /// `hourly_total` and `monthly_total` are the counter values *after*
    /// the batch was added, as returned by the atomic increment.
    pub fn evaluate(
        max_events_per_month: i64,
        too_big: bool,
        count: i64,
        hourly_total: i64,
        monthly_total: i64,
        now: DateTime<Utc>,
    ) -> QuotaDecision {
        if count <= 0 {
            return QuotaDecision::default();
        }

        let used_before_hour = (monthly_total - hourly_total).max(0);
        let hourly_limit = Self::hourly_event_limit(max_events_per_month, used_before_hour, now);

        let (hourly_overage, monthly_overage) = match hourly_limit {
            Some(limit) => (
                (hourly_total - limit).clamp(0, count),
                (monthly_total - max_events_per_month).clamp(0, count),
            ),
            None => (0, 0),
        };

        let blocked = if too_big {
            count
        } else {
            hourly_overage.max(monthly_overage)
        };

        QuotaDecision {
            hourly_limit,
            hourly_overage,
            monthly_overage,
            blocked,
        }
    }
}

//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prefix shared by all usage counter keys.
pub const USAGE_METRIC: &str = "usage";

/// Counting window for usage counters.
///
/// Windows reset implicitly: the key embeds a token derived from the
/// current UTC time, so a new hour (or month) lands on a fresh key.
/// Tokens are not year-aware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UsageWindow {
    /// `MMddHH`
    Hourly,
    /// `MM`
    Monthly,
}

impl UsageWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Monthly => "monthly",
        }
    }

    /// Window token for the given instant.
    pub fn token(&self, now: DateTime<Utc>) -> String {
        match self {
            Self::Hourly => now.format("%m%d%H").to_string(),
            Self::Monthly => now.format("%m").to_string(),
        }
    }

    /// How long a counter key for this window is kept after creation.
    pub fn expires_in(&self) -> Duration {
        match self {
            Self::Hourly => Duration::from_secs(61 * 60),
            Self::Monthly => Duration::from_secs(32 * 24 * 60 * 60),
        }
    }

    /// Counter key: `usage-{total|blocked}:{token}:{organization_id}`.
    pub fn counter_key(&self, kind: CounterKind, now: DateTime<Utc>, organization_id: &str) -> String {
        format!(
            "{}-{}:{}:{}",
            USAGE_METRIC,
            kind.as_str(),
            self.token(now),
            organization_id
        )
    }

    /// Marker key counting overage notifications for this window.
    pub fn overage_key(&self, now: DateTime<Utc>, organization_id: &str) -> String {
        // The hourly and monthly tokens differ in length, so the keys never collide.
        format!("{}-overage:{}:{}", USAGE_METRIC, self.token(now), organization_id)
    }
}

impl std::fmt::Display for UsageWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which counter of a window is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterKind {
    /// Every event received
    Total,
    /// Events rejected because of the plan limit or size
    Blocked,
}

impl CounterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Total => "total",
            Self::Blocked => "blocked",
        }
    }
}

/// A calendar month, used to key persisted usage history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UsageMonth {
    pub year: i32,
    pub month: u32,
}

impl UsageMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::new(dt.year(), dt.month())
    }
}

impl std::fmt::Display for UsageMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A billing plan and the limits it grants.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingPlan {
    pub id: &'static str,
    pub name: &'static str,
    /// Negative means unlimited
    pub max_events_per_month: i64,
    pub retention_days: i32,
    /// Monthly price in USD
    pub price: f64,
}

/// Static plan catalog.
pub struct BillingPlans;

impl BillingPlans {
    pub const FREE: BillingPlan = BillingPlan {
        id: "free",
        name: "Free",
        max_events_per_month: 3_000,
        retention_days: 3,
        price: 0.0,
    };

    pub const SMALL: BillingPlan = BillingPlan {
        id: "small",
        name: "Small",
        max_events_per_month: 15_000,
        retention_days: 30,
        price: 15.0,
    };

    pub const MEDIUM: BillingPlan = BillingPlan {
        id: "medium",
        name: "Medium",
        max_events_per_month: 75_000,
        retention_days: 90,
        price: 49.0,
    };

    pub const LARGE: BillingPlan = BillingPlan {
        id: "large",
        name: "Large",
        max_events_per_month: 250_000,
        retention_days: 180,
        price: 99.0,
    };

    pub const UNLIMITED: BillingPlan = BillingPlan {
        id: "unlimited",
        name: "Unlimited",
        max_events_per_month: -1,
        retention_days: 365,
        price: 0.0,
    };

    pub fn all() -> [&'static BillingPlan; 5] {
        [
            &Self::FREE,
            &Self::SMALL,
            &Self::MEDIUM,
            &Self::LARGE,
            &Self::UNLIMITED,
        ]
    }

    /// Look up a plan by id (case-insensitive).
    pub fn find(id: &str) -> Option<&'static BillingPlan> {
        Self::all()
            .into_iter()
            .find(|plan| plan.id.eq_ignore_ascii_case(id))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 30, 15).unwrap()
    }

    // ===== UsageWindow Tests =====

    #[test]
    fn test_window_tokens() {
        let now = at(2026, 3, 7, 9);
        assert_eq!(UsageWindow::Hourly.token(now), "030709");
        assert_eq!(UsageWindow::Monthly.token(now), "03");
    }

    #[test]
    fn test_window_tokens_ignore_year() {
        assert_eq!(
            UsageWindow::Monthly.token(at(2025, 11, 2, 0)),
            UsageWindow::Monthly.token(at(2026, 11, 28, 23))
        );
        assert_eq!(
            UsageWindow::Hourly.token(at(2025, 11, 2, 5)),
            UsageWindow::Hourly.token(at(2026, 11, 2, 5))
        );
    }

    #[test]
    fn test_counter_key_format() {
        let now = at(2026, 12, 31, 23);
        assert_eq!(
            UsageWindow::Hourly.counter_key(CounterKind::Total, now, "org1"),
            "usage-total:123123:org1"
        );
        assert_eq!(
            UsageWindow::Monthly.counter_key(CounterKind::Blocked, now, "org1"),
            "usage-blocked:12:org1"
        );
    }

    #[test]
    fn test_overage_keys_differ_per_window() {
        let now = at(2026, 1, 1, 0);
        assert_eq!(UsageWindow::Hourly.overage_key(now, "o"), "usage-overage:010100:o");
        assert_eq!(UsageWindow::Monthly.overage_key(now, "o"), "usage-overage:01:o");
    }

    #[test]
    fn test_window_expiry() {
        assert_eq!(UsageWindow::Hourly.expires_in(), Duration::from_secs(3660));
        assert_eq!(UsageWindow::Monthly.expires_in().as_secs(), 32 * 86_400);
    }

    #[test]
    fn test_window_display() {
        assert_eq!(format!("{}", UsageWindow::Hourly), "hourly");
        assert_eq!(format!("{}", UsageWindow::Monthly), "monthly");
    }

    // ===== UsageMonth Tests =====

    #[test]
    fn test_usage_month_ordering() {
        assert!(UsageMonth::new(2025, 12) < UsageMonth::new(2026, 1));
        assert!(UsageMonth::new(2026, 2) > UsageMonth::new(2026, 1));
    }

    #[test]
    fn test_usage_month_from_datetime_and_display() {
        let month = UsageMonth::from_datetime(at(2026, 4, 15, 8));
        assert_eq!(month, UsageMonth::new(2026, 4));
        assert_eq!(month.to_string(), "2026-04");
    }

    // ===== BillingPlans Tests =====

    #[test]
    fn test_find_plan_case_insensitive() {
        assert_eq!(BillingPlans::find("FREE"), Some(&BillingPlans::FREE));
        assert_eq!(BillingPlans::find("large"), Some(&BillingPlans::LARGE));
        assert!(BillingPlans::find("enterprise").is_none());
    }

    #[test]
    fn test_only_unlimited_plan_is_unbounded() {
        let unbounded: Vec<_> = BillingPlans::all()
            .into_iter()
            .filter(|p| p.max_events_per_month < 0)
            .map(|p| p.id)
            .collect();
        assert_eq!(unbounded, vec!["unlimited"]);
    }
}

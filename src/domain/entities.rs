//! Domain Entities - Core business objects
//!
//! These entities represent the core concepts of the ingestion guard:
//! resolved locations, organizations with their plan limits, and the
//! usage counters tracked per organization.

use crate::domain::value_objects::{BillingPlan, UsageMonth};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic location resolved from an IP address.
///
/// Produced only by a `GeoDatabase` implementation and immutable after that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// Country code (ISO 3166-1 alpha-2)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// First level subdivision (state, province)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level1: Option<String>,
    /// Second level subdivision (county)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level2: Option<String>,
    /// City name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
}

impl GeoLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            country: None,
            level1: None,
            level2: None,
            locality: None,
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_locality(mut self, locality: impl Into<String>) -> Self {
        self.locality = Some(locality.into());
        self
    }
}

/// Counter values for one organization in the current hourly and monthly windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub hourly_total: i64,
    pub monthly_total: i64,
    pub hourly_blocked: i64,
    pub monthly_blocked: i64,
}

/// Persisted usage for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInfo {
    pub date: UsageMonth,
    /// Plan limit in effect when the usage was recorded
    pub limit: i64,
    pub total: i64,
    pub blocked: i64,
}

/// An organization (tenant) and the quota context needed to meter it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    /// Assigned by the repository on add
    pub id: Option<String>,
    pub name: String,
    pub plan_id: String,
    /// Maximum accepted events per month; negative means unlimited
    pub max_events_per_month: i64,
    /// Days to keep events; zero disables retention cleanup
    pub retention_days: i32,
    /// Usage history, one entry per month, oldest first
    #[serde(default)]
    pub usage: Vec<UsageInfo>,
}

impl Organization {
    /// Create an organization on the given plan.
    pub fn new(name: impl Into<String>, plan: &BillingPlan) -> Self {
        let mut org = Self {
            id: None,
            name: name.into(),
            plan_id: String::new(),
            max_events_per_month: 0,
            retention_days: 0,
            usage: Vec::new(),
        };
        org.apply_plan(plan);
        org
    }

    /// Copy the plan limits onto the organization.
    pub fn apply_plan(&mut self, plan: &BillingPlan) {
        self.plan_id = plan.id.to_string();
        self.max_events_per_month = plan.max_events_per_month;
        self.retention_days = plan.retention_days;
    }

    pub fn has_event_limit(&self) -> bool {
        self.max_events_per_month >= 0
    }

    /// Insert or replace the usage entry for `info.date`.
    ///
    /// Keeps at most twelve months of history.
    pub fn set_usage(&mut self, info: UsageInfo) {
        match self.usage.iter_mut().find(|u| u.date == info.date) {
            Some(existing) => *existing = info,
            None => {
                self.usage.push(info);
                self.usage.sort_by_key(|u| u.date);
            }
        }

        let excess = self.usage.len().saturating_sub(12);
        if excess > 0 {
            self.usage.drain(..excess);
        }
    }
}

/// Published when an organization goes over its hourly or monthly allowance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOverage {
    pub organization_id: String,
    pub is_hourly: bool,
    pub date: DateTime<Utc>,
    pub hourly_total: i64,
    pub monthly_total: i64,
    pub hourly_blocked: i64,
    pub monthly_blocked: i64,
}

impl PlanOverage {
    pub const TOPIC: &'static str = "plan-overage";
}

/// Paging request for repository queries (pages are 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingOptions {
    pub page: usize,
    pub limit: usize,
}

impl PagingOptions {
    pub const DEFAULT_LIMIT: usize = 10;

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    /// Number of documents to skip.
    pub fn skip(&self) -> usize {
        (self.page.max(1) - 1) * self.limit
    }
}

impl Default for PagingOptions {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// One page of query results plus the total number of matches.
#[derive(Debug, Clone, PartialEq)]
pub struct FindResults<T> {
    pub documents: Vec<T>,
    pub total: usize,
}

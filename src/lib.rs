//! ingest-guard Library
//!
//! IP geolocation and per-organization usage metering for an event
//! ingestion pipeline. Exposed as a library for the binary and for
//! integration tests.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;

// Re-export commonly used types
pub use application::{GeoDatabaseStore, GeoError, GeoIpResolver, QuotaEnforcer, QuotaError, UsageCounter};
pub use config::load_config;
pub use domain::entities::{GeoLocation, Organization, PlanOverage, UsageInfo, UsageSnapshot};
pub use domain::ports::{Clock, CounterStore, FileStorage, MessagePublisher, OrganizationRepository};
pub use domain::services::QuotaPolicy;
pub use domain::value_objects::{BillingPlans, UsageWindow};

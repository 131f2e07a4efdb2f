//! Application Layer
//!
//! Use cases built on the domain ports: GeoIP database provisioning and
//! resolution, usage counting, and quota enforcement.

mod errors;
mod geo_database_store;
mod geo_ip_resolver;
mod quota_enforcer;
mod usage_counter;

pub use errors::{GeoError, QuotaError};
pub use geo_database_store::GeoDatabaseStore;
pub use geo_ip_resolver::{GeoIpResolver, DEFAULT_CACHE_CAPACITY};
pub use quota_enforcer::{QuotaEnforcer, USAGE_SAVE_INTERVAL};
pub use usage_counter::{UsageCounter, UsageTotals};

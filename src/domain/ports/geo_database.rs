//! GeoIP Database Port
//!
//! Defines the interface for a loaded IP-to-location database.

use crate::domain::entities::GeoLocation;
use std::net::IpAddr;
use std::sync::Arc;

/// An IP geolocation database held in memory.
///
/// This is an outbound port that abstracts the database format.
/// Implementations may use MaxMind GeoLite2, IP2Location, or other databases.
/// Lookups are read-only, so one instance is shared by all callers.
pub trait GeoDatabase: Send + Sync {
    /// Find the network containing `ip`.
    ///
    /// Returns None when no network block contains the address.
    fn lookup(&self, ip: IpAddr) -> Option<GeoLocation>;
}

/// Parses raw database bytes into a [`GeoDatabase`].
pub type DatabaseOpener =
    Arc<dyn Fn(Vec<u8>) -> anyhow::Result<Arc<dyn GeoDatabase>> + Send + Sync>;

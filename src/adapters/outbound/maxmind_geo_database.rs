//! MaxMind GeoIP Database
//!
//! Implements GeoDatabase using a MaxMind GeoLite2-City database.

use crate::domain::entities::GeoLocation;
use crate::domain::ports::{DatabaseOpener, GeoDatabase};
use maxminddb::{MaxMindDBError, Reader};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Names {
    #[serde(default)]
    names: BTreeMap<String, String>,
}

impl Names {
    fn english(self) -> Option<String> {
        let mut names = self.names;
        names.remove("en")
    }
}

#[derive(Debug, Deserialize)]
struct Country {
    iso_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Subdivision {
    iso_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Location {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CityResp {
    city: Option<Names>,
    country: Option<Country>,
    location: Option<Location>,
    #[serde(default)]
    subdivisions: Vec<Subdivision>,
}

/// MaxMind GeoIP database.
///
/// Holds the whole database in memory and answers lookups from it.
pub struct MaxMindGeoDatabase {
    reader: Arc<Reader<Vec<u8>>>,
}

impl MaxMindGeoDatabase {
    /// Parse a database from raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> anyhow::Result<Self> {
        let reader = Reader::from_source(bytes)?;
        tracing::debug!(
            "GeoIP database parsed type={} build_epoch={}",
            reader.metadata.database_type,
            reader.metadata.build_epoch
        );
        Ok(Self {
            reader: Arc::new(reader),
        })
    }

    /// Load a database from a file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let reader = Reader::open_readfile(path)?;
        Ok(Self {
            reader: Arc::new(reader),
        })
    }

    /// Opener that parses bytes as a MaxMind database.
    pub fn opener() -> DatabaseOpener {
        Arc::new(|bytes: Vec<u8>| -> anyhow::Result<Arc<dyn GeoDatabase>> {
            Ok(Arc::new(Self::from_bytes(bytes)?))
        })
    }

    /// Database type recorded in the metadata (e.g. "GeoLite2-City").
    pub fn database_type(&self) -> &str {
        &self.reader.metadata.database_type
    }
}

impl GeoDatabase for MaxMindGeoDatabase {
    fn lookup(&self, ip: IpAddr) -> Option<GeoLocation> {
        let resp: CityResp = match self.reader.lookup(ip) {
            Ok(resp) => resp,
            Err(MaxMindDBError::AddressNotFoundError(_)) => return None,
            Err(e) => {
                tracing::warn!("GeoIP lookup failed for {}: {}", ip, e);
                return None;
            }
        };

        let location = resp.location?;
        let mut geo = GeoLocation::new(location.latitude?, location.longitude?);
        geo.country = resp.country.and_then(|c| c.iso_code);

        let mut subdivisions = resp.subdivisions.into_iter();
        geo.level1 = subdivisions.next().and_then(|s| s.iso_code);
        geo.level2 = subdivisions.next().and_then(|s| s.iso_code);
        geo.locality = resp.city.and_then(Names::english);

        Some(geo)
    }
}

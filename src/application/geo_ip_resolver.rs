//! GeoIP Resolver
//!
//! Resolves IP addresses to locations. The database is loaded from file
//! storage on the first resolvable query (exactly once, even under
//! concurrent callers) and every answer is cached per address.

use crate::application::GeoError;
use crate::domain::entities::GeoLocation;
use crate::domain::ports::{DatabaseOpener, FileStorage, GeoDatabase, StorageError};
use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Default number of addresses kept in the lookup cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// IP geolocation resolver with a process-lifetime cache.
pub struct GeoIpResolver {
    storage: Arc<dyn FileStorage>,
    path: String,
    opener: DatabaseOpener,
    database: OnceCell<Arc<dyn GeoDatabase>>,
    /// Negative answers are cached too
    cache: DashMap<IpAddr, Option<GeoLocation>>,
    /// Reserved cache slots; never below `cache.len()`
    cache_slots: AtomicUsize,
    cache_capacity: usize,
}

impl GeoIpResolver {
    /// Create a resolver reading the database at `path` in `storage`.
    /// `opener` parses the file contents into a queryable database.
    pub fn new(storage: Arc<dyn FileStorage>, path: impl Into<String>, opener: DatabaseOpener) -> Self {
        Self {
            storage,
            path: path.into(),
            opener,
            database: OnceCell::new(),
            cache: DashMap::new(),
            cache_slots: AtomicUsize::new(0),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Limit the number of cached addresses. Once full, new answers are
    /// returned but not cached.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Resolve an IP address to a location.
    ///
    /// Returns `Ok(None)` for missing, invalid, loopback, and private
    /// addresses, and for addresses the database does not contain.
    /// Returns an error only when the database cannot be loaded.
    pub async fn resolve_ip(&self, ip: Option<&str>) -> Result<Option<GeoLocation>, GeoError> {
        let Some(addr) = ip.and_then(Self::parse_resolvable) else {
            return Ok(None);
        };

        if let Some(cached) = self.cache.get(&addr) {
            return Ok(cached.value().clone());
        }

        let database = self.database().await?;
        let location = database.lookup(addr);

        self.cache_answer(addr, location.clone());

        tracing::debug!("resolved {} -> {:?}", addr, location);
        Ok(location)
    }

    /// Parse `ip` and apply the exclusion rules.
    ///
    /// IPv4-mapped IPv6 addresses are unmapped first, so `::ffff:10.0.0.1`
    /// is excluded like `10.0.0.1`.
    pub fn parse_resolvable(ip: &str) -> Option<IpAddr> {
        let ip = ip.trim();
        if ip.is_empty() {
            return None;
        }

        let addr = match ip.parse::<IpAddr>().ok()? {
            IpAddr::V6(v6) => v6
                .to_ipv4_mapped()
                .map(IpAddr::V4)
                .unwrap_or(IpAddr::V6(v6)),
            v4 => v4,
        };

        if Self::is_excluded(addr) {
            return None;
        }
        Some(addr)
    }

    /// Loopback and private networks never have a location.
    pub fn is_excluded(addr: IpAddr) -> bool {
        match addr {
            // 127.0.0.0/8, 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16
            IpAddr::V4(v4) => v4.is_loopback() || v4.is_private(),
            IpAddr::V6(v6) => v6.is_loopback(),
        }
    }

    /// Whether the database has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.database.initialized()
    }

    /// Number of cached addresses.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop all cached answers. The loaded database is kept.
    pub fn clear_cache(&self) {
        self.cache.retain(|_, _| {
            self.cache_slots.fetch_sub(1, Ordering::AcqRel);
            false
        });
    }

    /// Cache an answer if a slot is free.
    fn cache_answer(&self, addr: IpAddr, location: Option<GeoLocation>) {
        let reserved = self
            .cache_slots
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.cache_capacity).then_some(used + 1)
            })
            .is_ok();
        if !reserved {
            return;
        }

        // A concurrent miss on the same address already holds a slot
        if self.cache.insert(addr, location).is_some() {
            self.cache_slots.fetch_sub(1, Ordering::AcqRel);
        }
    }

    async fn database(&self) -> Result<&Arc<dyn GeoDatabase>, GeoError> {
        self.database
            .get_or_try_init(|| async {
                tracing::info!("loading GeoIP database from {}", self.path);

                let bytes = match self.storage.read(&self.path).await {
                    Ok(bytes) => bytes,
                    Err(StorageError::NotFound(_)) => {
                        return Err(GeoError::DatabaseMissing(self.path.clone()));
                    }
                    Err(e) => return Err(e.into()),
                };
                let size = bytes.len();

                // Parsing walks the whole file; keep it off the async workers.
                let opener = self.opener.clone();
                let database = tokio::task::spawn_blocking(move || opener(bytes))
                    .await
                    .map_err(|e| GeoError::InvalidDatabase(e.to_string()))?
                    .map_err(|e| GeoError::InvalidDatabase(format!("{:#}", e)))?;

                tracing::info!("GeoIP database loaded ({} bytes)", size);
                Ok(database)
            })
            .await
    }
}

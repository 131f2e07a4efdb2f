use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Root directory of the file storage
    pub data_dir: String,
    pub debug: bool,

    // GeoIP settings
    pub geoip_path: String,
    pub geoip_url: Option<String>,
    pub geoip_download_timeout_secs: u64,
    pub geoip_max_download_bytes: usize,
    pub geoip_cache_capacity: usize,

    // Usage counter settings
    pub counter_gc_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            debug: false,
            geoip_path: "GeoLite2-City.mmdb".to_string(),
            geoip_url: None,
            geoip_download_timeout_secs: 300,
            geoip_max_download_bytes: 256 * 1024 * 1024,
            geoip_cache_capacity: 10_000,
            counter_gc_interval_secs: 60,
        }
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    let defaults = Config::default();

    let data_dir = std::env::var("INGEST_GUARD_DATA_DIR").unwrap_or(defaults.data_dir);

    let geoip_path = std::env::var("INGEST_GUARD_GEOIP_PATH").unwrap_or(defaults.geoip_path);

    let geoip_url = std::env::var("INGEST_GUARD_GEOIP_URL")
        .ok()
        .filter(|v| !v.trim().is_empty());

    let geoip_download_timeout_secs = std::env::var("INGEST_GUARD_GEOIP_DOWNLOAD_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.geoip_download_timeout_secs);

    let geoip_max_download_bytes = std::env::var("INGEST_GUARD_GEOIP_MAX_DOWNLOAD_BYTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.geoip_max_download_bytes);

    let geoip_cache_capacity = std::env::var("INGEST_GUARD_GEOIP_CACHE_CAPACITY")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.geoip_cache_capacity);

    let counter_gc_interval_secs = std::env::var("INGEST_GUARD_COUNTER_GC_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|secs: &u64| *secs > 0)
        .unwrap_or(defaults.counter_gc_interval_secs);

    let debug = std::env::var("DEBUG").is_ok();

    Ok(Config {
        data_dir,
        debug,
        geoip_path,
        geoip_url,
        geoip_download_timeout_secs,
        geoip_max_download_bytes,
        geoip_cache_capacity,
        counter_gc_interval_secs,
    })
}

//! Integration tests for the GeoIP resolver
//!
//! Uses a table-backed database for the address rules and, when
//! `INGEST_GUARD_TEST_GEOIP_PATH` points at a GeoLite2-City file, the real
//! MaxMind database.

use ingest_guard::adapters::outbound::{FolderFileStorage, InMemoryFileStorage, MaxMindGeoDatabase};
use ingest_guard::domain::ports::{DatabaseOpener, GeoDatabase};
use ingest_guard::{FileStorage, GeoError, GeoIpResolver, GeoLocation};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const DB_PATH: &str = "GeoLite2-City.mmdb";

const EXCLUDED: &[&str] = &[
    "::1",
    "127.0.0.1",
    "10.0.0.0",
    "172.16.0.0",
    "172.31.255.255",
    "192.168.0.0",
];

struct TableDatabase {
    rows: HashMap<IpAddr, GeoLocation>,
}

impl GeoDatabase for TableDatabase {
    fn lookup(&self, ip: IpAddr) -> Option<GeoLocation> {
        self.rows.get(&ip).cloned()
    }
}

fn table_opener(opens: Arc<AtomicUsize>) -> DatabaseOpener {
    Arc::new(move |_bytes: Vec<u8>| -> anyhow::Result<Arc<dyn GeoDatabase>> {
        opens.fetch_add(1, Ordering::SeqCst);
        // Simulate parsing a large file
        std::thread::sleep(Duration::from_millis(20));
        let mut rows = HashMap::new();
        rows.insert(
            "8.8.4.4".parse().unwrap(),
            GeoLocation::new(37.751, -97.822).with_country("US"),
        );
        rows.insert(
            "2001:4860:4860::8844".parse().unwrap(),
            GeoLocation::new(37.751, -97.822).with_country("US"),
        );
        Ok(Arc::new(TableDatabase { rows }))
    })
}

async fn table_resolver() -> (GeoIpResolver, Arc<AtomicUsize>) {
    let storage = Arc::new(InMemoryFileStorage::new());
    storage.write(DB_PATH, b"table").await.unwrap();
    let opens = Arc::new(AtomicUsize::new(0));
    let resolver = GeoIpResolver::new(storage, DB_PATH, table_opener(opens.clone()));
    (resolver, opens)
}

/// Resolver over the real database, when one is configured
async fn real_resolver() -> Option<GeoIpResolver> {
    let path = std::path::PathBuf::from(std::env::var("INGEST_GUARD_TEST_GEOIP_PATH").ok()?);
    let dir = path.parent()?.to_path_buf();
    let file = path.file_name()?.to_str()?.to_string();
    Some(GeoIpResolver::new(
        Arc::new(FolderFileStorage::new(dir)),
        file,
        MaxMindGeoDatabase::opener(),
    ))
}

#[tokio::test]
async fn test_excluded_addresses_never_load_database() {
    // No database in storage: any load attempt would be an error
    let resolver = GeoIpResolver::new(
        Arc::new(InMemoryFileStorage::new()),
        DB_PATH,
        MaxMindGeoDatabase::opener(),
    );

    assert!(resolver.resolve_ip(None).await.unwrap().is_none());
    assert!(resolver.resolve_ip(Some("")).await.unwrap().is_none());
    for ip in EXCLUDED {
        assert!(resolver.resolve_ip(Some(*ip)).await.unwrap().is_none(), "{}", ip);
    }
    assert!(!resolver.is_loaded());
}

#[tokio::test]
async fn test_public_address_without_database_is_an_error() {
    let resolver = GeoIpResolver::new(
        Arc::new(InMemoryFileStorage::new()),
        DB_PATH,
        MaxMindGeoDatabase::opener(),
    );

    let err = resolver.resolve_ip(Some("8.8.4.4")).await.unwrap_err();
    assert!(matches!(err, GeoError::DatabaseMissing(_)));
}

#[tokio::test]
async fn test_public_addresses_resolve() {
    let (resolver, _) = table_resolver().await;

    let v4 = resolver.resolve_ip(Some("8.8.4.4")).await.unwrap().unwrap();
    let v6 = resolver
        .resolve_ip(Some("2001:4860:4860::8844"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(v4.country.as_deref(), Some("US"));
    assert_eq!(v6.country.as_deref(), Some("US"));
    assert!(resolver.resolve_ip(Some("1.1.1.1")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_warm_lookups_are_fast_and_stable() {
    let (resolver, opens) = table_resolver().await;
    let first = resolver.resolve_ip(Some("8.8.4.4")).await.unwrap();

    let started = Instant::now();
    for _ in 0..1000 {
        assert_eq!(resolver.resolve_ip(Some("8.8.4.4")).await.unwrap(), first);
    }

    assert!(started.elapsed() < Duration::from_millis(100));
    assert_eq!(opens.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_lookups_load_once() {
    let (resolver, opens) = table_resolver().await;
    let resolver = Arc::new(resolver);

    let handles = (0..32).map(|_| {
        let r = resolver.clone();
        tokio::spawn(async move { r.resolve_ip(Some("8.8.4.4")).await })
    });
    let results = futures::future::join_all(handles).await;

    for result in results {
        assert!(result.unwrap().unwrap().is_some());
    }
    assert_eq!(opens.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_real_database_resolves_public_addresses() {
    let Some(resolver) = real_resolver().await else {
        return;
    };

    for ip in EXCLUDED {
        assert!(resolver.resolve_ip(Some(*ip)).await.unwrap().is_none());
    }

    let v4 = resolver.resolve_ip(Some("8.8.4.4")).await.unwrap();
    let v6 = resolver.resolve_ip(Some("2001:4860:4860::8844")).await.unwrap();
    assert!(v4.is_some());
    assert!(v6.is_some());

    let started = Instant::now();
    for _ in 0..1000 {
        assert_eq!(resolver.resolve_ip(Some("8.8.4.4")).await.unwrap(), v4);
    }
    assert!(started.elapsed() < Duration::from_millis(100));
}

//! ingest-guard - GeoIP resolution and usage metering
//!
//! This is the composition root that wires together all the components.
//!
//! Usage:
//!   ingest-guard resolve <ip>...
//!   ingest-guard meter <plan> <batch>...

use anyhow::Context;
use ingest_guard::adapters::outbound::{
    BroadcastMessageBus, DashMapCounterStore, DashMapOrganizationRepository, FolderFileStorage,
    MaxMindDownloadJob, MaxMindGeoDatabase, SystemClock,
};
use ingest_guard::config::{load_config, Config};
use ingest_guard::{
    BillingPlans, GeoDatabaseStore, GeoIpResolver, Organization, OrganizationRepository,
    PlanOverage, QuotaEnforcer,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.split_first() {
        Some((cmd, rest)) if cmd == "resolve" => resolve(&cfg, rest).await,
        Some((cmd, rest)) if cmd == "meter" => meter(&cfg, rest).await,
        _ => {
            eprintln!("usage: ingest-guard resolve <ip>... | meter <plan> <batch>...");
            std::process::exit(2);
        }
    }
}

async fn resolve(cfg: &Config, ips: &[String]) -> anyhow::Result<()> {
    tracing::info!(
        "starting ingest-guard data_dir={} geoip_path={}",
        cfg.data_dir,
        cfg.geoip_path
    );

    // ===== COMPOSITION ROOT =====

    let storage = Arc::new(FolderFileStorage::new(&cfg.data_dir));

    // Download the database first when a source is configured
    if let Some(url) = &cfg.geoip_url {
        let job = Arc::new(
            MaxMindDownloadJob::new(storage.clone(), url.clone(), cfg.geoip_path.clone())
                .max_bytes(cfg.geoip_max_download_bytes),
        );
        GeoDatabaseStore::new(storage.clone(), job, cfg.geoip_path.clone())
            .with_download_timeout(Duration::from_secs(cfg.geoip_download_timeout_secs))
            .ensure()
            .await
            .context("failed to provision the GeoIP database")?;
    }

    let resolver = GeoIpResolver::new(storage, cfg.geoip_path.clone(), MaxMindGeoDatabase::opener())
        .with_cache_capacity(cfg.geoip_cache_capacity);

    for ip in ips {
        let location = resolver.resolve_ip(Some(ip.as_str())).await?;
        let line = serde_json::json!({ "ip": ip, "location": location });
        println!("{}", line);
    }

    Ok(())
}

async fn meter(cfg: &Config, args: &[String]) -> anyhow::Result<()> {
    let Some((plan_id, batches)) = args.split_first() else {
        anyhow::bail!("meter needs a plan id");
    };
    let plan = BillingPlans::find(plan_id)
        .with_context(|| format!("unknown plan {}", plan_id))?;

    let organizations = Arc::new(DashMapOrganizationRepository::new());
    let store = Arc::new(DashMapCounterStore::new());
    store.start_gc(Duration::from_secs(cfg.counter_gc_interval_secs));
    let bus = Arc::new(BroadcastMessageBus::new());
    let mut overages = bus.subscribe(PlanOverage::TOPIC);

    let enforcer = QuotaEnforcer::new(organizations.clone(), store, bus, Arc::new(SystemClock));

    let organization = organizations
        .add(Organization::new("cli", plan))
        .await?;
    let id = organization.id.context("repository did not assign an id")?;

    for batch in batches {
        let count: u32 = batch
            .parse()
            .with_context(|| format!("invalid batch size {}", batch))?;
        let blocked = enforcer.record_usage(&id, count).await?;
        let usage = enforcer.counter().current(&id).await?;
        let line = serde_json::json!({ "count": count, "blocked": blocked, "usage": usage });
        println!("{}", line);

        while let Ok(message) = overages.try_recv() {
            println!("{}", serde_json::json!({ "overage": message }));
        }
    }

    Ok(())
}

mod broadcast_message_bus;
mod clocks;
mod dashmap_counter_store;
mod dashmap_organization_repo;
mod folder_file_storage;
mod in_memory_file_storage;
mod maxmind_download_job;
mod maxmind_geo_database;

pub use broadcast_message_bus::BroadcastMessageBus;
pub use clocks::{ManualClock, SystemClock};
pub use dashmap_counter_store::DashMapCounterStore;
pub use dashmap_organization_repo::DashMapOrganizationRepository;
pub use folder_file_storage::FolderFileStorage;
pub use in_memory_file_storage::InMemoryFileStorage;
pub use maxmind_download_job::{MaxMindDownloadJob, DEFAULT_MAX_DOWNLOAD_BYTES};
pub use maxmind_geo_database::MaxMindGeoDatabase;

mod clock;
mod counter_store;
mod download_job;
mod file_storage;
mod geo_database;
mod message_publisher;
mod organization_repository;

pub use clock::Clock;
pub use counter_store::{CounterStore, CounterStoreError};
pub use download_job::{DownloadJob, JobResult};
pub use file_storage::{FileStorage, StorageError};
pub use geo_database::{DatabaseOpener, GeoDatabase};
pub use message_publisher::{MessagePublisher, PublishError};
pub use organization_repository::{OrganizationRepository, RepositoryError};

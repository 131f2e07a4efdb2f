//! Application Errors

use crate::domain::ports::{CounterStoreError, PublishError, RepositoryError, StorageError};
use std::time::Duration;

/// Errors from the GeoIP components.
///
/// An address that cannot be resolved is not an error; these variants mean
/// the resolver itself is not usable.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("GeoIP database download failed: {0}")]
    DownloadFailed(String),
    #[error("GeoIP database download timed out after {0:?}")]
    DownloadTimedOut(Duration),
    #[error("GeoIP database not found at {0}")]
    DatabaseMissing(String),
    #[error("invalid GeoIP database: {0}")]
    InvalidDatabase(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from usage metering.
#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    #[error(transparent)]
    Store(#[from] CounterStoreError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

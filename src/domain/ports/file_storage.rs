//! File Storage Port
//!
//! Defines the interface for the blob storage holding the GeoIP database.

use async_trait::async_trait;

/// Errors raised by file storage implementations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Blob storage addressed by relative paths.
///
/// Implementations may use a local folder, object storage, or memory.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Check whether a file exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Read the whole file at `path`.
    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Create or replace the file at `path`.
    async fn write(&self, path: &str, contents: &[u8]) -> Result<(), StorageError>;
}

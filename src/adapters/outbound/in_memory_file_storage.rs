//! In-Memory File Storage
//!
//! Implements FileStorage with a DashMap. Used by tests and single-process setups.

use crate::domain::ports::{FileStorage, StorageError};
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Default)]
pub struct InMemoryFileStorage {
    files: DashMap<String, Vec<u8>>,
}

impl InMemoryFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[async_trait]
impl FileStorage for InMemoryFileStorage {
    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.files.contains_key(path))
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.files
            .get(path)
            .map(|e| e.value().clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn write(&self, path: &str, contents: &[u8]) -> Result<(), StorageError> {
        self.files.insert(path.to_string(), contents.to_vec());
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let storage = InMemoryFileStorage::new();
        assert!(storage.is_empty());

        storage.write("a.mmdb", b"123").await.unwrap();

        assert!(storage.exists("a.mmdb").await.unwrap());
        assert_eq!(storage.read("a.mmdb").await.unwrap(), b"123");
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_read_missing() {
        let storage = InMemoryFileStorage::new();
        assert!(!storage.exists("a.mmdb").await.unwrap());
        assert!(matches!(
            storage.read("a.mmdb").await,
            Err(StorageError::NotFound(_))
        ));
    }
}

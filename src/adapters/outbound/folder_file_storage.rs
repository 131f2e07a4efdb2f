//! Folder File Storage
//!
//! Implements FileStorage on a local directory using tokio::fs.

use crate::domain::ports::{FileStorage, StorageError};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// File storage rooted at a local folder.
///
/// Paths are resolved relative to the root; absolute paths and `..`
/// components are rejected so callers cannot escape the folder.
pub struct FolderFileStorage {
    root: PathBuf,
}

impl FolderFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStorage for FolderFileStorage {
    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let full = match self.resolve(path) {
            Ok(full) => full,
            Err(_) => return Ok(false),
        };
        Ok(tokio::fs::try_exists(&full).await?)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, path: &str, contents: &[u8]) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write to a sibling temp file first so readers never see a partial file.
        let tmp = full.with_extension("tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &full).await?;

        tracing::debug!("wrote {} bytes to {}", contents.len(), full.display());
        Ok(())
    }
}

//! GeoIP Database Store
//!
//! Makes sure the GeoIP database is present in file storage, downloading it
//! on demand.

use crate::application::GeoError;
use crate::domain::ports::{DownloadJob, FileStorage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Provisions the GeoIP database file.
pub struct GeoDatabaseStore {
    storage: Arc<dyn FileStorage>,
    job: Arc<dyn DownloadJob>,
    path: String,
    download_timeout: Duration,
    /// Serializes downloads so concurrent callers never fetch twice
    download_lock: Mutex<()>,
}

impl GeoDatabaseStore {
    pub fn new(storage: Arc<dyn FileStorage>, job: Arc<dyn DownloadJob>, path: impl Into<String>) -> Self {
        Self {
            storage,
            job,
            path: path.into(),
            download_timeout: Duration::from_secs(300),
            download_lock: Mutex::new(()),
        }
    }

    /// Set how long a download may take before it is abandoned.
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Storage path of the database.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Ensure the database exists, downloading it if missing.
    ///
    /// A no-op when the file is already present.
    pub async fn ensure(&self) -> Result<(), GeoError> {
        if self.storage.exists(&self.path).await? {
            return Ok(());
        }

        let _guard = self.download_lock.lock().await;

        // Another caller may have finished the download while we waited.
        if self.storage.exists(&self.path).await? {
            return Ok(());
        }

        tracing::info!("GeoIP database missing at {}, starting download", self.path);

        let result = match tokio::time::timeout(self.download_timeout, self.job.run()).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::error!("GeoIP download job failed: {:#}", e);
                return Err(GeoError::DownloadFailed(format!("{:#}", e)));
            }
            Err(_) => {
                tracing::error!("GeoIP download timed out after {:?}", self.download_timeout);
                return Err(GeoError::DownloadTimedOut(self.download_timeout));
            }
        };

        if !result.is_success {
            let reason = result
                .message
                .unwrap_or_else(|| "download job reported failure".to_string());
            return Err(GeoError::DownloadFailed(reason));
        }

        if !self.storage.exists(&self.path).await? {
            return Err(GeoError::DownloadFailed(format!(
                "download job succeeded but {} is still missing",
                self.path
            )));
        }

        tracing::info!("GeoIP database ready at {}", self.path);
        Ok(())
    }
}

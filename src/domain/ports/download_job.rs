//! Download Job Port
//!
//! A job that fetches the GeoIP database and stores it.

use async_trait::async_trait;

/// Outcome reported by a job run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub is_success: bool,
    pub message: Option<String>,
}

impl JobResult {
    pub fn success() -> Self {
        Self {
            is_success: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            message: Some(message.into()),
        }
    }
}

/// Job invoked when the GeoIP database is missing from storage.
#[async_trait]
pub trait DownloadJob: Send + Sync {
    async fn run(&self) -> anyhow::Result<JobResult>;
}

//! MaxMind Download Job
//!
//! Implements DownloadJob by fetching the GeoLite2 database over HTTP and
//! writing it to file storage. Handles both raw `.mmdb` and gzip payloads.

use crate::domain::ports::{DownloadJob, FileStorage, JobResult};
use anyhow::Context;
use async_trait::async_trait;
use flate2::read::GzDecoder;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

/// Default upper bound for the decompressed database size.
pub const DEFAULT_MAX_DOWNLOAD_BYTES: usize = 256 * 1024 * 1024;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Downloads the GeoIP database into storage.
pub struct MaxMindDownloadJob {
    storage: Arc<dyn FileStorage>,
    url: String,
    path: String,
    max_bytes: usize,
    request_timeout: Duration,
}

impl MaxMindDownloadJob {
    pub fn new(storage: Arc<dyn FileStorage>, url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            storage,
            url: url.into(),
            path: path.into(),
            max_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
            request_timeout: Duration::from_secs(300),
        }
    }

    /// Set the maximum accepted database size.
    pub fn max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Set the HTTP request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    async fn fetch(&self) -> anyhow::Result<Result<Vec<u8>, String>> {
        let client = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()?;

        let response = client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("failed to request {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(Err(format!("download failed with status {}", status)));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes as u64 {
                return Ok(Err(format!(
                    "database too large: {} bytes (max: {} bytes)",
                    len, self.max_bytes
                )));
            }
        }

        let body = response.bytes().await.context("failed to read response body")?;
        if body.is_empty() {
            return Ok(Err("downloaded database is empty".to_string()));
        }

        let db = if body.starts_with(&GZIP_MAGIC) {
            let max_bytes = self.max_bytes;
            tokio::task::spawn_blocking(move || gunzip(&body, max_bytes))
                .await
                .context("GeoIP decompression task failed")??
        } else {
            body.to_vec()
        };

        if db.len() > self.max_bytes {
            return Ok(Err(format!(
                "database too large: more than {} bytes",
                self.max_bytes
            )));
        }

        Ok(Ok(db))
    }
}

/// Decompress a gzip payload, reading at most `max_bytes + 1` bytes so an
/// oversized stream is detected without inflating it fully.
fn gunzip(bytes: &[u8], max_bytes: usize) -> anyhow::Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .take(max_bytes as u64 + 1)
        .read_to_end(&mut out)
        .context("failed to decompress GeoIP database")?;
    Ok(out)
}

#[async_trait]
impl DownloadJob for MaxMindDownloadJob {
    async fn run(&self) -> anyhow::Result<JobResult> {
        tracing::info!("downloading GeoIP database from {}", self.url);

        let db = match self.fetch().await? {
            Ok(db) => db,
            Err(reason) => {
                tracing::error!("GeoIP database download failed: {}", reason);
                return Ok(JobResult::failed(reason));
            }
        };

        self.storage
            .write(&self.path, &db)
            .await
            .with_context(|| format!("failed to store GeoIP database at {}", self.path))?;

        tracing::info!("GeoIP database saved to {} ({} bytes)", self.path, db.len());
        Ok(JobResult::success())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_gunzip_round_trip() {
        let compressed = gzip(b"mmdb payload");
        assert!(compressed.starts_with(&GZIP_MAGIC));
        assert_eq!(gunzip(&compressed, 1024).unwrap(), b"mmdb payload");
    }

    #[test]
    fn test_gunzip_stops_past_limit() {
        let compressed = gzip(&vec![7u8; 4096]);
        let out = gunzip(&compressed, 100).unwrap();
        assert_eq!(out.len(), 101);
    }

    #[test]
    fn test_gunzip_rejects_corrupt_stream() {
        let mut compressed = gzip(b"mmdb payload");
        let len = compressed.len();
        compressed.truncate(len / 2);
        assert!(gunzip(&compressed, 1024).is_err());
    }

    async fn gzip_job(body: Vec<u8>, max_bytes: usize) -> (wiremock::MockServer, MaxMindDownloadJob) {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&server)
            .await;
        let storage = Arc::new(crate::adapters::outbound::InMemoryFileStorage::new());
        let job = MaxMindDownloadJob::new(storage, format!("{}/db.mmdb.gz", server.uri()), "db.mmdb")
            .max_bytes(max_bytes);
        (server, job)
    }

    #[tokio::test]
    async fn test_fetch_decompresses_off_the_runtime() {
        let (_server, job) = gzip_job(gzip(b"mmdb payload"), 1024).await;
        assert_eq!(job.fetch().await.unwrap().unwrap(), b"mmdb payload");
    }

    #[tokio::test]
    async fn test_fetch_surfaces_decompression_errors() {
        let mut compressed = gzip(b"mmdb payload");
        let len = compressed.len();
        compressed.truncate(len / 2);
        let (_server, job) = gzip_job(compressed, 1024).await;

        let err = job.fetch().await.unwrap_err();
        assert!(err.to_string().contains("decompress"));
    }
}

//! Recording download
//!
//! `RecordingFetcher` is the seam between the scheduler and the network.
//! `HttpRecordingFetcher` performs a plain GET with a bounded timeout and
//! refuses bodies larger than the configured cap.

use std::time::Duration;

use crate::error::AcousticError;
use crate::models::Recording;

const USER_AGENT: &str = concat!("singbirds/", env!("CARGO_PKG_VERSION"));

/// Default per-download timeout
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Default cap on a single recording's size
pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Source of raw recording bytes
#[async_trait::async_trait]
pub trait RecordingFetcher: Send + Sync {
    /// Download the complete file behind `recording.recording_url`
    ///
    /// # Errors
    /// `AcousticError::Download` on network failure, non-success status,
    /// timeout or an oversized body.
    async fn fetch(&self, recording: &Recording) -> Result<Vec<u8>, AcousticError>;
}

/// reqwest-backed fetcher
pub struct HttpRecordingFetcher {
    http_client: reqwest::Client,
    max_bytes: u64,
}

impl HttpRecordingFetcher {
    /// Create fetcher with explicit limits
    pub fn new(timeout: Duration, max_bytes: u64) -> Result<Self, AcousticError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AcousticError::Download(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            max_bytes,
        })
    }

    /// Create fetcher with default limits (10 s, 50 MiB)
    pub fn with_defaults() -> Result<Self, AcousticError> {
        Self::new(DEFAULT_DOWNLOAD_TIMEOUT, DEFAULT_MAX_DOWNLOAD_BYTES)
    }

    fn too_large(&self, size: u64) -> AcousticError {
        AcousticError::Download(format!(
            "Recording exceeds size cap ({} > {} bytes)",
            size, self.max_bytes
        ))
    }
}

#[async_trait::async_trait]
impl RecordingFetcher for HttpRecordingFetcher {
    async fn fetch(&self, recording: &Recording) -> Result<Vec<u8>, AcousticError> {
        tracing::debug!(
            recording_id = %recording.recording_id,
            url = %recording.recording_url,
            "Downloading recording"
        );

        let mut response = self
            .http_client
            .get(&recording.recording_url)
            .send()
            .await
            .map_err(|e| AcousticError::Download(describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcousticError::Download(format!("HTTP status {}", status)));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return Err(self.too_large(length));
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AcousticError::Download(describe(&e)))?
        {
            if (bytes.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(self.too_large((bytes.len() + chunk.len()) as u64));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(AcousticError::Download("Empty response body".to_string()));
        }

        tracing::debug!(
            recording_id = %recording.recording_id,
            bytes = bytes.len(),
            "Download complete"
        );

        Ok(bytes)
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("Timed out: {}", err)
    } else {
        err.to_string()
    }
}

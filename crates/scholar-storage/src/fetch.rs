//! Fetching stored objects back through their signed URLs.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Object fetch returned status {0}")]
    Status(u16),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// Retrieves raw object bytes from a signed URL.
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// `reqwest`-backed fetcher with a per-request timeout.
#[derive(Clone)]
pub struct HttpFetcher {
    http_client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl ObjectFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Signed URL fetch rejected");
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        tracing::debug!(
            size_bytes = body.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Fetched object through signed URL"
        );

        Ok(body)
    }
}

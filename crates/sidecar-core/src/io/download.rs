//! Release asset downloads with streaming progress reporting.
//!
//! Assets are small enough (tens of megabytes) to buffer fully; the caller
//! decides whether the bytes are written raw or unpacked.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use sidecar_schema::SidecarName;
use thiserror::Error;

use crate::Reporter;

/// Default total timeout for one asset request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for establishing the connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on the buffer reserved up front from `Content-Length`.
#[cfg(feature = "network")]
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[cfg(feature = "network")]
    #[error("HTTP client setup failed: {0}")]
    Client(#[source] reqwest::Error),

    #[cfg(feature = "network")]
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Fetches a remote asset's bytes.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `url` in full, reporting progress for `name` to `reporter`.
    async fn fetch(
        &self,
        name: &SidecarName,
        url: &str,
        reporter: &dyn Reporter,
    ) -> Result<Bytes, DownloadError>;
}

/// Whole-number percentage of `total` covered by `downloaded`, capped at 100.
pub fn percent_complete(downloaded: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let percent = (downloaded.saturating_mul(100) / total).min(100);
    Some(percent as u8)
}

/// [`Fetcher`] backed by a `reqwest` client.
#[cfg(feature = "network")]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

#[cfg(feature = "network")]
impl HttpFetcher {
    /// Build a client with the given total timeout, a 30 s connect timeout
    /// and the crate user agent. Redirects follow the reqwest default policy.
    pub fn new(timeout: Duration) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(DownloadError::Client)?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "network")]
#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        name: &SidecarName,
        url: &str,
        reporter: &dyn Reporter,
    ) -> Result<Bytes, DownloadError> {
        use futures::StreamExt;

        let http_err = |source| DownloadError::Http {
            url: url.to_string(),
            source,
        };

        tracing::debug!(%url, "GET");
        let response = self.client.get(url).send().await.map_err(http_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        let mut buffer = Vec::with_capacity(total.map_or(0, |t| t.min(MAX_PREALLOC)) as usize);
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(http_err)?;
            buffer.extend_from_slice(&chunk);
            downloaded += chunk.len() as u64;
            if let Some(percent) = total.and_then(|t| percent_complete(downloaded, t)) {
                reporter.downloading(name, percent);
            }
        }

        tracing::debug!(%url, bytes = downloaded, "download complete");
        Ok(Bytes::from(buffer))
    }
}

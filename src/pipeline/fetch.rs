//! Fetch stage: download the source PDF into memory.
//!
//! The body is kept as bytes: the page editor works on an in-memory buffer
//! and the extraction client stages its own copy, so there is no reason to
//! touch the disk here. We validate the PDF magic bytes (`%PDF`) before
//! returning so a login page or a 404 HTML body fails here with a clear
//! error instead of deep inside the PDF parser or the remote service.

use crate::error::PdfChunkError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Source of PDF bytes.
///
/// [`HttpFetcher`] is the production implementation; tests substitute their
/// own to count calls or serve fixtures without a network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieve the resource body at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PdfChunkError>;
}

/// Check whether the URL names a `.pdf` resource (suffix only).
pub fn is_pdf_url(url: &str) -> bool {
    url.ends_with(".pdf")
}

/// Plain HTTP GET fetcher. Sends no authentication headers.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, PdfChunkError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PdfChunkError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }

    fn transport_error(&self, url: &str, e: reqwest::Error) -> PdfChunkError {
        if e.is_timeout() {
            PdfChunkError::DownloadTimeout {
                url: url.to_string(),
                secs: self.timeout_secs,
            }
        } else {
            PdfChunkError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PdfChunkError> {
        info!("Downloading PDF from: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        if !response.status().is_success() {
            return Err(PdfChunkError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        check_pdf_magic(url, &bytes)?;

        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

/// Reject bodies that do not start with `%PDF`.
pub fn check_pdf_magic(url: &str, bytes: &[u8]) -> Result<(), PdfChunkError> {
    if bytes.starts_with(b"%PDF") {
        return Ok(());
    }
    Err(PdfChunkError::NotAPdf {
        url: url.to_string(),
        magic: bytes.iter().take(4).copied().collect(),
    })
}

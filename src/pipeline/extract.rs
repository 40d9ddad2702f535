//! Extraction stage: stage the PDF on disk and hand it to the partition service.
//!
//! ## Why a staging file?
//!
//! The partition API takes a file upload, and the client contract is "give
//! me a path". The bytes are written to a randomly named file inside the
//! configured staging directory so concurrent runs sharing that directory
//! never collide. The file is a [`StagingFile`] guard: it is removed when
//! the guard drops, so a failed or panicking service call cannot leave it
//! behind. On the success path it is closed explicitly so a failed delete
//! is reported instead of ignored.

use crate::config::{ExtractionConfig, PartitionStrategy, API_KEY_ENV};
use crate::error::PdfChunkError;
use crate::output::ExtractedRecord;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Length of the random staging file stem.
const STAGING_NAME_LEN: usize = 7;

/// Longest slice of an error response body kept in the error message.
const MAX_ERROR_BODY: usize = 500;

/// Everything the partition service needs for one call.
#[derive(Debug, Clone, Copy)]
pub struct PartitionRequest<'a> {
    /// Path of the staged PDF.
    pub path: &'a Path,
    /// Credential to authenticate with.
    pub api_key: &'a str,
    pub strategy: PartitionStrategy,
}

/// A layout-aware extraction backend.
///
/// [`UnstructuredApi`] talks to the hosted (or self-hosted) Unstructured
/// partition endpoint; tests plug in their own implementation.
#[async_trait]
pub trait PartitionService: Send + Sync {
    /// Partition the file at `request.path` into records.
    async fn partition(
        &self,
        request: PartitionRequest<'_>,
    ) -> Result<Vec<ExtractedRecord>, PdfChunkError>;
}

// ── Staging file ─────────────────────────────────────────────────────────

/// A randomly named PDF inside the staging directory, deleted on drop.
#[derive(Debug)]
pub struct StagingFile {
    file: NamedTempFile,
}

impl StagingFile {
    /// Create `dir` if needed and write `bytes` to a fresh `<random>.pdf` inside it.
    pub fn create(dir: &Path, bytes: &[u8]) -> Result<Self, PdfChunkError> {
        std::fs::create_dir_all(dir).map_err(|source| PdfChunkError::Staging {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut file = tempfile::Builder::new()
            .prefix("")
            .rand_bytes(STAGING_NAME_LEN)
            .suffix(".pdf")
            .tempfile_in(dir)
            .map_err(|source| PdfChunkError::Staging {
                path: dir.to_path_buf(),
                source,
            })?;

        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|source| PdfChunkError::Staging {
                path: file.path().to_path_buf(),
                source,
            })?;

        debug!("Staged {} bytes at {}", bytes.len(), file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the file now, reporting failure.
    pub fn close(self) -> Result<(), PdfChunkError> {
        let path = self.file.path().to_path_buf();
        self.file
            .close()
            .map_err(|source| PdfChunkError::Staging { path, source })
    }
}

// ── Extraction client ────────────────────────────────────────────────────

/// Converts PDF bytes into records through a [`PartitionService`].
pub struct ExtractionClient {
    api_key: Option<String>,
    strategy: PartitionStrategy,
    staging_dir: PathBuf,
    service: Arc<dyn PartitionService>,
}

impl ExtractionClient {
    pub fn new(config: &ExtractionConfig, service: Arc<dyn PartitionService>) -> Self {
        Self {
            api_key: config.api_key.clone(),
            strategy: config.strategy,
            staging_dir: config.staging_dir.clone(),
            service,
        }
    }

    /// Stage `pdf`, partition it, and remove the staging file.
    ///
    /// # Errors
    /// - [`PdfChunkError::MissingCredential`] before anything touches disk or network
    /// - [`PdfChunkError::Staging`] if the staging file cannot be written or removed
    /// - whatever the service returns, after the staging file is gone
    pub async fn extract(&self, pdf: &[u8]) -> Result<Vec<ExtractedRecord>, PdfChunkError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(PdfChunkError::MissingCredential {
                env_var: API_KEY_ENV,
            })?;

        let staged = StagingFile::create(&self.staging_dir, pdf)?;
        info!(
            "Partitioning {} ({} bytes, strategy={})",
            staged.path().display(),
            pdf.len(),
            self.strategy
        );

        let result = self
            .service
            .partition(PartitionRequest {
                path: staged.path(),
                api_key,
                strategy: self.strategy,
            })
            .await;

        match result {
            Ok(records) => {
                staged.close()?;
                Ok(records)
            }
            Err(e) => {
                warn!("Partition call failed: {}", e);
                drop(staged);
                Err(e)
            }
        }
    }
}

// ── Unstructured API ─────────────────────────────────────────────────────

/// HTTP client for the Unstructured partition endpoint.
///
/// Sends `multipart/form-data` with the PDF under `files` and the strategy
/// under `strategy`, authenticated by the `unstructured-api-key` header.
/// The response is a JSON array of elements.
#[derive(Debug, Clone)]
pub struct UnstructuredApi {
    client: reqwest::Client,
    api_url: String,
    timeout_secs: u64,
}

impl UnstructuredApi {
    pub fn new(api_url: impl Into<String>, timeout_secs: u64) -> Result<Self, PdfChunkError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PdfChunkError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            timeout_secs,
        })
    }

    /// Build from the endpoint and timeout in `config`.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, PdfChunkError> {
        Self::new(config.api_url.clone(), config.api_timeout_secs)
    }

    fn transport_error(&self, e: reqwest::Error) -> PdfChunkError {
        if e.is_timeout() {
            PdfChunkError::ExtractionTimeout {
                secs: self.timeout_secs,
            }
        } else {
            PdfChunkError::ExtractionFailed {
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl PartitionService for UnstructuredApi {
    async fn partition(
        &self,
        request: PartitionRequest<'_>,
    ) -> Result<Vec<ExtractedRecord>, PdfChunkError> {
        let bytes = tokio::fs::read(request.path)
            .await
            .map_err(|source| PdfChunkError::Staging {
                path: request.path.to_path_buf(),
                source,
            })?;

        let file_name = request
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(|e| PdfChunkError::Internal(format!("Invalid MIME type: {e}")))?;
        let form = Form::new()
            .part("files", part)
            .text("strategy", request.strategy.as_str());

        let response = self
            .client
            .post(&self.api_url)
            .header("unstructured-api-key", request.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(PdfChunkError::ExtractionFailed {
                message: format!("HTTP {status}: {body}"),
            });
        }

        let records: Vec<ExtractedRecord> = response
            .json()
            .await
            .map_err(|e| PdfChunkError::ExtractionFailed {
                message: format!("Malformed response: {e}"),
            })?;

        debug!("Partition endpoint returned {} elements", records.len());
        Ok(records)
    }
}

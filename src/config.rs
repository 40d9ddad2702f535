//! Configuration types for the fetch → edit → partition pipeline.
//!
//! Two structs carry everything a run needs:
//!
//! * [`Job`] — *what* to process: the source URL, a label, and the pages to
//!   drop. One per document.
//! * [`ExtractionConfig`] — *how* to process it: credential, endpoint,
//!   partition strategy, staging directory, timeouts. Built once at startup
//!   (usually via [`ExtractionConfig::builder_from_env`]) and shared by every
//!   run; nothing below this layer reads the process environment.

use crate::error::PdfChunkError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Environment variable holding the Unstructured API key.
pub const API_KEY_ENV: &str = "UNSTRUCTURED_API_KEY";

/// Environment variable overriding the partition endpoint.
pub const API_URL_ENV: &str = "UNSTRUCTURED_API_URL";

/// Hosted partition endpoint used when no override is configured.
pub const DEFAULT_API_URL: &str = "https://api.unstructured.io/general/v0/general";

/// Configuration for the extraction pipeline.
///
/// # Example
/// ```rust
/// use edgequake_pdfchunk::{ExtractionConfig, PartitionStrategy};
///
/// let config = ExtractionConfig::builder()
///     .api_key("my-key")
///     .strategy(PartitionStrategy::HiRes)
///     .staging_dir("pdfs")
///     .build()
///     .unwrap();
/// assert_eq!(config.strategy.as_str(), "hi_res");
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Unstructured API key. Checked by the extraction client before any
    /// staging or network activity; `None` fails the run with
    /// [`PdfChunkError::MissingCredential`].
    pub api_key: Option<String>,

    /// Partition endpoint URL. Default: [`DEFAULT_API_URL`].
    pub api_url: String,

    /// Layout-analysis strategy requested from the service. Default: `hi_res`.
    pub strategy: PartitionStrategy,

    /// Scratch directory for the staging file. Created on demand. Default: `pdfs`.
    pub staging_dir: PathBuf,

    /// How the page list is interpreted by the page editor. Default: [`DeletionOrder::Ascending`].
    pub deletion_order: DeletionOrder,

    /// Download timeout for the source PDF in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Timeout for the partition call in seconds. Default: 300.
    ///
    /// `hi_res` runs layout detection and OCR server-side, so a long paper
    /// routinely takes over a minute.
    pub api_timeout_secs: u64,

    /// Optional per-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            strategy: PartitionStrategy::default(),
            staging_dir: PathBuf::from("pdfs"),
            deletion_order: DeletionOrder::default(),
            download_timeout_secs: 120,
            api_timeout_secs: 300,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("strategy", &self.strategy)
            .field("staging_dir", &self.staging_dir)
            .field("deletion_order", &self.deletion_order)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder with library defaults and no credential.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Create a builder seeded from the process environment.
    ///
    /// Reads [`API_KEY_ENV`] and [`API_URL_ENV`]. A missing or empty key is
    /// not an error here; the extraction client reports it when it runs.
    pub fn builder_from_env() -> ExtractionConfigBuilder {
        let mut builder = Self::builder();
        if let Some(key) = non_empty_env(API_KEY_ENV) {
            builder = builder.api_key(key);
        }
        if let Some(url) = non_empty_env(API_URL_ENV) {
            builder = builder.api_url(url);
        }
        builder
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.config.api_key = if key.trim().is_empty() { None } else { Some(key) };
        self
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    pub fn strategy(mut self, strategy: PartitionStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.staging_dir = dir.into();
        self
    }

    pub fn deletion_order(mut self, order: DeletionOrder) -> Self {
        self.config.deletion_order = order;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, PdfChunkError> {
        let c = &self.config;
        if !(c.api_url.starts_with("http://") || c.api_url.starts_with("https://")) {
            return Err(PdfChunkError::InvalidConfig(format!(
                "API URL must be http(s), got '{}'",
                c.api_url
            )));
        }
        if c.download_timeout_secs == 0 || c.api_timeout_secs == 0 {
            return Err(PdfChunkError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.staging_dir.as_os_str().is_empty() {
            return Err(PdfChunkError::InvalidConfig(
                "Staging directory must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Partition strategy sent to the Unstructured API as the `strategy` form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionStrategy {
    /// Layout model + OCR. Slowest, best structure. (default)
    #[default]
    HiRes,
    /// Text-layer extraction only.
    Fast,
    /// Let the service decide per document.
    Auto,
    /// OCR every page, ignoring the text layer.
    OcrOnly,
}

impl PartitionStrategy {
    /// Wire value for the `strategy` form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionStrategy::HiRes => "hi_res",
            PartitionStrategy::Fast => "fast",
            PartitionStrategy::Auto => "auto",
            PartitionStrategy::OcrOnly => "ocr_only",
        }
    }
}

impl fmt::Display for PartitionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the page editor interprets the list of pages to delete.
///
/// Pages are removed one at a time, and the i-th removal targets position
/// `page - 1 - i` in the already-shrunk document. That offset is only right
/// when the list is ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletionOrder {
    /// Sort and de-duplicate the list first; every page must exist. (default)
    #[default]
    Ascending,
    /// Use the list exactly as given. The caller guarantees it is ascending;
    /// an unsorted list removes the wrong pages.
    AsGiven,
}

/// One document to fetch, trim and partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// URL of the source document. Must end with `.pdf`.
    pub source_url: String,
    /// Free-form name carried through to the output.
    pub label: String,
    /// 1-based pages to remove before partitioning.
    pub pages_to_delete: Option<Vec<u32>>,
}

impl Job {
    pub fn new(source_url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            label: label.into(),
            pages_to_delete: None,
        }
    }

    /// Set the pages to remove (1-based).
    pub fn delete_pages(mut self, pages: Vec<u32>) -> Self {
        self.pages_to_delete = Some(pages);
        self
    }

    /// The page list, if one was given and it is non-empty.
    pub fn pages_to_delete(&self) -> Option<&[u32]> {
        self.pages_to_delete
            .as_deref()
            .filter(|pages| !pages.is_empty())
    }
}

/// Highest page number (and longest list) [`parse_page_list`] accepts.
///
/// Ranges are expanded before the document is seen, so the bound keeps a
/// single token like `1-4294967295` from allocating gigabytes.
pub const MAX_PAGE_NUMBER: u32 = 100_000;

/// Parse a page list such as `"2,4,7-9"` into 1-based page numbers.
///
/// Order is preserved (ranges expand ascending) so that
/// [`DeletionOrder::AsGiven`] sees exactly what the user typed.
pub fn parse_page_list(s: &str) -> Result<Vec<u32>, PdfChunkError> {
    let invalid = |part: &str| PdfChunkError::InvalidConfig(format!("Invalid page spec '{part}'"));
    let too_large = |part: &str| {
        PdfChunkError::InvalidConfig(format!(
            "Page spec '{part}' exceeds the limit of {MAX_PAGE_NUMBER} pages"
        ))
    };
    let mut pages: Vec<u32> = Vec::new();

    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if let Some((a, b)) = part.split_once('-') {
            let start: u32 = a.trim().parse().map_err(|_| invalid(part))?;
            let end: u32 = b.trim().parse().map_err(|_| invalid(part))?;
            if start == 0 || end < start {
                return Err(invalid(part));
            }
            let span = (end - start) as usize + 1;
            if end > MAX_PAGE_NUMBER || pages.len() + span > MAX_PAGE_NUMBER as usize {
                return Err(too_large(part));
            }
            pages.extend(start..=end);
        } else {
            let page: u32 = part.parse().map_err(|_| invalid(part))?;
            if page == 0 {
                return Err(invalid(part));
            }
            if page > MAX_PAGE_NUMBER || pages.len() >= MAX_PAGE_NUMBER as usize {
                return Err(too_large(part));
            }
            pages.push(page);
        }
    }

    Ok(pages)
}

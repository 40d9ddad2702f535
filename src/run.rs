//! Orchestration: fetch → optional page edit → partition.
//!
//! [`Pipeline`] owns the two network backends and the configuration; the
//! free functions [`run`], [`run_to_file`] and [`run_sync`] build the
//! production pipeline for one-shot use.

use crate::config::{ExtractionConfig, Job};
use crate::error::PdfChunkError;
use crate::output::{ExtractionOutput, RunStats};
use crate::pipeline::extract::{ExtractionClient, PartitionService, UnstructuredApi};
use crate::pipeline::fetch::{is_pdf_url, Fetcher, HttpFetcher};
use crate::pipeline::pages;
use crate::progress::PipelineProgressCallback;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// A configured fetch → edit → partition pipeline.
///
/// Cheap to reuse across jobs: it holds the HTTP clients, so connection
/// pools are shared between runs.
pub struct Pipeline {
    config: ExtractionConfig,
    fetcher: Arc<dyn Fetcher>,
    extractor: ExtractionClient,
}

impl Pipeline {
    /// Production pipeline: [`HttpFetcher`] + [`UnstructuredApi`].
    pub fn new(config: ExtractionConfig) -> Result<Self, PdfChunkError> {
        let fetcher = Arc::new(HttpFetcher::new(config.download_timeout_secs)?);
        let service = Arc::new(UnstructuredApi::from_config(&config)?);
        Ok(Self::with_backends(config, fetcher, service))
    }

    /// Pipeline over caller-supplied backends.
    pub fn with_backends(
        config: ExtractionConfig,
        fetcher: Arc<dyn Fetcher>,
        service: Arc<dyn PartitionService>,
    ) -> Self {
        let extractor = ExtractionClient::new(&config, service);
        Self {
            config,
            fetcher,
            extractor,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Run one job to completion.
    ///
    /// # Errors
    /// Every failure is fatal and returned as-is:
    /// - [`PdfChunkError::InvalidSource`] before any network call when the
    ///   URL does not end in `.pdf`
    /// - transport errors from the download or the partition call
    /// - [`PdfChunkError::PageOutOfRange`] / [`PdfChunkError::CorruptPdf`] from the page edit
    /// - [`PdfChunkError::MissingCredential`] from the extraction client
    pub async fn run(&self, job: &Job) -> Result<ExtractionOutput, PdfChunkError> {
        let total_start = Instant::now();
        info!("Starting run '{}': {}", job.label, job.source_url);

        // ── Step 1: Validate source ──────────────────────────────────────────
        if !is_pdf_url(&job.source_url) {
            return Err(PdfChunkError::InvalidSource {
                url: job.source_url.clone(),
            });
        }

        // ── Step 2: Fetch ────────────────────────────────────────────────────
        self.notify(|cb| cb.on_fetch_start(&job.source_url));
        let fetch_start = Instant::now();
        let pdf = self.fetcher.fetch(&job.source_url).await?;
        let fetch_duration_ms = fetch_start.elapsed().as_millis() as u64;
        let downloaded_bytes = pdf.len();
        self.notify(|cb| cb.on_fetch_complete(downloaded_bytes));

        // ── Step 3: Remove pages (optional) ──────────────────────────────────
        let edit_start = Instant::now();
        let (payload, original_pages, deleted_pages, submitted_pages) =
            match job.pages_to_delete() {
                Some(to_delete) => {
                    let edited = pages::remove_pages_async(
                        pdf,
                        to_delete.to_vec(),
                        self.config.deletion_order,
                    )
                    .await?;
                    let removed = edited.original_pages - edited.remaining_pages;
                    self.notify(|cb| cb.on_pages_removed(removed, edited.remaining_pages));
                    (
                        edited.bytes,
                        Some(edited.original_pages),
                        removed,
                        Some(edited.remaining_pages),
                    )
                }
                None => {
                    debug!("No pages to delete; submitting download unchanged");
                    (pdf, None, 0, None)
                }
            };
        let edit_duration_ms = edit_start.elapsed().as_millis() as u64;

        // ── Step 4: Partition ────────────────────────────────────────────────
        self.notify(|cb| cb.on_extraction_start());
        let extraction_start = Instant::now();
        let records = self.extractor.extract(&payload).await?;
        let extraction_duration_ms = extraction_start.elapsed().as_millis() as u64;
        self.notify(|cb| cb.on_extraction_complete(records.len()));

        let stats = RunStats {
            downloaded_bytes,
            original_pages,
            deleted_pages,
            submitted_pages,
            record_count: records.len(),
            fetch_duration_ms,
            edit_duration_ms,
            extraction_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        info!(
            "Run '{}' complete: {} records, {}ms total",
            job.label, stats.record_count, stats.total_duration_ms
        );

        Ok(ExtractionOutput {
            label: job.label.clone(),
            source_url: job.source_url.clone(),
            records,
            stats,
        })
    }

    fn notify(&self, event: impl FnOnce(&dyn PipelineProgressCallback)) {
        if let Some(ref cb) = self.config.progress_callback {
            event(cb.as_ref());
        }
    }
}

/// Run one job with the production backends.
///
/// This is the primary entry point for the library.
///
/// ```rust,no_run
/// use edgequake_pdfchunk::{run, ExtractionConfig, Job};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExtractionConfig::builder_from_env().build()?;
/// let job = Job::new("https://arxiv.org/pdf/2305.15334.pdf", "gorilla").delete_pages(vec![1]);
/// let output = run(&job, &config).await?;
/// println!("length {}", output.records.len());
/// # Ok(())
/// # }
/// ```
pub async fn run(job: &Job, config: &ExtractionConfig) -> Result<ExtractionOutput, PdfChunkError> {
    Pipeline::new(config.clone())?.run(job).await
}

/// Run one job and write the output as pretty JSON.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn run_to_file(
    job: &Job,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<RunStats, PdfChunkError> {
    let output = run(job, config).await?;
    let path = output_path.as_ref();
    write_json_atomic(path, &output).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
///
/// # Panics
/// Panics when called from inside a Tokio runtime ("Cannot start a runtime
/// from within a runtime"). Async callers use [`run`] instead.
pub fn run_sync(job: &Job, config: &ExtractionConfig) -> Result<ExtractionOutput, PdfChunkError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PdfChunkError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(job, config))
}

async fn write_json_atomic(path: &Path, output: &ExtractionOutput) -> Result<(), PdfChunkError> {
    let json = serde_json::to_vec_pretty(output)
        .map_err(|e| PdfChunkError::Internal(format!("Failed to serialise output: {e}")))?;

    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || persist_json(&path, &json))
        .await
        .map_err(|e| PdfChunkError::Internal(format!("Output write task panicked: {e}")))?
}

/// Write `json` to a uniquely named temp file next to `path`, then rename it
/// into place. Concurrent writers to the same path never share a temp file.
fn persist_json(path: &Path, json: &[u8]) -> Result<(), PdfChunkError> {
    let write_err = |source: std::io::Error| PdfChunkError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent).map_err(write_err)?;
            parent
        }
        None => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".pdfchunk-")
        .suffix(".json.tmp")
        .tempfile_in(parent)
        .map_err(write_err)?;
    tmp.write_all(json).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

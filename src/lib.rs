//! # edgequake-pdfchunk
//!
//! Download a PDF, drop the pages you don't want, and partition the rest
//! into structured chunks with the Unstructured API.
//!
//! ## Pipeline Overview
//!
//! ```text
//! URL (*.pdf)
//!  │
//!  ├─ 1. Fetch    HTTP GET into memory, `%PDF` magic check
//!  ├─ 2. Edit     remove 1-based pages (optional, lopdf, spawn_blocking)
//!  ├─ 3. Stage    write <random>.pdf into the staging directory
//!  ├─ 4. Partition POST to the Unstructured API (strategy=hi_res)
//!  └─ 5. Cleanup  staging file removed on every exit path
//! ```
//!
//! Layout analysis, OCR and chunking all happen server-side; this crate is
//! the plumbing around them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfchunk::{run, ExtractionConfig, Job};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads UNSTRUCTURED_API_KEY (and optionally UNSTRUCTURED_API_URL)
//!     let config = ExtractionConfig::builder_from_env().build()?;
//!     let job = Job::new("https://arxiv.org/pdf/2305.15334.pdf", "gorilla")
//!         .delete_pages(vec![1, 2]);
//!     let output = run(&job, &config).await?;
//!     for record in &output.records {
//!         println!("[{}] {}", record.category, record.text);
//!     }
//!     eprintln!("length {}", output.records.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfchunk` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    parse_page_list, DeletionOrder, ExtractionConfig, ExtractionConfigBuilder, Job,
    PartitionStrategy, API_KEY_ENV, API_URL_ENV, DEFAULT_API_URL, MAX_PAGE_NUMBER,
};
pub use error::{ErrorKind, PdfChunkError};
pub use output::{ExtractedRecord, ExtractionOutput, RunStats};
pub use pipeline::extract::{
    ExtractionClient, PartitionRequest, PartitionService, StagingFile, UnstructuredApi,
};
pub use pipeline::fetch::{Fetcher, HttpFetcher};
pub use pipeline::pages::{page_count, remove_pages, EditedPdf};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use run::{run, run_sync, run_to_file, Pipeline};

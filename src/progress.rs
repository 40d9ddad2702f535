//! Progress-callback trait for per-stage pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to be told
//! when each stage of a run starts and finishes. The CLI uses this to drive
//! its spinner; a server could forward the same events to a channel.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfchunk::{ExtractionConfig, PipelineProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct RecordCounter {
//!     records: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for RecordCounter {
//!     fn on_extraction_complete(&self, record_count: usize) {
//!         self.records.store(record_count, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(RecordCounter { records: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called just before the source PDF is requested.
    fn on_fetch_start(&self, url: &str) {
        let _ = url;
    }

    /// Called once the download finished.
    ///
    /// # Arguments
    /// * `bytes` — size of the downloaded body
    fn on_fetch_complete(&self, bytes: usize) {
        let _ = bytes;
    }

    /// Called after the page editor ran (never called when no pages were requested).
    ///
    /// # Arguments
    /// * `removed`   — number of pages actually removed
    /// * `remaining` — page count of the edited document
    fn on_pages_removed(&self, removed: usize, remaining: usize) {
        let _ = (removed, remaining);
    }

    /// Called just before the staging file is written and the service invoked.
    fn on_extraction_start(&self) {}

    /// Called when the service returned and the staging file is gone.
    fn on_extraction_complete(&self, record_count: usize) {
        let _ = record_count;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

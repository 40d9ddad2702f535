//! Error types for the edgequake-pdfchunk library.
//!
//! Every failure in the pipeline is fatal: there is no partial result worth
//! returning when the download, the page edit, or the partition call fails.
//! All of them are therefore variants of a single enum, [`PdfChunkError`],
//! returned as `Err(..)` from [`crate::run`] and [`crate::Pipeline::run`].
//!
//! Callers that want to branch on the broad failure class (bad input vs. bad
//! environment vs. network trouble) use [`PdfChunkError::kind`] instead of
//! matching every variant.

use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of a [`PdfChunkError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller handed us something we refuse to process.
    Validation,
    /// The process environment is missing something (API key, bad knob).
    Configuration,
    /// Network failure talking to the source host or the extraction service.
    Transport,
    /// The PDF itself does not support the requested operation.
    Structural,
    /// Local filesystem trouble (staging file, output file).
    Resource,
    /// A bug or a panicked background task.
    Internal,
}

/// All errors returned by the edgequake-pdfchunk library.
#[derive(Debug, Error)]
pub enum PdfChunkError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// The source URL does not point at a `.pdf` resource.
    #[error("Not a PDF file: '{url}'\nThe source URL must end with \".pdf\".")]
    InvalidSource { url: String },

    // ── Configuration errors ──────────────────────────────────────────────
    /// No credential for the extraction service was configured.
    #[error("Unstructured API key not found.\nSet {env_var} or pass --api-key.")]
    MissingCredential { env_var: &'static str },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Transport errors ──────────────────────────────────────────────────
    /// HTTP download of the source PDF failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The partition endpoint could not be reached or rejected the request.
    #[error("Extraction service error: {message}")]
    ExtractionFailed { message: String },

    /// The partition call exceeded the configured timeout.
    #[error("Extraction service timed out after {secs}s\nIncrease --api-timeout; hi_res partitioning of long documents is slow.")]
    ExtractionTimeout { secs: u64 },

    // ── Structural errors ─────────────────────────────────────────────────
    /// A page number (after offset adjustment) does not exist in the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: u32, total: u32 },

    /// The payload could not be parsed or re-serialised as a PDF.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// The downloaded body does not start with the `%PDF` magic.
    #[error("Downloaded body from '{url}' is not a PDF\nFirst bytes: {magic:?}")]
    NotAPdf { url: String, magic: Vec<u8> },

    // ── Resource errors ───────────────────────────────────────────────────
    /// Could not create, write or delete the staging file.
    #[error("Staging file error at '{path}': {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the JSON output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PdfChunkError {
    /// Classify this error into one of the broad [`ErrorKind`]s.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PdfChunkError::InvalidSource { .. } => ErrorKind::Validation,
            PdfChunkError::MissingCredential { .. } | PdfChunkError::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            PdfChunkError::DownloadFailed { .. }
            | PdfChunkError::DownloadTimeout { .. }
            | PdfChunkError::ExtractionFailed { .. }
            | PdfChunkError::ExtractionTimeout { .. } => ErrorKind::Transport,
            PdfChunkError::PageOutOfRange { .. }
            | PdfChunkError::CorruptPdf { .. }
            | PdfChunkError::NotAPdf { .. } => ErrorKind::Structural,
            PdfChunkError::Staging { .. } | PdfChunkError::OutputWriteFailed { .. } => {
                ErrorKind::Resource
            }
            PdfChunkError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<lopdf::Error> for PdfChunkError {
    fn from(e: lopdf::Error) -> Self {
        PdfChunkError::CorruptPdf {
            detail: e.to_string(),
        }
    }
}

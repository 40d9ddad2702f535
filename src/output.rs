//! Output types: partition records and run statistics.

use serde::{Deserialize, Serialize};

/// One element returned by the partition service.
///
/// The service decides what an element is (a title, a paragraph, a table, a
/// list item …) and what metadata to attach; this crate passes it through
/// unmodified. Field names follow the service's JSON, except `type`, which
/// is exposed as `category`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// Stable identifier assigned by the service.
    #[serde(default)]
    pub element_id: String,

    /// Element type, e.g. `"Title"`, `"NarrativeText"`, `"Table"`.
    #[serde(rename = "type", default)]
    pub category: String,

    /// Extracted text of the element.
    #[serde(default)]
    pub text: String,

    /// Everything else the service reported (page number, coordinates,
    /// filename, languages …).
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ExtractedRecord {
    /// Page the element was found on, when the service reported one.
    pub fn page_number(&self) -> Option<u64> {
        self.metadata.get("page_number").and_then(|v| v.as_u64())
    }
}

/// Result of a full pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Label from the [`crate::Job`].
    pub label: String,
    /// Source URL from the [`crate::Job`].
    pub source_url: String,
    /// Records in the order the service returned them.
    pub records: Vec<ExtractedRecord>,
    pub stats: RunStats,
}

/// Counters and timings for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Size of the downloaded PDF in bytes.
    pub downloaded_bytes: usize,
    /// Page count of the downloaded PDF. `None` when no page edit was
    /// requested (the document is never parsed locally in that case).
    pub original_pages: Option<usize>,
    /// Pages removed by the page editor.
    pub deleted_pages: usize,
    /// Page count of the payload sent to the service, when known.
    pub submitted_pages: Option<usize>,
    /// Number of records returned.
    pub record_count: usize,
    pub fetch_duration_ms: u64,
    pub edit_duration_ms: u64,
    pub extraction_duration_ms: u64,
    pub total_duration_ms: u64,
}

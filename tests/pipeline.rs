//! Pipeline integration tests over in-process backends.
//!
//! The fetcher serves a lopdf fixture from memory and the partition service
//! inspects the staged file, so these run offline and instantly.
//!
//! Run with:
//!   cargo test --test pipeline

mod common;

use async_trait::async_trait;
use common::{numbered_pdf, page_labels, EventLog};
use edgequake_pdfchunk::{
    page_count, DeletionOrder, ErrorKind, ExtractedRecord, ExtractionConfig, Fetcher, Job,
    PartitionRequest, PartitionService, PdfChunkError, Pipeline,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const SAMPLE_URL: &str = "https://example.com/sample.pdf";

// ── Test backends ────────────────────────────────────────────────────────────

/// Serves the same bytes for every URL and counts calls.
struct FixtureFetcher {
    body: Vec<u8>,
    calls: AtomicUsize,
}

impl FixtureFetcher {
    fn new(body: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            body,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Fetcher for FixtureFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, PdfChunkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.body.clone())
    }
}

/// Reads back the staged file and answers with one record per page.
#[derive(Default)]
struct InspectingService {
    calls: AtomicUsize,
    /// Page labels of every payload it was handed.
    payloads: Mutex<Vec<Vec<u32>>>,
    fail: bool,
}

#[async_trait]
impl PartitionService for InspectingService {
    async fn partition(
        &self,
        request: PartitionRequest<'_>,
    ) -> Result<Vec<ExtractedRecord>, PdfChunkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let bytes = std::fs::read(request.path).unwrap();
        let labels = page_labels(&bytes);
        self.payloads.lock().unwrap().push(labels.clone());

        if self.fail {
            return Err(PdfChunkError::ExtractionFailed {
                message: "HTTP 503: overloaded".into(),
            });
        }

        Ok(labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let mut metadata = serde_json::Map::new();
                metadata.insert("page_number".into(), serde_json::json!(i + 1));
                ExtractedRecord {
                    element_id: format!("el-{i}"),
                    category: "NarrativeText".into(),
                    text: format!("Page {label}"),
                    metadata,
                }
            })
            .collect())
    }
}

fn config(staging: &Path) -> ExtractionConfig {
    ExtractionConfig::builder()
        .api_key("test-key")
        .staging_dir(staging)
        .build()
        .unwrap()
}

fn staging_is_clean(dir: &Path) -> bool {
    !dir.exists() || std::fs::read_dir(dir).unwrap().next().is_none()
}

// ── Page deletion through the pipeline ───────────────────────────────────────

#[tokio::test]
async fn test_delete_pages_submits_remaining_pages_once() {
    common::init_tracing();
    let tmp = TempDir::new().unwrap();
    let staging = tmp.path().join("pdfs");
    let fetcher = FixtureFetcher::new(numbered_pdf(5));
    let service = Arc::new(InspectingService::default());
    let pipeline = Pipeline::with_backends(config(&staging), fetcher.clone(), service.clone());

    let job = Job::new(SAMPLE_URL, "sample").delete_pages(vec![2, 4]);
    let output = pipeline.run(&job).await.expect("run should succeed");

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*service.payloads.lock().unwrap(), vec![vec![1, 3, 5]]);

    let texts: Vec<&str> = output.records.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, ["Page 1", "Page 3", "Page 5"]);
    assert_eq!(output.records[2].page_number(), Some(3));

    assert_eq!(output.label, "sample");
    assert_eq!(output.source_url, SAMPLE_URL);
    assert_eq!(output.stats.original_pages, Some(5));
    assert_eq!(output.stats.deleted_pages, 2);
    assert_eq!(output.stats.submitted_pages, Some(3));
    assert_eq!(output.stats.record_count, 3);

    assert!(staging_is_clean(&staging), "staging file must be removed");
}

#[tokio::test]
async fn test_unsorted_list_is_sorted_by_default() {
    common::init_tracing();
    let tmp = TempDir::new().unwrap();
    let service = Arc::new(InspectingService::default());
    let pipeline = Pipeline::with_backends(
        config(tmp.path()),
        FixtureFetcher::new(numbered_pdf(5)),
        service.clone(),
    );

    let job = Job::new(SAMPLE_URL, "sample").delete_pages(vec![4, 2]);
    pipeline.run(&job).await.unwrap();

    assert_eq!(*service.payloads.lock().unwrap(), vec![vec![1, 3, 5]]);
}

/// Applying a descending list verbatim drifts onto the wrong pages:
/// [4, 2] removes page 4, then position 0 of the shortened document.
#[tokio::test]
async fn test_descending_list_as_given_removes_wrong_pages() {
    common::init_tracing();
    let tmp = TempDir::new().unwrap();
    let config = ExtractionConfig::builder()
        .api_key("test-key")
        .staging_dir(tmp.path())
        .deletion_order(DeletionOrder::AsGiven)
        .build()
        .unwrap();
    let service = Arc::new(InspectingService::default());
    let pipeline =
        Pipeline::with_backends(config, FixtureFetcher::new(numbered_pdf(5)), service.clone());

    let job = Job::new(SAMPLE_URL, "sample").delete_pages(vec![4, 2]);
    pipeline.run(&job).await.unwrap();

    let payloads = service.payloads.lock().unwrap();
    assert_eq!(payloads[0], vec![2, 3, 5]);
    assert_ne!(payloads[0], vec![1, 3, 5]);
}

#[tokio::test]
async fn test_empty_delete_list_submits_download_unchanged() {
    common::init_tracing();
    let tmp = TempDir::new().unwrap();
    let pdf = numbered_pdf(3);
    let service = Arc::new(InspectingService::default());
    let pipeline =
        Pipeline::with_backends(config(tmp.path()), FixtureFetcher::new(pdf.clone()), service.clone());

    let job = Job::new(SAMPLE_URL, "sample").delete_pages(vec![]);
    let output = pipeline.run(&job).await.unwrap();

    assert_eq!(*service.payloads.lock().unwrap(), vec![vec![1, 2, 3]]);
    assert_eq!(output.stats.downloaded_bytes, pdf.len());
    assert_eq!(output.stats.deleted_pages, 0);
    assert_eq!(output.stats.original_pages, None);
}

#[tokio::test]
async fn test_out_of_range_page_fails_before_partition() {
    common::init_tracing();
    let tmp = TempDir::new().unwrap();
    let service = Arc::new(InspectingService::default());
    let pipeline = Pipeline::with_backends(
        config(tmp.path()),
        FixtureFetcher::new(numbered_pdf(3)),
        service.clone(),
    );

    let job = Job::new(SAMPLE_URL, "sample").delete_pages(vec![2, 9]);
    let err = pipeline.run(&job).await.unwrap_err();

    assert!(matches!(err, PdfChunkError::PageOutOfRange { page: 9, total: 3 }));
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(service.calls.load(Ordering::SeqCst), 0);
}

// ── Validation and configuration ─────────────────────────────────────────────

#[tokio::test]
async fn test_non_pdf_url_never_fetches() {
    common::init_tracing();
    let tmp = TempDir::new().unwrap();
    let fetcher = FixtureFetcher::new(numbered_pdf(1));
    let service = Arc::new(InspectingService::default());
    let pipeline = Pipeline::with_backends(config(tmp.path()), fetcher.clone(), service.clone());

    for url in [
        "https://example.com/document.docx",
        "https://example.com/paper.PDF",
        "https://example.com/paper.pdf?dl=1",
    ] {
        let err = pipeline.run(&Job::new(url, "x")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{url}");
        assert!(err.to_string().contains(url));
    }

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    assert_eq!(service.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_credential_leaves_no_staging_file() {
    common::init_tracing();
    let tmp = TempDir::new().unwrap();
    let staging = tmp.path().join("pdfs");
    let config = ExtractionConfig::builder()
        .staging_dir(&staging)
        .build()
        .unwrap();
    let service = Arc::new(InspectingService::default());
    let pipeline =
        Pipeline::with_backends(config, FixtureFetcher::new(numbered_pdf(2)), service.clone());

    let err = pipeline
        .run(&Job::new(SAMPLE_URL, "sample"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("UNSTRUCTURED_API_KEY"));
    assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    assert!(staging_is_clean(&staging));
}

// ── Cleanup on failure ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_service_failure_removes_staging_file() {
    common::init_tracing();
    let tmp = TempDir::new().unwrap();
    let staging = tmp.path().join("pdfs");
    let service = Arc::new(InspectingService {
        fail: true,
        ..Default::default()
    });
    let pipeline = Pipeline::with_backends(
        config(&staging),
        FixtureFetcher::new(numbered_pdf(4)),
        service.clone(),
    );

    let job = Job::new(SAMPLE_URL, "sample").delete_pages(vec![1]);
    let err = pipeline.run(&job).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("503"));
    assert_eq!(*service.payloads.lock().unwrap(), vec![vec![2, 3, 4]]);
    assert!(staging_is_clean(&staging));
}

#[tokio::test]
async fn test_concurrent_runs_share_staging_dir() {
    common::init_tracing();
    let tmp = TempDir::new().unwrap();
    let staging = tmp.path().join("pdfs");
    let service = Arc::new(InspectingService::default());
    let pipeline = Arc::new(Pipeline::with_backends(
        config(&staging),
        FixtureFetcher::new(numbered_pdf(5)),
        service.clone(),
    ));

    let handles: Vec<_> = (1..=4u32)
        .map(|page| {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move {
                let job = Job::new(SAMPLE_URL, format!("run-{page}")).delete_pages(vec![page]);
                pipeline.run(&job).await
            })
        })
        .collect();

    for handle in handles {
        let output = handle.await.unwrap().unwrap();
        assert_eq!(output.records.len(), 4);
    }

    assert_eq!(service.calls.load(Ordering::SeqCst), 4);
    assert!(staging_is_clean(&staging));
}

// ── Progress callbacks ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_progress_events_arrive_in_stage_order() {
    common::init_tracing();
    let tmp = TempDir::new().unwrap();
    let log = Arc::new(EventLog::default());
    let config = ExtractionConfig::builder()
        .api_key("test-key")
        .staging_dir(tmp.path())
        .progress_callback(log.clone())
        .build()
        .unwrap();
    let pipeline = Pipeline::with_backends(
        config,
        FixtureFetcher::new(numbered_pdf(5)),
        Arc::new(InspectingService::default()),
    );

    let job = Job::new(SAMPLE_URL, "sample").delete_pages(vec![2, 4]);
    pipeline.run(&job).await.unwrap();

    assert_eq!(
        log.snapshot(),
        vec![
            format!("fetch_start {SAMPLE_URL}"),
            "fetch_complete".to_string(),
            "pages_removed 2 3".to_string(),
            "extraction_start".to_string(),
            "extraction_complete 3".to_string(),
        ]
    );
}

#[test]
fn test_fixture_is_a_valid_pdf() {
    let pdf = numbered_pdf(5);
    assert_eq!(page_count(&pdf).unwrap(), 5);
    assert_eq!(page_labels(&pdf), vec![1, 2, 3, 4, 5]);
}

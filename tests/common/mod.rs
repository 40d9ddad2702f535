//! Shared fixtures for the integration tests.
//!
//! Each test binary includes this module and uses a different subset of it.
#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

/// Route library logs through the test harness. `RUST_LOG` overrides the
/// default `warn` level; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Build an `n`-page PDF whose page `k` draws the text `Page k`.
pub fn numbered_pdf(n: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for k in 1..=n {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("Page {k}"))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => n as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// The `Page k` labels of every page, in document order.
pub fn page_labels(pdf: &[u8]) -> Vec<u32> {
    let doc = Document::load_mem(pdf).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| {
            let content = doc.get_page_content(id).unwrap();
            let text = String::from_utf8_lossy(&content);
            (1..=99u32)
                .rev()
                .find(|k| text.contains(&format!("(Page {k})")))
                .unwrap_or_else(|| panic!("page without label: {text}"))
        })
        .collect()
}

/// Cut the embedded PDF out of a captured multipart request body.
pub fn embedded_pdf(body: &[u8]) -> Option<&[u8]> {
    let start = find(body, b"%PDF")?;
    let end = rfind(body, b"%%EOF")? + b"%%EOF".len();
    (start < end).then(|| &body[start..end])
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

// ── Loopback HTTP stub ───────────────────────────────────────────────────────

/// One raw HTTP request as seen by [`serve_once`].
#[derive(Debug, Clone, Default)]
pub struct CapturedRequest {
    /// Request line plus headers, lowercased.
    pub head: String,
    pub body: Vec<u8>,
}

/// Answer exactly one request on a loopback port with a canned response.
///
/// Returns the base URL (`http://127.0.0.1:<port>`) and a handle resolving
/// to the request the server received.
pub async fn serve_once(
    status: &'static str,
    content_type: &'static str,
    body: Vec<u8>,
) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let captured = read_request(&mut socket).await;

        let mut response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(&body);
        socket.write_all(&response).await.unwrap();
        socket.shutdown().await.ok();
        captured
    });

    (base, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before headers were complete");
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok());
    let chunked = head.contains("transfer-encoding: chunked");

    loop {
        let have = buf.len() - header_end;
        let done = match content_length {
            Some(len) => have >= len,
            None if chunked => buf.ends_with(b"0\r\n\r\n"),
            None => true,
        };
        if done {
            break;
        }
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    CapturedRequest {
        head,
        body: buf[header_end..].to_vec(),
    }
}

/// Collects progress events in order.
#[derive(Default)]
pub struct EventLog {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn snapshot(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl edgequake_pdfchunk::PipelineProgressCallback for EventLog {
    fn on_fetch_start(&self, url: &str) {
        self.events.lock().unwrap().push(format!("fetch_start {url}"));
    }
    fn on_fetch_complete(&self, _bytes: usize) {
        self.events.lock().unwrap().push("fetch_complete".into());
    }
    fn on_pages_removed(&self, removed: usize, remaining: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("pages_removed {removed} {remaining}"));
    }
    fn on_extraction_start(&self) {
        self.events.lock().unwrap().push("extraction_start".into());
    }
    fn on_extraction_complete(&self, record_count: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("extraction_complete {record_count}"));
    }
}

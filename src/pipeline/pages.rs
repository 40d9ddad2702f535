//! Page editor: remove 1-based pages from an in-memory PDF.
//!
//! ## Removal order
//!
//! Pages are removed one at a time. After each removal every later page
//! shifts down by one, so the i-th entry of the list (0-based) targets
//! position `page - 1 - i` of the current document. That compensation is
//! only right for an ascending list, which is why [`DeletionOrder::Ascending`]
//! sorts and de-duplicates first. [`DeletionOrder::AsGiven`] applies the
//! list verbatim for callers that rely on the raw behaviour.
//!
//! ## Why spawn_blocking?
//!
//! Parsing and re-serialising a large PDF is CPU-bound; the async wrapper
//! moves it off the Tokio worker threads.

use crate::config::DeletionOrder;
use crate::error::PdfChunkError;
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, info};

/// Result of a page edit.
#[derive(Debug, Clone)]
pub struct EditedPdf {
    /// Serialised PDF with the pages removed.
    pub bytes: Vec<u8>,
    /// Page count before the edit.
    pub original_pages: usize,
    /// Page count after the edit.
    pub remaining_pages: usize,
}

/// Number of pages in a PDF.
pub fn page_count(pdf: &[u8]) -> Result<usize, PdfChunkError> {
    let doc = Document::load_mem(pdf)?;
    Ok(doc.get_pages().len())
}

/// Compute the 0-based positions to remove, in removal order.
///
/// Each position refers to the document as it stands *after* the previous
/// removals, so the returned list can be applied one entry at a time.
pub fn deletion_plan(
    pages: &[u32],
    total: usize,
    order: DeletionOrder,
) -> Result<Vec<usize>, PdfChunkError> {
    let total_u32 = u32::try_from(total).unwrap_or(u32::MAX);

    let effective: Vec<u32> = match order {
        DeletionOrder::Ascending => {
            let mut sorted = pages.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            if let Some(&bad) = sorted.iter().find(|&&p| p == 0 || p > total_u32) {
                return Err(PdfChunkError::PageOutOfRange {
                    page: bad,
                    total: total_u32,
                });
            }
            sorted
        }
        DeletionOrder::AsGiven => pages.to_vec(),
    };

    let mut plan = Vec::with_capacity(effective.len());
    for (i, &page) in effective.iter().enumerate() {
        let current_len = total.saturating_sub(i);
        let position = (page as usize)
            .checked_sub(1 + i)
            .filter(|&pos| pos < current_len)
            .ok_or(PdfChunkError::PageOutOfRange {
                page,
                total: u32::try_from(current_len).unwrap_or(u32::MAX),
            })?;
        plan.push(position);
    }
    Ok(plan)
}

/// Remove `pages` (1-based) from `pdf` and return the re-serialised document.
pub fn remove_pages(
    pdf: &[u8],
    pages: &[u32],
    order: DeletionOrder,
) -> Result<EditedPdf, PdfChunkError> {
    let mut doc = Document::load_mem(pdf)?;
    let original_pages = doc.get_pages().len();

    let plan = deletion_plan(pages, original_pages, order)?;
    debug!("Deletion plan for {:?} ({:?}): {:?}", pages, order, plan);

    for &position in &plan {
        // get_pages() is keyed by 1-based page number in document order.
        let page_id = doc
            .get_pages()
            .get(&(position as u32 + 1))
            .copied()
            .ok_or_else(|| PdfChunkError::CorruptPdf {
                detail: format!("page tree has no page at position {}", position + 1),
            })?;
        detach_page(&mut doc, page_id)?;
    }

    doc.prune_objects();
    let remaining_pages = doc.get_pages().len();

    let mut bytes = Vec::with_capacity(pdf.len());
    doc.save_to(&mut bytes)
        .map_err(|e| PdfChunkError::CorruptPdf {
            detail: format!("failed to serialise edited PDF: {e}"),
        })?;

    info!(
        "Removed {} pages ({} → {})",
        plan.len(),
        original_pages,
        remaining_pages
    );

    Ok(EditedPdf {
        bytes,
        original_pages,
        remaining_pages,
    })
}

/// Async wrapper around [`remove_pages`].
pub async fn remove_pages_async(
    pdf: Vec<u8>,
    pages: Vec<u32>,
    order: DeletionOrder,
) -> Result<EditedPdf, PdfChunkError> {
    tokio::task::spawn_blocking(move || remove_pages(&pdf, &pages, order))
        .await
        .map_err(|e| PdfChunkError::Internal(format!("Page edit task panicked: {e}")))?
}

/// Unlink a page from its parent's `Kids` and decrement `Count` on every
/// ancestor so the page tree stays consistent.
fn detach_page(doc: &mut Document, page_id: ObjectId) -> Result<(), PdfChunkError> {
    let parent_id = doc
        .get_dictionary(page_id)
        .and_then(|page| page.get(b"Parent"))
        .and_then(Object::as_reference)?;

    let kids = doc
        .get_object_mut(parent_id)
        .and_then(Object::as_dict_mut)
        .and_then(|parent| parent.get_mut(b"Kids"))
        .and_then(Object::as_array_mut)?;
    kids.retain(|kid| kid.as_reference().map_or(true, |id| id != page_id));

    let mut node = Some(parent_id);
    while let Some(id) = node {
        let dict = doc.get_object_mut(id).and_then(Object::as_dict_mut)?;
        if let Ok(count) = dict.get(b"Count").and_then(Object::as_i64) {
            dict.set("Count", (count - 1).max(0));
        }
        node = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(())
}

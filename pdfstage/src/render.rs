//! Page counts for staged documents.
//!
//! Expansion into pages needs to know how many pages a document has. The
//! count comes from a [`PageCounter`]; a document whose count cannot be
//! determined stays whole and is reported as a [`StageError::RenderFailure`].

use lopdf::Document;
use thiserror::Error;
use tracing::warn;

use crate::error::{Result, StageError};
use crate::staging::{DocumentId, StagingStore};

/// Why a page count could not be determined.
#[derive(Debug, Error)]
pub enum PageCountError {
    /// The bytes do not start with a PDF header.
    #[error("not a PDF document")]
    NotPdf,

    /// lopdf could not parse the document.
    #[error("failed to parse document: {0}")]
    Parse(#[from] lopdf::Error),

    /// The page tree is larger than a page number can address.
    #[error("document has too many pages: {0}")]
    TooManyPages(usize),
}

/// Reports how many pages a document has.
pub trait PageCounter {
    /// Number of pages in `bytes`.
    fn page_count(&self, bytes: &[u8]) -> std::result::Result<u32, PageCountError>;
}

/// Counts pages by parsing the document with lopdf.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfPageCounter;

impl PageCounter for LopdfPageCounter {
    fn page_count(&self, bytes: &[u8]) -> std::result::Result<u32, PageCountError> {
        if !bytes.starts_with(b"%PDF") {
            return Err(PageCountError::NotPdf);
        }
        let doc = Document::load_mem(bytes)?;
        let pages = doc.get_pages().len();
        u32::try_from(pages).map_err(|_| PageCountError::TooManyPages(pages))
    }
}

/// Expand one staged document using `counter`.
///
/// Returns the page count on success.
pub fn expand_document(
    store: &mut StagingStore,
    id: DocumentId,
    counter: &dyn PageCounter,
) -> Result<u32> {
    let document = store
        .document(id)
        .ok_or_else(|| StageError::unknown_item(id))?;

    if let Some(count) = document.page_count() {
        return Ok(count);
    }

    let count = counter
        .page_count(document.bytes())
        .map_err(|e| StageError::render_failure(document.name(), e.to_string()))?;

    store.expand_to_pages(id, count)?;
    Ok(count)
}

/// Expand every unexpanded document in the store.
///
/// Documents that cannot be counted are left whole; their failures are
/// returned so the caller can report them.
pub fn expand_all(store: &mut StagingStore, counter: &dyn PageCounter) -> Vec<StageError> {
    let pending: Vec<DocumentId> = store
        .documents()
        .filter(|doc| !doc.is_expanded())
        .map(|doc| doc.id())
        .collect();

    let mut failures = Vec::new();
    for id in pending {
        if let Err(e) = expand_document(store, id, counter) {
            warn!(%id, error = %e, "document left unexpanded");
            failures.push(e);
        }
    }
    failures
}

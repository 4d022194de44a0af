//! The staging model: documents, pages, and their display order.
//!
//! A [`StagingStore`] owns every staged [`Document`] and the ordered
//! sequence of visible items. In whole-document modes the items are
//! documents; in organize mode a document is expanded into its pages,
//! which may then be interleaved with pages of other documents.
//!
//! Display position is never stored. It is always the index of the item
//! in the sequence at the time of the read.

mod document;
mod mode;
mod store;

pub use document::{Document, DocumentId, DocumentKind};
pub use mode::StagingMode;
pub use store::{ItemDescriptor, Snapshot, StagingStore};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to one page of a staged document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRef {
    /// Owning document.
    pub document: DocumentId,
    /// 1-based page number within the original document.
    pub number: u32,
}

impl PageRef {
    /// Create a page reference.
    pub const fn new(document: DocumentId, number: u32) -> Self {
        Self { document, number }
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} of document {}", self.number, self.document)
    }
}

/// Reference to a staged item: a whole document or a single page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "ref", rename_all = "lowercase")]
pub enum ItemRef {
    /// A whole document.
    Document(DocumentId),
    /// A single page.
    Page(PageRef),
}

impl ItemRef {
    /// Document the item belongs to.
    pub fn document(&self) -> DocumentId {
        match self {
            Self::Document(id) => *id,
            Self::Page(page) => page.document,
        }
    }

    /// Page number, for page items.
    pub fn page_number(&self) -> Option<u32> {
        match self {
            Self::Document(_) => None,
            Self::Page(page) => Some(page.number),
        }
    }
}

impl From<DocumentId> for ItemRef {
    fn from(id: DocumentId) -> Self {
        Self::Document(id)
    }
}

impl From<PageRef> for ItemRef {
    fn from(page: PageRef) -> Self {
        Self::Page(page)
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document(id) => write!(f, "document {id}"),
            Self::Page(page) => page.fmt(f),
        }
    }
}

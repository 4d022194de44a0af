//! Document-processing collaborators.
//!
//! Reconstruction needs two stateless operations: extracting an ordered
//! list of pages from one document, and concatenating several documents.
//! They are modelled as the [`PageExtractionService`] and
//! [`DocumentMergeService`] traits, with two implementations:
//!
//! - [`HttpDocumentService`]: the remote processing service, over
//!   multipart HTTP.
//! - [`LocalDocumentService`]: the same operations in-process with lopdf.

pub mod http;
pub mod local;

pub use http::{HttpDocumentService, ServiceConfig, ServiceHealth};
pub use local::LocalDocumentService;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::ServiceError;

/// A document payload sent to a service.
#[derive(Debug, Clone)]
pub struct NamedDocument {
    /// File name reported to the service.
    pub name: String,
    /// Document content.
    pub bytes: Bytes,
}

impl NamedDocument {
    /// Create a named document.
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// A document returned by a service.
#[derive(Debug, Clone)]
pub struct ServiceOutput {
    /// Document content.
    pub bytes: Bytes,
    /// File name suggested by the service, if any.
    pub filename: Option<String>,
}

impl ServiceOutput {
    /// Output without a filename hint.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: None,
        }
    }

    /// Attach a filename hint.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Builds a new document from selected pages of a source document.
#[async_trait]
pub trait PageExtractionService: Send + Sync {
    /// Return a document holding exactly `pages` (1-based) of `document`,
    /// in that order. Pages may repeat.
    async fn extract_pages(
        &self,
        document: &NamedDocument,
        pages: &[u32],
    ) -> Result<ServiceOutput, ServiceError>;
}

/// Concatenates documents.
#[async_trait]
pub trait DocumentMergeService: Send + Sync {
    /// Return one document holding the pages of `documents` in order.
    async fn merge_documents(
        &self,
        documents: &[NamedDocument],
    ) -> Result<ServiceOutput, ServiceError>;
}

/// Encode a page list the way the services expect it: `"3,1,2"`.
pub fn format_page_order(pages: &[u32]) -> String {
    pages
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode a comma-separated page list.
///
/// Blank entries are ignored; anything else that is not a positive
/// integer is rejected.
pub fn parse_page_order(order: &str) -> Result<Vec<u32>, ServiceError> {
    order
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u32>()
                .map_err(|_| ServiceError::rejected(format!("Invalid page index: {part}")))
        })
        .collect()
}

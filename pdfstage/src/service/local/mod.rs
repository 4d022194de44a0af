//! In-process implementation of the document services.
//!
//! Mirrors the remote service's behaviour (duplicate pages allowed, empty
//! or out-of-range orders rejected with status 400) so either backend can
//! drive a reconstruction. lopdf work is synchronous and runs on tokio's
//! blocking pool.

mod merger;
mod pages;

pub use merger::Merger;
pub use pages::PageExtractor;

use async_trait::async_trait;
use bytes::Bytes;
use lopdf::Document;
use tracing::debug;

use super::{DocumentMergeService, NamedDocument, PageExtractionService, ServiceOutput};
use crate::error::ServiceError;

/// Filename hint for extraction results, as the remote service sends it.
pub const REORDERED_FILENAME: &str = "reordered.pdf";

/// Filename hint for merge results, as the remote service sends it.
pub const MERGED_FILENAME: &str = "merged.pdf";

/// Page extraction and merging with lopdf.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalDocumentService {
    extractor: PageExtractor,
    merger: Merger,
}

impl LocalDocumentService {
    /// Create a local service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract pages synchronously.
    pub fn extract_blocking(&self, bytes: &[u8], pages: &[u32]) -> Result<Vec<u8>, ServiceError> {
        let mut doc = Document::load_mem(bytes)?;
        self.extractor.extract_pages(&mut doc, pages)?;
        save(doc)
    }

    /// Merge documents synchronously.
    pub fn merge_blocking(&self, documents: &[Bytes]) -> Result<Vec<u8>, ServiceError> {
        let loaded = documents
            .iter()
            .map(|bytes| Document::load_mem(bytes))
            .collect::<Result<Vec<_>, _>>()?;
        let merged = self.merger.merge_documents(loaded)?;
        save(merged)
    }
}

fn save(mut doc: Document) -> Result<Vec<u8>, ServiceError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ServiceError::InvalidDocument(format!("Failed to save document: {e}")))?;
    Ok(buffer)
}

async fn run_blocking<F>(task: F) -> Result<Vec<u8>, ServiceError>
where
    F: FnOnce() -> Result<Vec<u8>, ServiceError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ServiceError::Task(e.to_string()))?
}

#[async_trait]
impl PageExtractionService for LocalDocumentService {
    async fn extract_pages(
        &self,
        document: &NamedDocument,
        pages: &[u32],
    ) -> Result<ServiceOutput, ServiceError> {
        debug!(document = %document.name, pages = pages.len(), "extracting pages locally");

        let service = *self;
        let bytes = document.bytes.clone();
        let pages = pages.to_vec();
        let output = run_blocking(move || service.extract_blocking(&bytes, &pages)).await?;

        Ok(ServiceOutput::new(output).with_filename(REORDERED_FILENAME))
    }
}

#[async_trait]
impl DocumentMergeService for LocalDocumentService {
    async fn merge_documents(
        &self,
        documents: &[NamedDocument],
    ) -> Result<ServiceOutput, ServiceError> {
        debug!(count = documents.len(), "merging locally");

        let service = *self;
        let payloads: Vec<Bytes> = documents.iter().map(|doc| doc.bytes.clone()).collect();
        let output = run_blocking(move || service.merge_blocking(&payloads)).await?;

        Ok(ServiceOutput::new(output).with_filename(MERGED_FILENAME))
    }
}

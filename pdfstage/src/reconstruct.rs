//! Order-preserving reconstruction.
//!
//! Batches are executed strictly one after another: each extraction
//! request is issued only after the previous one has answered, and the
//! first failure ends the run. When more than one batch produced output, a
//! single merge request stitches the pieces together in batch order.

use bytes::Bytes;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::{Result, StageError};
use crate::plan::{Batch, PageSelection};
use crate::service::{DocumentMergeService, NamedDocument, PageExtractionService};
use crate::utils::format_file_size;

/// Statistics about a reconstruction run.
#[derive(Debug, Clone, Default)]
pub struct ReconstructionStatistics {
    /// Number of batches executed.
    pub batches: usize,
    /// Number of extraction requests issued.
    pub extraction_requests: usize,
    /// Whether a merge request was issued.
    pub merge_requested: bool,
    /// Wall-clock time of the whole run.
    pub total_time: Duration,
    /// Size of the final document.
    pub output_size: u64,
}

impl ReconstructionStatistics {
    /// Format output size as human-readable string.
    pub fn format_output_size(&self) -> String {
        format_file_size(self.output_size)
    }
}

/// Final document of a reconstruction run.
#[derive(Debug, Clone)]
pub struct Reconstruction {
    /// Document content.
    pub bytes: Bytes,
    /// Filename suggested by the service, if any.
    pub filename: Option<String>,
    /// Run statistics.
    pub statistics: ReconstructionStatistics,
}

/// Runs batches against the extraction and merge services.
pub struct ReconstructionExecutor<'a> {
    extractor: &'a dyn PageExtractionService,
    merger: &'a dyn DocumentMergeService,
}

impl<'a> ReconstructionExecutor<'a> {
    /// Executor using separate extraction and merge services.
    pub fn new(
        extractor: &'a dyn PageExtractionService,
        merger: &'a dyn DocumentMergeService,
    ) -> Self {
        Self { extractor, merger }
    }

    /// Executor using one service for both operations.
    pub fn with_service<S>(service: &'a S) -> Self
    where
        S: PageExtractionService + DocumentMergeService,
    {
        Self::new(service, service)
    }

    /// Produce the final document for `batches`.
    ///
    /// # Errors
    ///
    /// - [`StageError::EmptySelection`] if `batches` is empty.
    /// - [`StageError::ExtractionFailed`] for the first batch whose
    ///   extraction fails; no later batch is requested and no merge is
    ///   attempted.
    /// - [`StageError::MergeFailed`] if the final merge fails.
    pub async fn execute(&self, batches: &[Batch]) -> Result<Reconstruction> {
        let start = Instant::now();
        if batches.is_empty() {
            return Err(StageError::EmptySelection);
        }

        info!(batches = batches.len(), "starting reconstruction");

        let mut statistics = ReconstructionStatistics {
            batches: batches.len(),
            ..Default::default()
        };
        let mut pieces = Vec::with_capacity(batches.len());

        for (index, batch) in batches.iter().enumerate() {
            let source = NamedDocument::new(batch.name.clone(), batch.bytes.clone());

            let (bytes, filename) = match &batch.selection {
                PageSelection::Whole => {
                    debug!(index, document = %batch.name, "forwarding whole document");
                    (source.bytes.clone(), None)
                }
                PageSelection::Pages(pages) => {
                    debug!(index, document = %batch.name, ?pages, "extracting batch");
                    statistics.extraction_requests += 1;
                    let output = self
                        .extractor
                        .extract_pages(&source, pages)
                        .await
                        .map_err(|e| StageError::extraction_failed(index, &batch.name, e))?;
                    (output.bytes, output.filename)
                }
            };

            pieces.push((NamedDocument::new(piece_name(index, &batch.name), bytes), filename));
        }

        let (bytes, filename) = if pieces.len() == 1 {
            let (piece, filename) = pieces.remove(0);
            (piece.bytes, filename)
        } else {
            let documents: Vec<NamedDocument> = pieces.into_iter().map(|(doc, _)| doc).collect();
            debug!(count = documents.len(), "merging batch outputs");
            statistics.merge_requested = true;
            let output = self
                .merger
                .merge_documents(&documents)
                .await
                .map_err(StageError::merge_failed)?;
            (output.bytes, output.filename)
        };

        statistics.output_size = bytes.len() as u64;
        statistics.total_time = start.elapsed();

        info!(
            extraction_requests = statistics.extraction_requests,
            merged = statistics.merge_requested,
            size = %statistics.format_output_size(),
            "reconstruction complete"
        );

        Ok(Reconstruction {
            bytes,
            filename,
            statistics,
        })
    }
}

/// Name for the intermediate document of batch `index`.
fn piece_name(index: usize, source: &str) -> String {
    let stem = source.strip_suffix(".pdf").unwrap_or(source);
    format!("{:03}_{stem}.pdf", index + 1)
}

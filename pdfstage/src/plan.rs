//! Batch planning.
//!
//! A plan splits the included items of a [`Snapshot`] into maximal runs
//! that come from the same source document. Each run becomes one
//! extraction request, so the number of requests is the smallest that can
//! reproduce the display order.

use bytes::Bytes;
use serde::Serialize;

use crate::error::{Result, StageError};
use crate::staging::{DocumentId, Snapshot};

/// Pages of a source document taken by one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSelection {
    /// The whole document, unchanged.
    Whole,
    /// These 1-based pages, in this order. May repeat or descend.
    Pages(Vec<u32>),
}

/// One extraction request: a run of pages from a single document.
#[derive(Debug, Clone, Serialize)]
pub struct Batch {
    /// Source document.
    pub document: DocumentId,
    /// Display name of the source document.
    pub name: String,
    /// Shared handle to the source bytes.
    #[serde(skip)]
    pub bytes: Bytes,
    /// Pages taken from the source.
    pub selection: PageSelection,
}

impl Batch {
    /// Number of pages in the batch, if known.
    pub fn page_count(&self) -> Option<usize> {
        match &self.selection {
            PageSelection::Whole => None,
            PageSelection::Pages(pages) => Some(pages.len()),
        }
    }

    /// Whether the batch forwards the whole document.
    pub fn is_whole(&self) -> bool {
        self.selection == PageSelection::Whole
    }
}

/// Computes batches from a snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchPlanner;

impl BatchPlanner {
    /// Create a planner.
    pub fn new() -> Self {
        Self
    }

    /// Split the included items of `snapshot` into batches.
    ///
    /// Fails with [`StageError::EmptySelection`] if nothing is included.
    pub fn plan(&self, snapshot: &Snapshot) -> Result<Vec<Batch>> {
        let mut batches: Vec<Batch> = Vec::new();

        for item in snapshot.included() {
            let Some(number) = item.page else {
                batches.push(Batch {
                    document: item.document,
                    name: item.name.clone(),
                    bytes: item.bytes.clone(),
                    selection: PageSelection::Whole,
                });
                continue;
            };

            if let Some(current) = batches.last_mut()
                && current.document == item.document
                && let PageSelection::Pages(pages) = &mut current.selection
            {
                pages.push(number);
                continue;
            }

            batches.push(Batch {
                document: item.document,
                name: item.name.clone(),
                bytes: item.bytes.clone(),
                selection: PageSelection::Pages(vec![number]),
            });
        }

        if batches.is_empty() {
            return Err(StageError::EmptySelection);
        }

        Ok(batches)
    }
}

/// Plan with a default [`BatchPlanner`].
pub fn plan(snapshot: &Snapshot) -> Result<Vec<Batch>> {
    BatchPlanner::new().plan(snapshot)
}

//! pdfstage - Stage, reorder, and reconstruct PDF pages.
//!
//! Documents are staged into a [`StagingStore`]. In organize mode each PDF
//! is expanded into its pages, which can be interleaved, reordered and
//! excluded freely. The final document is rebuilt through a document
//! service: the display order is split into the fewest possible batches
//! of pages from the same source, each batch is extracted in order, and
//! the pieces are merged.
//!
//! The service can be a remote HTTP backend ([`service::HttpDocumentService`])
//! or the in-process [`service::LocalDocumentService`] built on `lopdf`.
//!
//! # Examples
//!
//! ## Reorder pages across two documents
//!
//! ```no_run
//! use pdfstage::{
//!     BatchPlanner, RearrangementController, ReconstructionExecutor, StagingMode,
//!     StagingStore,
//! };
//! use pdfstage::render::{LopdfPageCounter, expand_all};
//! use pdfstage::service::LocalDocumentService;
//! use pdfstage::staging::{DocumentKind, PageRef};
//!
//! # async fn example(a: Vec<u8>, b: Vec<u8>) -> pdfstage::Result<()> {
//! let mut store = StagingStore::new(StagingMode::Organize);
//! let first = store.add_document(a, "a.pdf", DocumentKind::Pdf)?;
//! let second = store.add_document(b, "b.pdf", DocumentKind::Pdf)?;
//! expand_all(&mut store, &LopdfPageCounter);
//!
//! RearrangementController::new(&mut store).arrange(&[
//!     PageRef::new(second, 1),
//!     PageRef::new(first, 2),
//!     PageRef::new(first, 1),
//! ])?;
//!
//! let batches = BatchPlanner::new().plan(&store.snapshot_order())?;
//! let service = LocalDocumentService::new();
//! let result = ReconstructionExecutor::with_service(&service)
//!     .execute(&batches)
//!     .await?;
//! println!("{} bytes", result.bytes.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Plan only
//!
//! ```
//! use pdfstage::{BatchPlanner, StagingMode, StagingStore};
//! use pdfstage::staging::{DocumentKind, PageRef};
//!
//! let mut store = StagingStore::new(StagingMode::Organize);
//! let id = store
//!     .add_document(&b"%PDF-1.7"[..], "a.pdf", DocumentKind::Pdf)
//!     .unwrap();
//! store.expand_to_pages(id, 3).unwrap();
//! store.set_inclusion(PageRef::new(id, 2), false).unwrap();
//!
//! let batches = BatchPlanner::new().plan(&store.snapshot_order()).unwrap();
//! assert_eq!(batches.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod io;
pub mod output;
pub mod plan;
pub mod rearrange;
pub mod reconstruct;
pub mod render;
pub mod service;
pub mod staging;
pub mod utils;
pub mod validation;

pub use config::Config;
pub use error::{Result, ServiceError, StageError};
pub use plan::{Batch, BatchPlanner, PageSelection};
pub use rearrange::RearrangementController;
pub use reconstruct::{Reconstruction, ReconstructionExecutor};
pub use staging::{StagingMode, StagingStore};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

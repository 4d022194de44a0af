//! Error types for pdfstage.
//!
//! Errors fall into three groups:
//!
//! - **Intake errors**: a file does not match the staging mode, is empty,
//!   or exceeds the configured limits. These are recoverable; the item is
//!   simply not staged.
//! - **Staging errors**: an operation referenced an item or position that
//!   does not exist, or nothing is selected for reconstruction.
//! - **Service errors**: the document-processing service rejected or failed
//!   a request. These abort a reconstruction run but never modify the
//!   staged sequence, so the run can be retried as-is.

use std::io;
use std::path::PathBuf;

use crate::staging::{DocumentKind, ItemRef, StagingMode};

/// Result type alias for pdfstage operations.
pub type Result<T> = std::result::Result<T, StageError>;

/// Main error type for pdfstage operations.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The file kind is not accepted by the active staging mode.
    #[error("Unsupported file for {mode} mode: {name} ({kind})\n  Hint: {mode} mode accepts {accepted} files")]
    UnsupportedKind {
        /// Display name of the rejected file.
        name: String,
        /// Declared kind of the rejected file.
        kind: DocumentKind,
        /// Mode that rejected it.
        mode: StagingMode,
        /// Kind the mode accepts.
        accepted: DocumentKind,
    },

    /// No staged item is marked as included.
    #[error("No pages selected\n  Include at least one page before reconstructing")]
    EmptySelection,

    /// The extraction request for one batch failed.
    #[error("Page extraction failed for batch {batch_index} ({document})\n  Reason: {source}")]
    ExtractionFailed {
        /// Zero-based index of the failing batch.
        batch_index: usize,
        /// Display name of the batch's source document.
        document: String,
        /// Error reported by the service.
        #[source]
        source: ServiceError,
    },

    /// The final merge request failed.
    #[error("Merge request failed\n  Reason: {source}")]
    MergeFailed {
        /// Error reported by the service.
        #[source]
        source: ServiceError,
    },

    /// Page count or preview could not be produced for a document.
    #[error("Could not render {name}\n  Reason: {reason}")]
    RenderFailure {
        /// Display name of the document.
        name: String,
        /// Why rendering failed.
        reason: String,
    },

    /// An operation referenced an item that is not staged.
    #[error("Item is not staged: {item}")]
    UnknownItem {
        /// The missing item.
        item: ItemRef,
    },

    /// A move target lies outside the staged sequence.
    #[error("Position {position} is out of range (sequence has {len} item(s))")]
    PositionOutOfRange {
        /// Requested position.
        position: usize,
        /// Sequence length at the time of the request.
        len: usize,
    },

    /// The file exceeds the configured size limit.
    #[error("File too large: {name} ({size} bytes)\n  Maximum size is {limit} bytes")]
    FileTooLarge {
        /// Display name of the file.
        name: String,
        /// File size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },

    /// The file has no content.
    #[error("Empty file: {name}")]
    EmptyFile {
        /// Display name of the file.
        name: String,
    },

    /// More files were supplied than the configured limit allows.
    #[error("Too many files: {count}\n  Maximum is {limit} files")]
    TooManyFiles {
        /// Number of files supplied.
        count: usize,
        /// Configured limit.
        limit: usize,
    },

    /// Input file was not found.
    #[error("File not found: {}", .path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Input path exists but is not a regular file.
    #[error("Not a file: {}", .path.display())]
    NotAFile {
        /// Offending path.
        path: PathBuf,
    },

    /// Input file could not be read.
    #[error("Failed to read file: {}\n  Reason: {source}", .path.display())]
    FailedToRead {
        /// Path being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Output file could not be written.
    #[error("Failed to write output file: {}\n  Reason: {source}", .path.display())]
    FailedToWrite {
        /// Path being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Output file already exists and overwrite is not allowed.
    #[error("Output file already exists: {}\n  Use --force to overwrite or choose a different output path", .path.display())]
    OutputExists {
        /// Path to the existing output file.
        path: PathBuf,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// A page arrangement could not be parsed or applied.
    #[error("Invalid page order: {reason}")]
    InvalidOrder {
        /// Why the arrangement was rejected.
        reason: String,
    },

    /// User cancelled the operation.
    #[error("Operation cancelled by user")]
    Cancelled,

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

/// Failure reported by a document-processing collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The service answered with a non-success status.
    #[error("service returned {status}: {message}")]
    Rejected {
        /// HTTP status code (400 for local rejections).
        status: u16,
        /// Human-readable message from the response body.
        message: String,
    },

    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A document could not be parsed or serialized.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// A background processing task did not complete.
    #[error("processing task failed: {0}")]
    Task(String),
}

impl ServiceError {
    /// Create a Rejected error with status 400, the status the service
    /// uses for every processing failure.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            status: 400,
            message: message.into(),
        }
    }

    /// HTTP status code, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<lopdf::Error> for ServiceError {
    fn from(err: lopdf::Error) -> Self {
        Self::InvalidDocument(err.to_string())
    }
}

impl From<anyhow::Error> for StageError {
    fn from(err: anyhow::Error) -> Self {
        Self::other(err.to_string())
    }
}

impl StageError {
    /// Create an ExtractionFailed error.
    pub fn extraction_failed(
        batch_index: usize,
        document: impl Into<String>,
        source: ServiceError,
    ) -> Self {
        Self::ExtractionFailed {
            batch_index,
            document: document.into(),
            source,
        }
    }

    /// Create a MergeFailed error.
    pub fn merge_failed(source: ServiceError) -> Self {
        Self::MergeFailed { source }
    }

    /// Create a RenderFailure error.
    pub fn render_failure(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RenderFailure {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an UnknownItem error.
    pub fn unknown_item(item: impl Into<ItemRef>) -> Self {
        Self::UnknownItem { item: item.into() }
    }

    /// Create a FileNotFound error.
    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }

    /// Create an OutputExists error.
    pub fn output_exists(path: PathBuf) -> Self {
        Self::OutputExists { path }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an InvalidOrder error.
    pub fn invalid_order(reason: impl Into<String>) -> Self {
        Self::InvalidOrder {
            reason: reason.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable.
    ///
    /// Recoverable errors reject a single item at intake or preview time;
    /// the caller reports them and carries on with the remaining items.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedKind { .. }
                | Self::FileTooLarge { .. }
                | Self::EmptyFile { .. }
                | Self::RenderFailure { .. }
        )
    }

    /// Check if this error came from the document-processing service.
    pub fn is_service_error(&self) -> bool {
        matches!(self, Self::ExtractionFailed { .. } | Self::MergeFailed { .. })
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnsupportedKind { .. } => 3,
            Self::EmptySelection => 1,
            Self::ExtractionFailed { .. } => 6,
            Self::MergeFailed { .. } => 6,
            Self::RenderFailure { .. } => 3,
            Self::UnknownItem { .. } => 1,
            Self::PositionOutOfRange { .. } => 1,
            Self::FileTooLarge { .. } => 3,
            Self::EmptyFile { .. } => 3,
            Self::TooManyFiles { .. } => 1,
            Self::FileNotFound { .. } => 2,
            Self::NotAFile { .. } => 2,
            Self::FailedToRead { .. } => 2,
            Self::FailedToWrite { .. } => 5,
            Self::OutputExists { .. } => 4,
            Self::InvalidConfig { .. } => 1,
            Self::InvalidOrder { .. } => 1,
            Self::Cancelled => 130,
            Self::Io(_) => 5,
            Self::Other { .. } => 1,
        }
    }
}

//! Intake validation for pdfstage.
//!
//! Files are checked before they are staged:
//! - the name is not empty and has a supported extension
//! - the payload is not empty
//! - the payload fits the configured size limit
//! - the number of files fits the configured count limit
//!
//! Document content is not inspected beyond the leading bytes used to
//! recognise files without an extension.
//!
//! # Examples
//!
//! ```
//! use pdfstage::config::IntakeLimits;
//! use pdfstage::staging::DocumentKind;
//! use pdfstage::validation::Validator;
//!
//! let validator = Validator::new(IntakeLimits::default());
//! let kind = validator.validate_source("scan.pdf", b"%PDF-1.7").unwrap();
//! assert_eq!(kind, DocumentKind::Pdf);
//! ```

use serde::{Deserialize, Serialize};

use crate::config::IntakeLimits;
use crate::error::{Result, StageError};
use crate::staging::DocumentKind;
use crate::utils::format_file_size;

/// Summary of intake validation for a set of files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    /// Number of files that passed validation.
    pub files_validated: usize,

    /// Number of files that failed validation.
    pub files_failed: usize,

    /// Total size of the accepted files in bytes.
    pub total_size: u64,
}

impl ValidationSummary {
    /// Record an accepted file.
    pub fn record_accepted(&mut self, size: u64) {
        self.files_validated += 1;
        self.total_size += size;
    }

    /// Record a rejected file.
    pub fn record_rejected(&mut self) {
        self.files_failed += 1;
    }

    /// Format the total file size as a human-readable string.
    pub fn format_total_size(&self) -> String {
        format_file_size(self.total_size)
    }
}

/// Validator for staged files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    limits: IntakeLimits,
}

impl Validator {
    /// Create a validator with the given limits.
    pub fn new(limits: IntakeLimits) -> Self {
        Self { limits }
    }

    /// Limits in effect.
    pub fn limits(&self) -> IntakeLimits {
        self.limits
    }

    /// Validate one file and report its kind.
    ///
    /// # Errors
    ///
    /// - [`StageError::InvalidConfig`] if the name is empty.
    /// - [`StageError::EmptyFile`] if there is no content.
    /// - [`StageError::FileTooLarge`] if the content exceeds the limit.
    /// - [`StageError::Other`] if the kind cannot be recognised.
    pub fn validate_source(&self, name: &str, content: &[u8]) -> Result<DocumentKind> {
        if name.trim().is_empty() {
            return Err(StageError::invalid_config("File name cannot be empty"));
        }

        if content.is_empty() {
            return Err(StageError::EmptyFile {
                name: name.to_string(),
            });
        }

        let size = content.len() as u64;
        if size > self.limits.max_file_size {
            return Err(StageError::FileTooLarge {
                name: name.to_string(),
                size,
                limit: self.limits.max_file_size,
            });
        }

        DocumentKind::detect(name, content).ok_or_else(|| {
            StageError::other(format!(
                "Unsupported file type: {name}\n  Supported: {}, {}",
                DocumentKind::Pdf.extensions().join(", "),
                DocumentKind::Image.extensions().join(", ")
            ))
        })
    }

    /// Check the number of files against the limit.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::TooManyFiles`] if `count` exceeds the limit,
    /// or [`StageError::InvalidConfig`] if it is zero.
    pub fn validate_count(&self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(StageError::invalid_config("No files provided"));
        }
        if count > self.limits.max_files {
            return Err(StageError::TooManyFiles {
                count,
                limit: self.limits.max_files,
            });
        }
        Ok(())
    }
}

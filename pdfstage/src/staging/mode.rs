//! Staging modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::DocumentKind;
use crate::error::StageError;

/// How staged items are arranged and what they accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagingMode {
    /// Whole documents, several at once, concatenated in display order.
    #[default]
    Merge,
    /// Individual pages from several documents, freely interleaved.
    Organize,
    /// A single whole document; adding another replaces it.
    Single,
}

impl StagingMode {
    /// Whether the unit of ordering is a page rather than a document.
    pub fn is_page_granular(self) -> bool {
        matches!(self, Self::Organize)
    }

    /// Whether more than one document may be staged at once.
    pub fn allows_multiple(self) -> bool {
        !matches!(self, Self::Single)
    }

    /// The document kind this mode accepts.
    pub fn accepted_kind(self) -> DocumentKind {
        DocumentKind::Pdf
    }

    /// Whether a document of `kind` may be staged in this mode.
    pub fn accepts(self, kind: DocumentKind) -> bool {
        kind == self.accepted_kind()
    }

    /// Lowercase name, as used on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Organize => "organize",
            Self::Single => "single",
        }
    }
}

impl FromStr for StagingMode {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "organize" | "organise" => Ok(Self::Organize),
            "single" => Ok(Self::Single),
            _ => Err(StageError::invalid_config(format!(
                "Invalid mode: {s}. Must be one of: merge, organize, single"
            ))),
        }
    }
}

impl fmt::Display for StagingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

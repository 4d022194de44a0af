//! Staged source documents and their identities.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Stable identity of a staged document.
///
/// Assigned from a monotonic insertion counter when the document is added.
/// It is unrelated to the document's display position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(u32);

impl DocumentId {
    /// Wrap a raw insertion index.
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Raw insertion index.
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Declared content kind of a staged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// A PDF document.
    Pdf,
    /// A raster image (JPEG, PNG, BMP, TIFF, GIF, WebP).
    Image,
}

const PDF_EXTENSIONS: &[&str] = &["pdf"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "gif", "webp"];

impl DocumentKind {
    /// Detect the kind of a file from its name, falling back to magic bytes.
    ///
    /// Returns `None` if neither the extension nor the content is recognised.
    pub fn detect(name: &str, content: &[u8]) -> Option<Self> {
        Self::from_extension(name).or_else(|| Self::from_magic(content))
    }

    /// Kind implied by the file extension alone.
    pub fn from_extension(name: &str) -> Option<Self> {
        let ext = Path::new(name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();

        if PDF_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Pdf)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else {
            None
        }
    }

    /// Kind implied by the leading bytes of the content.
    pub fn from_magic(content: &[u8]) -> Option<Self> {
        const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";
        const JPEG: &[u8] = b"\xff\xd8\xff";

        if content.starts_with(b"%PDF-") {
            Some(Self::Pdf)
        } else if content.starts_with(PNG) || content.starts_with(JPEG) {
            Some(Self::Image)
        } else {
            None
        }
    }

    /// File extensions accepted for this kind.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Pdf => PDF_EXTENSIONS,
            Self::Image => IMAGE_EXTENSIONS,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => f.write_str("PDF"),
            Self::Image => f.write_str("image"),
        }
    }
}

/// A staged source file.
///
/// The byte handle is owned by the staging store; snapshots and batches
/// hold cheap reference-counted clones of it rather than copies.
#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    name: String,
    kind: DocumentKind,
    bytes: Bytes,
    page_count: Option<u32>,
}

impl Document {
    pub(crate) fn new(id: DocumentId, name: String, kind: DocumentKind, bytes: Bytes) -> Self {
        Self {
            id,
            name,
            kind,
            bytes,
            page_count: None,
        }
    }

    /// Stable identity.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared content kind.
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Size of the content in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Shared handle to the content.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Number of pages, once the document has been expanded.
    pub fn page_count(&self) -> Option<u32> {
        self.page_count
    }

    /// Whether the document has been expanded into pages.
    pub fn is_expanded(&self) -> bool {
        self.page_count.is_some()
    }

    pub(crate) fn set_page_count(&mut self, count: u32) {
        self.page_count = Some(count);
    }
}

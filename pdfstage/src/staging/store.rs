//! Owned staging state.

use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use super::{Document, DocumentId, DocumentKind, ItemRef, PageRef, StagingMode};
use crate::error::{Result, StageError};

/// One slot of the staging sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    /// A whole, unexpanded document. Always included.
    Document(DocumentId),
    /// One page of an expanded document.
    Page { page: PageRef, included: bool },
}

impl Entry {
    fn item(&self) -> ItemRef {
        match *self {
            Self::Document(id) => ItemRef::Document(id),
            Self::Page { page, .. } => ItemRef::Page(page),
        }
    }

    fn document(&self) -> DocumentId {
        match *self {
            Self::Document(id) => id,
            Self::Page { page, .. } => page.document,
        }
    }

    fn included(&self) -> bool {
        match *self {
            Self::Document(_) => true,
            Self::Page { included, .. } => included,
        }
    }
}

/// The staged documents and their display order.
///
/// All mutation goes through `&mut self`, so a [`Snapshot`] taken with
/// [`snapshot_order`](Self::snapshot_order) is always a consistent view.
#[derive(Debug, Clone, Default)]
pub struct StagingStore {
    mode: StagingMode,
    documents: BTreeMap<DocumentId, Document>,
    sequence: Vec<Entry>,
    next_id: u32,
}

impl StagingStore {
    /// Create an empty store for the given mode.
    pub fn new(mode: StagingMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Discard everything and switch to a new mode.
    ///
    /// Document ids are not reused after a reset.
    pub fn reset(&mut self, mode: StagingMode) {
        debug!(%mode, dropped = self.documents.len(), "resetting staging store");
        self.mode = mode;
        self.documents.clear();
        self.sequence.clear();
    }

    /// Active staging mode.
    pub fn mode(&self) -> StagingMode {
        self.mode
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Number of visible items.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Look up a staged document.
    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.get(&id)
    }

    /// Staged documents in insertion order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Visible items in display order.
    pub fn items(&self) -> impl Iterator<Item = ItemRef> + '_ {
        self.sequence.iter().map(Entry::item)
    }

    /// Item currently displayed at `position`.
    pub fn item_at(&self, position: usize) -> Option<ItemRef> {
        self.sequence.get(position).map(Entry::item)
    }

    /// Current display position of an item.
    pub fn position_of(&self, item: ItemRef) -> Option<usize> {
        self.sequence.iter().position(|entry| entry.item() == item)
    }

    /// Whether an item takes part in reconstruction.
    pub fn is_included(&self, item: ItemRef) -> Option<bool> {
        self.position_of(item)
            .map(|position| self.sequence[position].included())
    }

    /// Number of items that take part in reconstruction.
    pub fn included_count(&self) -> usize {
        self.sequence.iter().filter(|entry| entry.included()).count()
    }

    /// Stage a new document.
    ///
    /// The document is appended at the end of the sequence. In
    /// [`StagingMode::Single`] it replaces whatever was staged before.
    pub fn add_document(
        &mut self,
        bytes: impl Into<Bytes>,
        name: impl Into<String>,
        kind: DocumentKind,
    ) -> Result<DocumentId> {
        let name = name.into();

        if !self.mode.accepts(kind) {
            return Err(StageError::UnsupportedKind {
                name,
                kind,
                mode: self.mode,
                accepted: self.mode.accepted_kind(),
            });
        }

        if !self.mode.allows_multiple() && !self.is_empty() {
            debug!(replaced = self.documents.len(), "replacing staged document");
            self.documents.clear();
            self.sequence.clear();
        }

        let id = DocumentId::new(self.next_id);
        self.next_id += 1;

        debug!(%id, %name, "staged document");
        self.documents
            .insert(id, Document::new(id, name, kind, bytes.into()));
        self.sequence.push(Entry::Document(id));

        Ok(id)
    }

    /// Replace a document's entry with one entry per page.
    ///
    /// The pages take the document's place in the sequence, in original
    /// order, all included. Calling this again for an expanded document
    /// does nothing.
    pub fn expand_to_pages(&mut self, id: DocumentId, page_count: u32) -> Result<()> {
        if !self.mode.is_page_granular() {
            return Err(StageError::invalid_config(format!(
                "pages can only be expanded in organize mode (current mode: {})",
                self.mode
            )));
        }

        let document = self
            .documents
            .get_mut(&id)
            .ok_or_else(|| StageError::unknown_item(id))?;

        if document.is_expanded() {
            return Ok(());
        }

        if page_count == 0 {
            return Err(StageError::render_failure(
                document.name(),
                "document has no pages",
            ));
        }

        let position = self
            .sequence
            .iter()
            .position(|entry| *entry == Entry::Document(id))
            .ok_or_else(|| StageError::unknown_item(id))?;

        document.set_page_count(page_count);

        let pages = (1..=page_count).map(|number| Entry::Page {
            page: PageRef::new(id, number),
            included: true,
        });
        self.sequence.splice(position..=position, pages);

        debug!(%id, page_count, "expanded document into pages");
        Ok(())
    }

    /// Remove a document or a single page.
    ///
    /// Removing a document removes all of its pages. Removing a page
    /// drops its document once no page of it remains. When the last item
    /// goes the store is empty again.
    pub fn remove_item(&mut self, item: ItemRef) -> Result<()> {
        let before = self.sequence.len();

        match item {
            ItemRef::Document(id) => {
                self.sequence.retain(|entry| entry.document() != id);
            }
            ItemRef::Page(page) => {
                self.sequence.retain(|entry| entry.item() != item);
                if !self
                    .sequence
                    .iter()
                    .any(|entry| entry.document() == page.document)
                {
                    self.documents.remove(&page.document);
                }
            }
        }

        if self.sequence.len() == before {
            return Err(StageError::unknown_item(item));
        }

        if let ItemRef::Document(id) = item {
            self.documents.remove(&id);
        }

        if self.sequence.is_empty() {
            self.documents.clear();
        }

        debug!(%item, remaining = self.sequence.len(), "removed staged item");
        Ok(())
    }

    /// Mark a page as included in or excluded from reconstruction.
    ///
    /// Whole-document modes have no page entries, so this does nothing
    /// there.
    pub fn set_inclusion(&mut self, page: PageRef, include: bool) -> Result<()> {
        if !self.mode.is_page_granular() {
            return Ok(());
        }

        let entry = self
            .sequence
            .iter_mut()
            .find(|entry| entry.item() == ItemRef::Page(page))
            .ok_or_else(|| StageError::unknown_item(page))?;

        if let Entry::Page { included, .. } = entry {
            *included = include;
        }
        Ok(())
    }

    /// Consistent view of the sequence for planning.
    pub fn snapshot_order(&self) -> Snapshot {
        let items = self
            .sequence
            .iter()
            .filter_map(|entry| {
                let document = self.documents.get(&entry.document())?;
                Some(ItemDescriptor {
                    item: entry.item(),
                    document: document.id(),
                    name: document.name().to_string(),
                    bytes: document.bytes().clone(),
                    page: entry.item().page_number(),
                    included: entry.included(),
                })
            })
            .collect();

        Snapshot {
            mode: self.mode,
            items,
        }
    }

    /// Move the entry at `from` so it ends up at `to`.
    pub(crate) fn relocate(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        let entry = self.sequence.remove(from);
        self.sequence.insert(to, entry);
    }
}

/// Description of one staged item at snapshot time.
#[derive(Debug, Clone, Serialize)]
pub struct ItemDescriptor {
    /// The item itself.
    pub item: ItemRef,
    /// Source document.
    pub document: DocumentId,
    /// Display name of the source document.
    pub name: String,
    /// Shared handle to the source document's bytes.
    #[serde(skip)]
    pub bytes: Bytes,
    /// Original page number, or `None` for a whole document.
    pub page: Option<u32>,
    /// Whether the item takes part in reconstruction.
    pub included: bool,
}

/// Read-only view of the staging sequence.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Mode the store was in when the snapshot was taken.
    pub mode: StagingMode,
    /// Items in display order.
    pub items: Vec<ItemDescriptor>,
}

impl Snapshot {
    /// Items that take part in reconstruction, in display order.
    pub fn included(&self) -> impl Iterator<Item = &ItemDescriptor> {
        self.items.iter().filter(|item| item.included)
    }

    /// Whether the snapshot has no items at all.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

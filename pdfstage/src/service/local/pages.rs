//! Page selection and reordering within one document.

use lopdf::{Document, Object, ObjectId};
use std::collections::HashSet;

use crate::error::ServiceError;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Builds documents from selected pages of a source document.
#[derive(Debug, Default, Clone, Copy)]
pub struct PageExtractor;

impl PageExtractor {
    /// Create a new page extractor.
    pub fn new() -> Self {
        Self
    }

    /// Rebuild `doc` so it holds exactly `order` (1-based), in that order.
    ///
    /// A page listed more than once is duplicated. Pages left out are
    /// dropped along with any objects only they referenced.
    ///
    /// # Errors
    ///
    /// Returns a rejection if `order` is empty or names a page the
    /// document does not have.
    pub fn extract_pages(&self, doc: &mut Document, order: &[u32]) -> Result<(), ServiceError> {
        if order.is_empty() {
            return Err(ServiceError::rejected("Order list is empty"));
        }

        let all_pages = doc.get_pages();
        let total = all_pages.len();

        let mut selected = Vec::with_capacity(order.len());
        for &number in order {
            let page_id = all_pages.get(&number).copied().ok_or_else(|| {
                ServiceError::rejected(format!("Page index {number} out of range 1..{total}"))
            })?;
            selected.push(page_id);
        }

        for &page_id in &selected {
            flatten_inherited(doc, page_id)?;
        }

        let mut used = HashSet::with_capacity(selected.len());
        let mut kids = Vec::with_capacity(selected.len());
        for page_id in selected {
            if used.insert(page_id) {
                kids.push(page_id);
            } else {
                let copy = doc.get_object(page_id)?.clone();
                kids.push(doc.add_object(copy));
            }
        }

        self.update_page_tree(doc, &kids)?;
        doc.prune_objects();

        Ok(())
    }

    /// Point the root page tree node at exactly `page_ids`.
    fn update_page_tree(&self, doc: &mut Document, page_ids: &[ObjectId]) -> Result<(), ServiceError> {
        let pages_id = root_pages_id(doc)?;

        for &page_id in page_ids {
            if let Object::Dictionary(page) = doc.get_object_mut(page_id)? {
                page.set("Parent", Object::Reference(pages_id));
            }
        }

        match doc.get_object_mut(pages_id)? {
            Object::Dictionary(dict) => {
                let kids = page_ids.iter().map(|&id| Object::Reference(id)).collect();
                dict.set("Kids", Object::Array(kids));
                dict.set("Count", Object::Integer(page_ids.len() as i64));
                Ok(())
            }
            _ => Err(ServiceError::InvalidDocument(
                "Pages object is not a dictionary".to_string(),
            )),
        }
    }
}

/// Object id of the document's root page tree node.
pub(crate) fn root_pages_id(doc: &Document) -> Result<ObjectId, ServiceError> {
    doc.catalog()?
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|e| ServiceError::InvalidDocument(format!("Failed to get pages reference: {e}")))
}

/// Copy attributes the page inherits from its ancestors onto the page
/// itself, so the page renders the same under any parent.
pub(crate) fn flatten_inherited(doc: &mut Document, page_id: ObjectId) -> Result<(), ServiceError> {
    let page = doc.get_dictionary(page_id)?;

    let mut inherited = Vec::new();
    for key in INHERITABLE {
        if page.has(key) {
            continue;
        }
        if let Some(value) = find_inherited(doc, page_id, key) {
            inherited.push((key, value));
        }
    }

    if inherited.is_empty() {
        return Ok(());
    }

    if let Object::Dictionary(page) = doc.get_object_mut(page_id)? {
        for (key, value) in inherited {
            page.set(key, value);
        }
    }
    Ok(())
}

/// Walk `Parent` links from `page_id` looking for `key`.
fn find_inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut visited = HashSet::new();
    let mut current = doc
        .get_dictionary(page_id)
        .ok()?
        .get(b"Parent")
        .and_then(Object::as_reference)
        .ok();

    while let Some(node_id) = current {
        if !visited.insert(node_id) {
            break;
        }
        let node = doc.get_dictionary(node_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        current = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    None
}

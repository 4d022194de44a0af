//! Concatenation of documents.

use lopdf::{Document, Object, ObjectId};

use super::pages::{flatten_inherited, root_pages_id};
use crate::error::ServiceError;

/// Appends the pages of several documents into one.
#[derive(Debug, Default, Clone, Copy)]
pub struct Merger;

impl Merger {
    /// Create a new merger.
    pub fn new() -> Self {
        Self
    }

    /// Concatenate `documents` in order.
    ///
    /// The first document is the base: its catalog, metadata, and page
    /// tree are kept. Pages of the remaining documents are appended to the
    /// base's root page tree node.
    pub fn merge_documents(&self, documents: Vec<Document>) -> Result<Document, ServiceError> {
        let mut documents = documents.into_iter();
        let mut merged = documents
            .next()
            .ok_or_else(|| ServiceError::rejected("No files provided"))?;
        let mut max_id = merged.max_id;

        for mut doc in documents {
            let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
            for &page_id in &page_ids {
                flatten_inherited(&mut doc, page_id)?;
            }

            doc.renumber_objects_with(max_id + 1);
            max_id = doc.max_id;

            // Renumbering rewrote the ids; collect them again.
            let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

            merged.objects.extend(doc.objects);
            merged.max_id = max_id;

            self.add_pages_to_tree(&mut merged, &page_ids)?;
        }

        merged.prune_objects();
        merged.renumber_objects();

        Ok(merged)
    }

    /// Append pages to the merged document's root page tree node.
    fn add_pages_to_tree(&self, merged: &mut Document, page_ids: &[ObjectId]) -> Result<(), ServiceError> {
        let pages_id = root_pages_id(merged)?;

        for &page_id in page_ids {
            if let Object::Dictionary(page) = merged.get_object_mut(page_id)? {
                page.set("Parent", Object::Reference(pages_id));
            }
        }

        let Object::Dictionary(dict) = merged.get_object_mut(pages_id)? else {
            return Err(ServiceError::InvalidDocument(
                "Pages object is not a dictionary".to_string(),
            ));
        };

        let Ok(Object::Array(kids)) = dict.get_mut(b"Kids") else {
            return Err(ServiceError::InvalidDocument(
                "Pages dictionary missing Kids array".to_string(),
            ));
        };
        kids.extend(page_ids.iter().map(|&id| Object::Reference(id)));

        let count = dict.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
        dict.set("Count", Object::Integer(count + page_ids.len() as i64));

        Ok(())
    }
}

//! Shared helpers for the integration tests.
//!
//! Test documents are generated with lopdf. Every page carries a `/Label`
//! integer of `tag * 100 + page`, so the order of pages in any output can
//! be read back without rendering.

use async_trait::async_trait;
use bytes::Bytes;
use lopdf::{Document, Object, Stream, dictionary};
use std::sync::Mutex;

use pdfstage::ServiceError;
use pdfstage::service::{
    DocumentMergeService, LocalDocumentService, NamedDocument, PageExtractionService,
    ServiceOutput,
};

/// A PDF with `pages` labelled pages.
pub fn labelled_pdf(tag: i64, pages: u32) -> Bytes {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (1..=pages)
        .map(|number| {
            let content = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content,
                "Label" => Object::Integer(tag * 100 + i64::from(number)),
            });
            Object::Reference(page_id)
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => i64::from(pages),
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    Bytes::from(buffer)
}

/// Page labels of `bytes`, in page order.
pub fn labels(bytes: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| {
            doc.get_dictionary(id)
                .unwrap()
                .get(b"Label")
                .unwrap()
                .as_i64()
                .unwrap()
        })
        .collect()
}

/// Label of page `page` of the document tagged `tag`.
pub fn label(tag: i64, page: u32) -> i64 {
    tag * 100 + i64::from(page)
}

/// A request seen by [`RecordingService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Extract { name: String, pages: Vec<u32> },
    Merge { names: Vec<String> },
}

/// In-process service that records every request.
///
/// The extraction request at index `fail_at` is rejected.
#[derive(Default)]
pub struct RecordingService {
    inner: LocalDocumentService,
    calls: Mutex<Vec<Call>>,
    fail_at: Option<usize>,
}

impl RecordingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(index: usize) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn extraction_calls(&self) -> Vec<(String, Vec<u32>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Extract { name, pages } => Some((name, pages)),
                Call::Merge { .. } => None,
            })
            .collect()
    }

    pub fn merge_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Merge { .. }))
            .count()
    }
}

#[async_trait]
impl PageExtractionService for RecordingService {
    async fn extract_pages(
        &self,
        document: &NamedDocument,
        pages: &[u32],
    ) -> Result<ServiceOutput, ServiceError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call::Extract {
                name: document.name.clone(),
                pages: pages.to_vec(),
            });
            calls
                .iter()
                .filter(|call| matches!(call, Call::Extract { .. }))
                .count()
                - 1
        };

        if self.fail_at == Some(index) {
            return Err(ServiceError::Rejected {
                status: 500,
                message: "extraction backend unavailable".to_string(),
            });
        }

        self.inner.extract_pages(document, pages).await
    }
}

#[async_trait]
impl DocumentMergeService for RecordingService {
    async fn merge_documents(
        &self,
        documents: &[NamedDocument],
    ) -> Result<ServiceOutput, ServiceError> {
        self.calls.lock().unwrap().push(Call::Merge {
            names: documents.iter().map(|d| d.name.clone()).collect(),
        });
        self.inner.merge_documents(documents).await
    }
}

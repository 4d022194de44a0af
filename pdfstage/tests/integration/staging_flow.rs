//! Staging from disk through to a written output file.

use tempfile::TempDir;

use pdfstage::config::IntakeLimits;
use pdfstage::io::{OutputWriter, SourceLoader};
use pdfstage::render::{LopdfPageCounter, expand_all};
use pdfstage::service::LocalDocumentService;
use pdfstage::staging::{DocumentKind, ItemRef, PageRef};
use pdfstage::validation::Validator;
use pdfstage::{
    BatchPlanner, RearrangementController, ReconstructionExecutor, StageError, StagingMode,
    StagingStore,
};

use crate::common::{label, labelled_pdf, labels};

#[tokio::test]
async fn test_stage_from_disk_and_write() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("first.pdf");
    let second = dir.path().join("second.pdf");
    std::fs::write(&first, labelled_pdf(1, 3)).unwrap();
    std::fs::write(&second, labelled_pdf(2, 2)).unwrap();

    let (results, stats) = SourceLoader::new()
        .load_all(&[first.clone(), second.clone()], 2)
        .await;
    assert_eq!(stats.success_count, 2);

    let validator = Validator::new(IntakeLimits::default());
    let mut store = StagingStore::new(StagingMode::Organize);
    let mut ids = Vec::new();
    for result in results {
        let file = result.unwrap();
        let kind = validator.validate_source(&file.name, &file.bytes).unwrap();
        ids.push(store.add_document(file.bytes, file.name, kind).unwrap());
    }
    assert!(expand_all(&mut store, &LopdfPageCounter).is_empty());
    assert_eq!(store.len(), 5);

    // Second document's last page to the front; drop page 2 of the first.
    let mut controller = RearrangementController::new(&mut store);
    controller
        .move_item(PageRef::new(ids[1], 2).into(), 0)
        .unwrap();
    store.remove_item(PageRef::new(ids[0], 2).into()).unwrap();

    let batches = BatchPlanner::new().plan(&store.snapshot_order()).unwrap();
    let service = LocalDocumentService::new();
    let result = ReconstructionExecutor::with_service(&service)
        .execute(&batches)
        .await
        .unwrap();

    let output = dir.path().join("out.pdf");
    let write_stats = OutputWriter::new()
        .write(&result.bytes, &output)
        .await
        .unwrap();
    assert_eq!(write_stats.file_size, result.bytes.len() as u64);

    let written = std::fs::read(&output).unwrap();
    assert_eq!(
        labels(&written),
        vec![label(2, 2), label(1, 1), label(1, 3), label(2, 1)]
    );
}

#[test]
fn test_intake_rejects_unsupported_files() {
    let validator = Validator::new(IntakeLimits::default());
    let mut store = StagingStore::new(StagingMode::Organize);

    let kind = validator
        .validate_source("photo.png", b"\x89PNG\r\n\x1a\n")
        .unwrap();
    assert_eq!(kind, DocumentKind::Image);

    let err = store
        .add_document(&b"\x89PNG\r\n\x1a\n"[..], "photo.png", kind)
        .unwrap_err();
    assert!(matches!(err, StageError::UnsupportedKind { .. }));
    assert!(err.is_recoverable());
    assert!(store.is_empty());
}

#[test]
fn test_unreadable_document_stays_whole() {
    let mut store = StagingStore::new(StagingMode::Organize);
    let good = store
        .add_document(labelled_pdf(1, 2), "good.pdf", DocumentKind::Pdf)
        .unwrap();
    let broken = store
        .add_document(&b"not a pdf"[..], "broken.pdf", DocumentKind::Pdf)
        .unwrap();

    let failures = expand_all(&mut store, &LopdfPageCounter);

    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], StageError::RenderFailure { .. }));
    let items: Vec<ItemRef> = store.items().collect();
    assert_eq!(
        items,
        vec![
            PageRef::new(good, 1).into(),
            PageRef::new(good, 2).into(),
            ItemRef::Document(broken),
        ]
    );
}

#[test]
fn test_single_mode_replaces_document() {
    let mut store = StagingStore::new(StagingMode::Single);
    store
        .add_document(labelled_pdf(1, 1), "a.pdf", DocumentKind::Pdf)
        .unwrap();
    let b = store
        .add_document(labelled_pdf(2, 1), "b.pdf", DocumentKind::Pdf)
        .unwrap();

    let snapshot = store.snapshot_order();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.items[0].document, b);
}

#[test]
fn test_snapshot_serializes_for_display() {
    let mut store = StagingStore::new(StagingMode::Organize);
    let id = store
        .add_document(labelled_pdf(1, 2), "a.pdf", DocumentKind::Pdf)
        .unwrap();
    store.expand_to_pages(id, 2).unwrap();
    store.set_inclusion(PageRef::new(id, 2), false).unwrap();

    let value = serde_json::to_value(store.snapshot_order()).unwrap();

    assert_eq!(value["mode"], "organize");
    assert_eq!(value["items"][0]["item"]["type"], "page");
    assert_eq!(value["items"][0]["item"]["ref"]["number"], 1);
    assert_eq!(value["items"][1]["included"], false);
    assert!(value["items"][0].get("bytes").is_none());
}

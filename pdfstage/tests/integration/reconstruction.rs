//! End-to-end reconstruction: staging, planning, and execution against
//! the in-process service.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use pdfstage::render::{LopdfPageCounter, expand_all};
use pdfstage::staging::{DocumentId, DocumentKind, PageRef};
use pdfstage::{
    BatchPlanner, RearrangementController, ReconstructionExecutor, StageError, StagingMode,
    StagingStore,
};

use crate::common::{RecordingService, label, labelled_pdf, labels};

/// Organize-mode store with one expanded document per entry of `pages`.
/// Document `i` is tagged `i + 1` and named `doc{i + 1}.pdf`.
fn organize(pages: &[u32]) -> (StagingStore, Vec<DocumentId>) {
    let mut store = StagingStore::new(StagingMode::Organize);
    let ids = pages
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            let tag = i as i64 + 1;
            store
                .add_document(
                    labelled_pdf(tag, count),
                    format!("doc{tag}.pdf"),
                    DocumentKind::Pdf,
                )
                .unwrap()
        })
        .collect();

    assert!(expand_all(&mut store, &LopdfPageCounter).is_empty());
    (store, ids)
}

fn tag_of(ids: &[DocumentId], id: DocumentId) -> i64 {
    ids.iter().position(|&d| d == id).unwrap() as i64 + 1
}

#[tokio::test]
async fn test_shuffled_order_is_preserved() {
    let (mut store, ids) = organize(&[4, 3, 5]);

    let mut order: Vec<PageRef> = store
        .items()
        .filter_map(|item| match item {
            pdfstage::staging::ItemRef::Page(page) => Some(page),
            pdfstage::staging::ItemRef::Document(_) => None,
        })
        .collect();
    let mut rng = StdRng::seed_from_u64(0x5eed);
    order.shuffle(&mut rng);
    order.truncate(9);

    RearrangementController::new(&mut store)
        .arrange(&order)
        .unwrap();

    let batches = BatchPlanner::new().plan(&store.snapshot_order()).unwrap();
    let service = RecordingService::new();
    let result = ReconstructionExecutor::with_service(&service)
        .execute(&batches)
        .await
        .unwrap();

    let expected: Vec<i64> = order
        .iter()
        .map(|page| label(tag_of(&ids, page.document), page.number))
        .collect();
    assert_eq!(labels(&result.bytes), expected);

    assert_eq!(service.extraction_calls().len(), batches.len());
    assert_eq!(service.merge_count(), usize::from(batches.len() > 1));
    assert_eq!(result.statistics.extraction_requests, batches.len());
}

#[tokio::test]
async fn test_interleaved_runs_are_minimal() {
    let (mut store, ids) = organize(&[5, 2]);
    let (a, b) = (ids[0], ids[1]);

    RearrangementController::new(&mut store)
        .arrange(&[
            PageRef::new(a, 1),
            PageRef::new(a, 3),
            PageRef::new(b, 2),
            PageRef::new(a, 5),
        ])
        .unwrap();

    let batches = BatchPlanner::new().plan(&store.snapshot_order()).unwrap();
    assert_eq!(batches.len(), 3);

    let service = RecordingService::new();
    let result = ReconstructionExecutor::with_service(&service)
        .execute(&batches)
        .await
        .unwrap();

    assert_eq!(
        service.extraction_calls(),
        vec![
            ("doc1.pdf".to_string(), vec![1, 3]),
            ("doc2.pdf".to_string(), vec![2]),
            ("doc1.pdf".to_string(), vec![5]),
        ]
    );
    assert_eq!(service.merge_count(), 1);
    assert_eq!(
        labels(&result.bytes),
        vec![label(1, 1), label(1, 3), label(2, 2), label(1, 5)]
    );
}

#[tokio::test]
async fn test_single_batch_skips_merge() {
    let (mut store, ids) = organize(&[4]);
    let a = ids[0];

    RearrangementController::new(&mut store)
        .arrange(&[PageRef::new(a, 4), PageRef::new(a, 2), PageRef::new(a, 1)])
        .unwrap();

    let batches = BatchPlanner::new().plan(&store.snapshot_order()).unwrap();
    let service = RecordingService::new();
    let result = ReconstructionExecutor::with_service(&service)
        .execute(&batches)
        .await
        .unwrap();

    assert_eq!(service.merge_count(), 0);
    assert!(!result.statistics.merge_requested);
    assert_eq!(result.filename.as_deref(), Some("reordered.pdf"));
    assert_eq!(
        labels(&result.bytes),
        vec![label(1, 4), label(1, 2), label(1, 1)]
    );
}

#[tokio::test]
async fn test_failure_stops_remaining_batches() {
    let (mut store, ids) = organize(&[2, 2, 2]);

    RearrangementController::new(&mut store)
        .arrange(&[
            PageRef::new(ids[0], 1),
            PageRef::new(ids[1], 1),
            PageRef::new(ids[2], 1),
        ])
        .unwrap();

    let batches = BatchPlanner::new().plan(&store.snapshot_order()).unwrap();
    assert_eq!(batches.len(), 3);

    let service = RecordingService::failing_at(1);
    let err = ReconstructionExecutor::with_service(&service)
        .execute(&batches)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StageError::ExtractionFailed { batch_index: 1, .. }
    ));
    assert!(err.is_service_error());
    assert_eq!(service.extraction_calls().len(), 2);
    assert_eq!(service.merge_count(), 0);
}

#[tokio::test]
async fn test_merge_mode_forwards_whole_documents() {
    let mut store = StagingStore::new(StagingMode::Merge);
    store
        .add_document(labelled_pdf(1, 2), "first.pdf", DocumentKind::Pdf)
        .unwrap();
    store
        .add_document(labelled_pdf(2, 3), "second.pdf", DocumentKind::Pdf)
        .unwrap();

    let batches = BatchPlanner::new().plan(&store.snapshot_order()).unwrap();
    let service = RecordingService::new();
    let result = ReconstructionExecutor::with_service(&service)
        .execute(&batches)
        .await
        .unwrap();

    assert!(service.extraction_calls().is_empty());
    assert_eq!(service.merge_count(), 1);
    assert_eq!(result.filename.as_deref(), Some("merged.pdf"));
    assert_eq!(
        labels(&result.bytes),
        vec![label(1, 1), label(1, 2), label(2, 1), label(2, 2), label(2, 3)]
    );
}

#[tokio::test]
async fn test_excluding_everything_is_rejected() {
    let (mut store, ids) = organize(&[2]);
    for number in 1..=2 {
        store
            .set_inclusion(PageRef::new(ids[0], number), false)
            .unwrap();
    }

    let err = BatchPlanner::new()
        .plan(&store.snapshot_order())
        .unwrap_err();
    assert!(matches!(err, StageError::EmptySelection));
}

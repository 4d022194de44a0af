//! HTTP client against a stub service speaking the same multipart
//! protocol as the real backend.

use axum::Router;
use axum::extract::Multipart;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use bytes::Bytes;
use serde_json::json;
use std::time::Duration;
use tokio::net::TcpListener;

use pdfstage::service::http::LEGACY_API_PREFIX;
use pdfstage::service::{
    DocumentMergeService, HttpDocumentService, LocalDocumentService, NamedDocument,
    PageExtractionService, ServiceConfig, parse_page_order,
};
use pdfstage::staging::{DocumentKind, PageRef};
use pdfstage::{
    BatchPlanner, RearrangementController, ReconstructionExecutor, ServiceError, StageError,
    StagingMode, StagingStore,
};

use crate::common::{label, labelled_pdf, labels};

fn rejected(status: StatusCode, detail: impl Into<String>) -> Response {
    (status, axum::Json(json!({ "detail": detail.into() }))).into_response()
}

fn pdf_response(bytes: Vec<u8>, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Read one uploaded PDF part, checking its metadata.
async fn pdf_field(field: axum::extract::multipart::Field<'_>) -> Result<Bytes, Response> {
    if field.file_name().is_none_or(str::is_empty) {
        return Err(rejected(StatusCode::BAD_REQUEST, "Missing file name"));
    }
    if field.content_type() != Some("application/pdf") {
        return Err(rejected(StatusCode::BAD_REQUEST, "Only PDF files are accepted"));
    }
    field
        .bytes()
        .await
        .map_err(|e| rejected(StatusCode::BAD_REQUEST, e.to_string()))
}

async fn reorder(mut multipart: Multipart) -> Response {
    let mut file = None;
    let mut order = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => match pdf_field(field).await {
                Ok(bytes) => file = Some(bytes),
                Err(response) => return response,
            },
            Some("order") => order = field.text().await.ok(),
            _ => {}
        }
    }

    let (Some(file), Some(order)) = (file, order) else {
        return rejected(StatusCode::UNPROCESSABLE_ENTITY, "file and order are required");
    };
    let pages = match parse_page_order(&order) {
        Ok(pages) => pages,
        Err(e) => return rejected(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match LocalDocumentService::new().extract_blocking(&file, &pages) {
        Ok(bytes) => pdf_response(bytes, "reordered.pdf"),
        Err(ServiceError::Rejected { message, .. }) => {
            rejected(StatusCode::BAD_REQUEST, message)
        }
        Err(e) => rejected(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn merge(mut multipart: Multipart) -> Response {
    let mut files = Vec::new();

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_owned);
        if name.as_deref() == Some("files") {
            match pdf_field(field).await {
                Ok(bytes) => files.push(bytes),
                Err(response) => return response,
            }
        }
    }

    match LocalDocumentService::new().merge_blocking(&files) {
        Ok(bytes) => pdf_response(bytes, "merged.pdf"),
        Err(ServiceError::Rejected { message, .. }) => {
            rejected(StatusCode::BAD_REQUEST, message)
        }
        Err(e) => rejected(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn status() -> impl IntoResponse {
    axum::Json(json!({
        "status": "healthy",
        "version": "2.1.0",
        "timestamp": "2024-05-01T12:00:00",
        "checks": { "pdf_processing": "ok" }
    }))
}

/// Start the stub on an ephemeral port and return its base URL.
async fn spawn_stub() -> String {
    let app = Router::new()
        .route("/api/v1/pdf/reorder", post(reorder))
        .route("/api/v1/pdf/merge", post(merge))
        .route("/api/status", get(status));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

async fn client() -> HttpDocumentService {
    HttpDocumentService::new(ServiceConfig::new(spawn_stub().await)).unwrap()
}

#[tokio::test]
async fn test_extract_pages_over_http() {
    let service = client().await;
    let document = NamedDocument::new("scan.pdf", labelled_pdf(1, 4));

    let output = service.extract_pages(&document, &[3, 1, 4]).await.unwrap();

    assert_eq!(output.filename.as_deref(), Some("reordered.pdf"));
    assert_eq!(labels(&output.bytes), vec![label(1, 3), label(1, 1), label(1, 4)]);
}

#[tokio::test]
async fn test_extract_out_of_range_reports_detail() {
    let service = client().await;
    let document = NamedDocument::new("scan.pdf", labelled_pdf(1, 3));

    let err = service.extract_pages(&document, &[9]).await.unwrap_err();

    match err {
        ServiceError::Rejected { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Page index 9 out of range 1..3");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_merge_over_http() {
    let service = client().await;
    let documents = vec![
        NamedDocument::new("001_a.pdf", labelled_pdf(1, 2)),
        NamedDocument::new("002_b.pdf", labelled_pdf(2, 1)),
    ];

    let output = service.merge_documents(&documents).await.unwrap();

    assert_eq!(output.filename.as_deref(), Some("merged.pdf"));
    assert_eq!(labels(&output.bytes), vec![label(1, 1), label(1, 2), label(2, 1)]);
}

#[tokio::test]
async fn test_status_over_http() {
    let service = client().await;

    let health = service.status().await.unwrap();

    assert!(health.is_healthy());
    assert_eq!(health.version, "2.1.0");
    assert!(health.checks.contains_key("pdf_processing"));
}

#[tokio::test]
async fn test_wrong_prefix_is_rejected() {
    let config = ServiceConfig {
        api_prefix: LEGACY_API_PREFIX.to_string(),
        ..ServiceConfig::new(spawn_stub().await)
    };
    let service = HttpDocumentService::new(config).unwrap();
    let document = NamedDocument::new("scan.pdf", labelled_pdf(1, 1));

    let err = service.extract_pages(&document, &[1]).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_unreachable_service() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ServiceConfig {
        timeout: Duration::from_secs(5),
        ..ServiceConfig::new(format!("http://{addr}"))
    };
    let service = HttpDocumentService::new(config).unwrap();

    let err = service.status().await.unwrap_err();
    assert!(matches!(err, ServiceError::Transport(_)));
}

#[tokio::test]
async fn test_reconstruction_over_http() {
    let service = client().await;

    let mut store = StagingStore::new(StagingMode::Organize);
    let a = store
        .add_document(labelled_pdf(1, 3), "a.pdf", DocumentKind::Pdf)
        .unwrap();
    let b = store
        .add_document(labelled_pdf(2, 2), "b.pdf", DocumentKind::Pdf)
        .unwrap();
    store.expand_to_pages(a, 3).unwrap();
    store.expand_to_pages(b, 2).unwrap();

    RearrangementController::new(&mut store)
        .arrange(&[
            PageRef::new(b, 2),
            PageRef::new(a, 3),
            PageRef::new(a, 1),
            PageRef::new(b, 1),
        ])
        .unwrap();

    let batches = BatchPlanner::new().plan(&store.snapshot_order()).unwrap();
    let result = ReconstructionExecutor::with_service(&service)
        .execute(&batches)
        .await
        .unwrap();

    assert_eq!(result.statistics.extraction_requests, 3);
    assert!(result.statistics.merge_requested);
    assert_eq!(
        labels(&result.bytes),
        vec![label(2, 2), label(1, 3), label(1, 1), label(2, 1)]
    );
}

#[tokio::test]
async fn test_reconstruction_reports_failing_batch() {
    let service = client().await;

    let mut store = StagingStore::new(StagingMode::Organize);
    let a = store
        .add_document(labelled_pdf(1, 2), "a.pdf", DocumentKind::Pdf)
        .unwrap();
    // Claims more pages than the file has, so the service rejects page 3.
    store.expand_to_pages(a, 3).unwrap();
    store.set_inclusion(PageRef::new(a, 1), false).unwrap();

    let batches = BatchPlanner::new().plan(&store.snapshot_order()).unwrap();
    let err = ReconstructionExecutor::with_service(&service)
        .execute(&batches)
        .await
        .unwrap_err();

    match err {
        StageError::ExtractionFailed {
            batch_index,
            document,
            source,
        } => {
            assert_eq!(batch_index, 0);
            assert_eq!(document, "a.pdf");
            assert_eq!(source.status(), Some(400));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

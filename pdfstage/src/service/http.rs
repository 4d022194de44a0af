//! Client for the remote document-processing service.
//!
//! Both operations are multipart `POST` requests answered with a binary
//! PDF. Failures come back as a non-success status with a JSON body
//! (`{"detail": ...}` or `{"message": ...}`) or plain text.

use async_trait::async_trait;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use super::{
    DocumentMergeService, NamedDocument, PageExtractionService, ServiceOutput, format_page_order,
};
use crate::error::ServiceError;

/// Default service location.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Current route prefix of the PDF endpoints.
pub const DEFAULT_API_PREFIX: &str = "/api/v1/pdf";

/// Route prefix used by older deployments.
pub const LEGACY_API_PREFIX: &str = "/api/pdf";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

const PDF_MIME: &str = "application/pdf";

/// Where and how to reach the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Scheme, host, and port, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Route prefix of the PDF endpoints.
    pub api_prefix: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ServiceConfig {
    /// Config for the service at `base_url`, with default prefix and timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Full URL of a PDF endpoint.
    pub fn endpoint(&self, operation: &str) -> String {
        let prefix = self.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("{}/{operation}", self.root())
        } else {
            format!("{}/{prefix}/{operation}", self.root())
        }
    }

    /// URL of the health endpoint.
    pub fn status_url(&self) -> String {
        format!("{}/api/status", self.root())
    }

    fn root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Health report returned by the service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceHealth {
    /// `"healthy"` or `"degraded"`.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Time the report was produced.
    pub timestamp: Option<String>,
    /// Per-component check results.
    pub checks: BTreeMap<String, serde_json::Value>,
}

impl ServiceHealth {
    /// Whether every check passed.
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
    message: Option<String>,
}

/// HTTP implementation of both service traits.
#[derive(Debug, Clone)]
pub struct HttpDocumentService {
    client: Client,
    config: ServiceConfig,
}

impl HttpDocumentService {
    /// Build a client for the configured service.
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Query the health endpoint.
    pub async fn status(&self) -> Result<ServiceHealth, ServiceError> {
        let url = self.config.status_url();
        debug!(%url, "checking service status");

        let response = self.client.get(&url).send().await?;
        let response = check_status(response).await?;
        let body = response.bytes().await?;

        serde_json::from_slice(&body)
            .map_err(|e| ServiceError::InvalidDocument(format!("malformed status response: {e}")))
    }

    async fn post(&self, operation: &str, form: Form) -> Result<ServiceOutput, ServiceError> {
        let url = self.config.endpoint(operation);
        let response = self.client.post(&url).multipart(form).send().await?;
        let response = check_status(response).await?;

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_disposition);
        let bytes = response.bytes().await?;

        debug!(%url, size = bytes.len(), ?filename, "service response received");
        Ok(ServiceOutput { bytes, filename })
    }
}

#[async_trait]
impl PageExtractionService for HttpDocumentService {
    async fn extract_pages(
        &self,
        document: &NamedDocument,
        pages: &[u32],
    ) -> Result<ServiceOutput, ServiceError> {
        let order = format_page_order(pages);
        debug!(document = %document.name, %order, "requesting page extraction");

        let form = Form::new()
            .part("file", pdf_part(document)?)
            .text("order", order);

        self.post("reorder", form).await
    }
}

#[async_trait]
impl DocumentMergeService for HttpDocumentService {
    async fn merge_documents(
        &self,
        documents: &[NamedDocument],
    ) -> Result<ServiceOutput, ServiceError> {
        debug!(count = documents.len(), "requesting merge");

        let mut form = Form::new();
        for document in documents {
            form = form.part("files", pdf_part(document)?);
        }

        self.post("merge", form).await
    }
}

fn pdf_part(document: &NamedDocument) -> Result<Part, ServiceError> {
    let length = document.bytes.len() as u64;
    let part = Part::stream_with_length(Body::from(document.bytes.clone()), length)
        .file_name(document.name.clone())
        .mime_str(PDF_MIME)?;
    Ok(part)
}

/// Turn a non-success response into [`ServiceError::Rejected`].
async fn check_status(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    let message = error_message(&body)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "unknown error".to_string());

    Err(ServiceError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// Human-readable message from an error response body.
fn error_message(body: &[u8]) -> Option<String> {
    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        match (parsed.detail, parsed.message) {
            (Some(serde_json::Value::String(detail)), _) => return Some(detail),
            (Some(detail), _) if !detail.is_null() => return Some(detail.to_string()),
            (_, Some(message)) => return Some(message),
            _ => {}
        }
    }

    let text = String::from_utf8_lossy(body).trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Extract the filename from a `Content-Disposition` header value.
///
/// `filename*` (RFC 5987) is preferred over `filename` when both appear.
pub fn parse_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in value.split(';').map(str::trim) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let raw = raw.trim();
                let name = raw.split_once("''").map_or(raw, |(_, name)| name);
                extended = Some(name.to_string());
            }
            "filename" => plain = Some(raw.trim().trim_matches('"').to_string()),
            _ => {}
        }
    }

    extended.or(plain).filter(|name| !name.is_empty())
}

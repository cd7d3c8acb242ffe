//! HTTP backend for a remote document-analysis service.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::AnalysisError;
use crate::{DocumentAnalyzer, RawFieldTree, Result};

/// Connection settings for [`HttpAnalyzer`].
#[derive(Debug, Clone)]
pub struct HttpAnalyzerOptions {
    /// Full URL of the analyze-document action.
    pub endpoint: String,
    /// Bearer token, if the service requires one.
    pub api_key: Option<String>,
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Number of document-type detections to request.
    pub max_classification_results: u32,
}

impl Default for HttpAnalyzerOptions {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/actions/analyzeDocument".to_string(),
            api_key: None,
            timeout: Duration::from_secs(120),
            max_classification_results: 5,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    document: InlineDocument,
    features: Vec<Feature<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineDocument {
    source: &'static str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Feature<'a> {
    feature_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_results: Option<u32>,
}

/// Backend calling the analysis service over HTTP.
///
/// Requests are blocking; async callers should run them on a blocking
/// thread.
#[derive(Debug, Clone)]
pub struct HttpAnalyzer {
    options: HttpAnalyzerOptions,
}

impl HttpAnalyzer {
    pub fn new(options: HttpAnalyzerOptions) -> Self {
        Self { options }
    }

    fn request_body(&self, document: &[u8]) -> AnalyzeRequest<'static> {
        AnalyzeRequest {
            document: InlineDocument {
                source: "INLINE",
                data: STANDARD.encode(document),
            },
            features: vec![
                Feature {
                    feature_type: "KEY_VALUE_EXTRACTION",
                    max_results: None,
                },
                Feature {
                    feature_type: "DOCUMENT_CLASSIFICATION",
                    max_results: Some(self.options.max_classification_results),
                },
            ],
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> AnalysisError {
        if e.is_timeout() {
            AnalysisError::Timeout(self.options.timeout.as_secs())
        } else if e.is_connect() {
            AnalysisError::Unreachable(e.to_string())
        } else {
            AnalysisError::Request(e.to_string())
        }
    }
}

impl DocumentAnalyzer for HttpAnalyzer {
    fn analyze(&self, document: &[u8]) -> Result<RawFieldTree> {
        if document.is_empty() {
            return Err(AnalysisError::EmptyDocument);
        }

        // Built per call so the client never outlives the blocking thread.
        let client = Client::builder()
            .timeout(self.options.timeout)
            .build()
            .map_err(|e| AnalysisError::Request(e.to_string()))?;

        let mut request = client
            .post(&self.options.endpoint)
            .json(&self.request_body(document));
        if let Some(key) = &self.options.api_key {
            request = request.bearer_auth(key);
        }

        info!(
            "Submitting {} byte document to {}",
            document.len(),
            self.options.endpoint
        );

        let response = request.send().map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().map_err(|e| self.transport_error(e))?;
        debug!("Analysis response: {} bytes", bytes.len());

        serde_json::from_slice(&bytes).map_err(|e| AnalysisError::InvalidResponse(e.to_string()))
    }

    fn name(&self) -> &str {
        "http"
    }
}

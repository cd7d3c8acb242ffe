//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Scalar invoice fields extracted by default, in output order.
pub const DEFAULT_SCALAR_FIELDS: [&str; 10] = [
    "VendorName",
    "VendorNameLogo",
    "InvoiceId",
    "InvoiceDate",
    "ShippingAddress",
    "BillingAddressRecipient",
    "AmountDue",
    "SubTotal",
    "ShippingCost",
    "InvoiceTotal",
];

/// Main configuration for invext.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvextConfig {
    /// Document-analysis service configuration.
    pub analysis: AnalysisConfig,

    /// Normalization and validity gate configuration.
    pub extraction: ExtractionConfig,

    /// Persistence configuration.
    pub store: StoreConfig,

    /// HTTP server configuration.
    pub server: ServerConfig,
}

/// Document-analysis service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// URL of the analyze-document endpoint.
    pub endpoint: String,

    /// Environment variable holding the service API key.
    pub api_key_env: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Number of document-type detections to request.
    pub max_classification_results: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/actions/analyzeDocument".to_string(),
            api_key_env: "INVEXT_ANALYSIS_KEY".to_string(),
            timeout_secs: 120,
            max_classification_results: 5,
        }
    }
}

impl AnalysisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// API key from the configured environment variable, if set.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Options for the HTTP analysis backend.
    #[cfg(feature = "http")]
    pub fn http_options(&self) -> invext_analysis::HttpAnalyzerOptions {
        invext_analysis::HttpAnalyzerOptions {
            endpoint: self.endpoint.clone(),
            api_key: self.api_key(),
            timeout: self.timeout(),
            max_classification_results: self.max_classification_results,
        }
    }
}

/// Normalization and validity gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Scalar fields copied into the invoice record, in output order.
    pub scalar_fields: Vec<String>,

    /// Minimum document classification confidence (0.0 - 1.0).
    pub min_document_confidence: f64,

    /// Keep line-item rows with no recognized sub-fields as all-null items.
    pub keep_empty_items: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            scalar_fields: DEFAULT_SCALAR_FIELDS.iter().map(|s| s.to_string()).collect(),
            min_document_confidence: 0.9,
            keep_empty_items: true,
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Persist accepted extractions.
    pub persist: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("invoices.db"),
            persist: true,
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub bind_addr: String,

    /// Largest accepted upload in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl InvextConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}

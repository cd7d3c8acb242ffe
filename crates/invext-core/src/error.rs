//! Error types for the invext-core library.

use thiserror::Error;

/// Main error type for the invext library.
#[derive(Error, Debug)]
pub enum InvextError {
    /// The document-analysis service failed.
    #[error("analysis error: {0}")]
    Analysis(#[from] invext_analysis::AnalysisError),

    /// The document was rejected by the validity gate.
    #[error("invalid document: {0}")]
    Rejected(#[from] ValidityError),

    /// Persistence error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Reasons the validity gate rejects a document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidityError {
    /// No document-type detection reached the threshold.
    #[error("document classification confidence {best:.2} is below {threshold:.2}")]
    LowConfidence { best: f64, threshold: f64 },
}

/// Errors related to invoice persistence.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite failure.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to encode or decode a JSON column.
    #[error("failed to encode column: {0}")]
    Encode(#[from] serde_json::Error),

    /// The connection mutex was poisoned by a panicking writer.
    #[error("database connection lock poisoned")]
    Poisoned,

    /// Failed to prepare the database location.
    #[error("failed to open database at {path}: {reason}")]
    Open { path: String, reason: String },
}

/// Result type for the invext library.
pub type Result<T> = std::result::Result<T, InvextError>;

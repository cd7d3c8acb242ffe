//! Error types for the analysis layer.

use thiserror::Error;

/// Errors that can occur while calling the document-analysis service.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The submitted document has no content.
    #[error("document is empty")]
    EmptyDocument,

    /// The service did not answer within the configured timeout.
    #[error("analysis request timed out after {0}s")]
    Timeout(u64),

    /// The service could not be reached.
    #[error("analysis service unreachable: {0}")]
    Unreachable(String),

    /// The service answered with a non-success status.
    #[error("analysis service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body is not a field tree.
    #[error("invalid analysis response: {0}")]
    InvalidResponse(String),

    /// Request could not be built or sent.
    #[error("analysis request failed: {0}")]
    Request(String),

    /// I/O error when loading fixture files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

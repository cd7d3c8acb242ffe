//! Analysis backend implementations.

pub mod fixture;

#[cfg(feature = "http")]
pub mod http;

use crate::{RawFieldTree, Result};

/// Trait for document-analysis backends.
///
/// A backend submits one document and returns the complete field tree, or
/// fails as a whole. There is no partial result and no retry.
pub trait DocumentAnalyzer: Send + Sync {
    /// Analyze the given document bytes.
    fn analyze(&self, document: &[u8]) -> Result<RawFieldTree>;

    /// Short backend name for logs.
    fn name(&self) -> &str;
}

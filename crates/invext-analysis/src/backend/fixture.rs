//! Backend that answers every document with a prepared tree.

use std::path::Path;

use tracing::debug;

use crate::error::AnalysisError;
use crate::{DocumentAnalyzer, RawFieldTree, Result};

/// Backend returning a fixed field tree, for offline runs and tests.
#[derive(Debug, Clone)]
pub struct FixtureAnalyzer {
    tree: RawFieldTree,
}

impl FixtureAnalyzer {
    pub fn new(tree: RawFieldTree) -> Self {
        Self { tree }
    }

    /// Load the tree from a JSON file in the service's response format.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading fixture tree from: {}", path.display());

        let content = std::fs::read_to_string(path)?;
        let tree = serde_json::from_str(&content)
            .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))?;

        Ok(Self { tree })
    }
}

impl DocumentAnalyzer for FixtureAnalyzer {
    fn analyze(&self, document: &[u8]) -> Result<RawFieldTree> {
        if document.is_empty() {
            return Err(AnalysisError::EmptyDocument);
        }
        Ok(self.tree.clone())
    }

    fn name(&self) -> &str {
        "fixture"
    }
}

//! Document-analysis abstraction layer for invext.
//!
//! This crate provides:
//! - The raw field tree returned by the analysis service, with lenient
//!   deserialization of its several equivalent shapes
//! - A `DocumentAnalyzer` trait with an HTTP backend and a fixture backend
//! - `TreeBuilder` for constructing trees directly in tests and fixtures

mod backend;
mod error;
pub mod fixture;
pub mod tree;

pub use backend::DocumentAnalyzer;
pub use backend::fixture::FixtureAnalyzer;
pub use error::AnalysisError;
pub use fixture::{GroupBuilder, PageBuilder, RowBuilder, RowStyle, TreeBuilder};
pub use tree::{
    DocumentClassification, DocumentField, FieldLabel, FieldValue, GroupEncoding, Page,
    RawFieldTree, RawRow, RowList, ScalarValue,
};

#[cfg(feature = "http")]
pub use backend::http::{HttpAnalyzer, HttpAnalyzerOptions};

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

//! Core library for invoice extraction from document-analysis field trees.
//!
//! This crate provides:
//! - Normalization of the service's nested field tree into a flat invoice
//! - The document validity gate
//! - Invoice data models and configuration
//! - SQLite persistence with lookups by invoice id and vendor
//! - The extraction pipeline tying these together

pub mod error;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod store;

pub use error::{InvextError, Result, StoreError, ValidityError};
pub use models::config::InvextConfig;
pub use models::invoice::{
    CanonicalInvoice, ConfidenceMap, ExtractionResult, FieldMap, InvoiceItem, VendorInvoices,
};
pub use normalize::{FieldSchema, LineItemCollector, TreeNormalizer, ValidityGate};
pub use pipeline::ExtractionPipeline;
pub use store::InvoiceStore;

/// Re-export analysis types.
pub use invext_analysis::{
    AnalysisError, DocumentAnalyzer, FixtureAnalyzer, GroupEncoding, RawFieldTree, ScalarValue,
    TreeBuilder,
};

#[cfg(feature = "http")]
pub use invext_analysis::{HttpAnalyzer, HttpAnalyzerOptions};

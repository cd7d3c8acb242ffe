//! Extraction pipeline: analyze, normalize, gate, persist.

use std::sync::Arc;
use std::time::Instant;

use invext_analysis::DocumentAnalyzer;
use tracing::{debug, info, warn};

use crate::error::{InvextError, Result};
use crate::models::config::InvextConfig;
use crate::models::invoice::{CanonicalInvoice, ExtractionResult, VendorInvoices};
use crate::normalize::{TreeNormalizer, ValidityGate, document_confidence};
use crate::store::InvoiceStore;

/// Runs documents through an analysis backend and turns the returned field
/// tree into a stored invoice.
pub struct ExtractionPipeline {
    analyzer: Box<dyn DocumentAnalyzer>,
    normalizer: TreeNormalizer,
    gate: ValidityGate,
    store: Option<Arc<InvoiceStore>>,
}

impl ExtractionPipeline {
    /// Pipeline with default normalization and gate, without a store.
    pub fn new(analyzer: Box<dyn DocumentAnalyzer>) -> Self {
        Self {
            analyzer,
            normalizer: TreeNormalizer::new(),
            gate: ValidityGate::default(),
            store: None,
        }
    }

    /// Pipeline configured from `config`. The store is opened when
    /// persistence is enabled.
    pub fn from_config(analyzer: Box<dyn DocumentAnalyzer>, config: &InvextConfig) -> Result<Self> {
        let normalizer = TreeNormalizer::from_config(&config.extraction);
        let gate = ValidityGate::new(config.extraction.min_document_confidence);

        let mut pipeline = Self::new(analyzer)
            .with_normalizer(normalizer)
            .with_gate(gate);

        if config.store.persist {
            let store = InvoiceStore::open(
                &config.store.database_path,
                pipeline.normalizer.schema().clone(),
            )?;
            pipeline = pipeline.with_store(Arc::new(store));
        }

        Ok(pipeline)
    }

    pub fn with_normalizer(mut self, normalizer: TreeNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_gate(mut self, gate: ValidityGate) -> Self {
        self.gate = gate;
        self
    }

    /// Attach a store; accepted extractions are persisted to it.
    pub fn with_store(mut self, store: Arc<InvoiceStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn analyzer_name(&self) -> &str {
        self.analyzer.name()
    }

    pub fn store(&self) -> Option<&Arc<InvoiceStore>> {
        self.store.as_ref()
    }

    /// Extract one document.
    ///
    /// Rejected documents are never persisted. This call blocks on the
    /// analysis backend; async callers should run it on a blocking thread.
    pub fn submit(&self, document: &[u8]) -> Result<ExtractionResult> {
        let start = Instant::now();

        info!(
            "Analyzing {} byte document with {} backend",
            document.len(),
            self.analyzer.name()
        );
        let tree = self.analyzer.analyze(document)?;
        debug!(
            "Analysis returned {} pages, {} classifications",
            tree.pages.len(),
            tree.document_classification.len()
        );

        let (data, data_confidence) = self.normalizer.normalize(&tree);

        if let Err(e) = self.gate.check(&tree.document_classification) {
            warn!("Rejected document: {}", e);
            return Err(e.into());
        }

        let result = ExtractionResult {
            confidence: document_confidence(&tree.document_classification),
            data,
            data_confidence,
            prediction_time: start.elapsed().as_secs_f64(),
        };

        if let Some(store) = &self.store {
            let row_id = store.save_extraction(&result)?;
            info!("Stored invoice as row {}", row_id);
        }

        info!(
            "Extracted invoice with {} line items in {:.3}s",
            result.data.items.len(),
            result.prediction_time
        );
        Ok(result)
    }

    /// Stored invoice by identifier.
    pub fn invoice_by_id(&self, invoice_id: &str) -> Result<Option<CanonicalInvoice>> {
        Ok(self.require_store()?.invoice_by_id(invoice_id)?)
    }

    /// Stored invoices of a vendor, oldest first.
    pub fn invoices_by_vendor(&self, vendor_name: &str) -> Result<VendorInvoices> {
        Ok(self.require_store()?.invoices_by_vendor(vendor_name)?)
    }

    fn require_store(&self) -> Result<&InvoiceStore> {
        self.store
            .as_deref()
            .ok_or_else(|| InvextError::Config("no invoice store configured".to_string()))
    }
}

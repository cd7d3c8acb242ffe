//! Normalization of the analysis field tree into a canonical invoice.

mod accessor;
mod gate;
mod items;
mod normalizer;

pub use accessor::{FieldReading, FieldShape, group_rows, read_field};
pub use gate::{DEFAULT_MIN_CONFIDENCE, ValidityGate, document_confidence};
pub use items::LineItemCollector;
pub use normalizer::TreeNormalizer;

use crate::models::config::DEFAULT_SCALAR_FIELDS;
use crate::models::invoice::FieldMap;

/// The set of scalar invoice fields the normalizer copies, in output order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    scalar_fields: Vec<String>,
}

impl FieldSchema {
    /// Schema with the given fields. Duplicates and the reserved `Items`
    /// name are dropped.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut scalar_fields: Vec<String> = Vec::new();
        for field in fields {
            let field = field.into();
            if LineItemCollector::is_items_field(&field) || scalar_fields.contains(&field) {
                continue;
            }
            scalar_fields.push(field);
        }
        Self { scalar_fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.scalar_fields
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scalar_fields.iter().any(|f| f == name)
    }

    /// All-null map over the schema's fields.
    pub fn empty_map<V>(&self) -> FieldMap<V> {
        FieldMap::with_keys(self.scalar_fields.iter().cloned())
    }
}

impl Default for FieldSchema {
    fn default() -> Self {
        Self::new(DEFAULT_SCALAR_FIELDS)
    }
}

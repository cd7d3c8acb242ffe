//! Single-pass normalization of the field tree.

use invext_analysis::{RawFieldTree, ScalarValue};
use tracing::{debug, trace};

use super::accessor::read_field;
use super::items::LineItemCollector;
use super::FieldSchema;
use crate::models::config::ExtractionConfig;
use crate::models::invoice::{CanonicalInvoice, ConfidenceMap, FieldMap};

/// Flattens a [`RawFieldTree`] into a canonical invoice and its
/// confidence map.
///
/// The walk is one linear pass over pages and fields in source order:
/// scalar fields in the schema overwrite earlier occurrences, every
/// "Items" group is appended to the item list, anything else is ignored.
/// Shape problems degrade to nulls and never fail.
#[derive(Debug, Clone, Default)]
pub struct TreeNormalizer {
    schema: FieldSchema,
    collector: LineItemCollector,
}

impl TreeNormalizer {
    /// Create a normalizer with the default invoice schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a normalizer from extraction settings.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new()
            .with_schema(FieldSchema::new(config.scalar_fields.iter().cloned()))
            .with_collector(LineItemCollector::new().with_empty_items(config.keep_empty_items))
    }

    /// Set the scalar field schema.
    pub fn with_schema(mut self, schema: FieldSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Set the line-item collector.
    pub fn with_collector(mut self, collector: LineItemCollector) -> Self {
        self.collector = collector;
        self
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn normalize(&self, tree: &RawFieldTree) -> (CanonicalInvoice, ConfidenceMap) {
        let mut fields: FieldMap<ScalarValue> = self.schema.empty_map();
        let mut confidence: ConfidenceMap = self.schema.empty_map();
        let mut items = Vec::new();

        for (page_index, page) in tree.pages.iter().enumerate() {
            if page.document_fields.is_empty() {
                trace!("Page {} has no fields", page_index + 1);
                continue;
            }

            for field in &page.document_fields {
                let reading = read_field(field);
                match reading.name {
                    Some(name) if LineItemCollector::is_items_field(name) => {
                        items.extend(self.collector.collect(field));
                    }
                    Some(name) if self.schema.contains(name) => {
                        fields.set(name, reading.value);
                        confidence.set(name, reading.confidence);
                    }
                    Some(name) => trace!("Ignoring unrecognized field '{}'", name),
                    None => trace!("Ignoring unlabeled field on page {}", page_index + 1),
                }
            }
        }

        debug!(
            "Normalized {} pages: {} of {} fields present, {} line items",
            tree.pages.len(),
            fields.iter().filter(|(_, v)| v.is_some()).count(),
            fields.len(),
            items.len()
        );

        (CanonicalInvoice { fields, items }, confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::InvoiceItem;
    use invext_analysis::{GroupEncoding, RowStyle, TreeBuilder};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_superstore_invoice() {
        let tree = TreeBuilder::new()
            .page(|p| {
                p.field("VendorName", "SuperStore", 0.95)
                    .field("InvoiceId", "36259", 0.99)
                    .items(GroupEncoding::Direct, |g| {
                        g.row(|r| {
                            r.field("Description", "Pen")
                                .field("Quantity", 3)
                                .field("UnitPrice", 1.5)
                                .field("Amount", 4.5)
                        })
                    })
            })
            .classification("INVOICE", 0.97)
            .build();

        let (data, confidence) = TreeNormalizer::new().normalize(&tree);

        assert_eq!(data.vendor_name(), Some(&ScalarValue::from("SuperStore")));
        assert_eq!(data.invoice_id(), Some(&ScalarValue::from("36259")));
        assert_eq!(data.get("InvoiceTotal"), None);
        assert_eq!(
            data.items,
            vec![InvoiceItem {
                description: Some("Pen".into()),
                name: None,
                quantity: Some(ScalarValue::Integer(3)),
                unit_price: Some(ScalarValue::Number(1.5)),
                amount: Some(ScalarValue::Number(4.5)),
            }]
        );
        assert_eq!(confidence.get("VendorName"), Some(&0.95));
        assert_eq!(confidence.get("InvoiceId"), Some(&0.99));

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["Items"][0]["Name"], serde_json::Value::Null);
        assert_eq!(json["Items"][0]["Quantity"], 3);
    }

    #[test]
    fn test_output_has_exactly_schema_keys() {
        let tree = TreeBuilder::new()
            .page(|p| {
                p.field("VendorName", "A", 0.9)
                    .field("CustomerTaxId", "PL123", 0.9)
                    .field("vendorname", "lowercase", 0.9)
                    .unlabeled("floating text")
            })
            .build();

        let (data, confidence) = TreeNormalizer::new().normalize(&tree);

        let json = serde_json::to_value(&data).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        keys.sort();
        let schema = FieldSchema::default();
        let mut expected: Vec<&str> = schema
            .fields()
            .iter()
            .map(|f| f.as_str())
            .chain(["Items"])
            .collect();
        expected.sort();
        assert_eq!(keys, expected);

        assert_eq!(data.vendor_name(), Some(&ScalarValue::from("A")));
        assert_eq!(confidence.len(), 10);
        assert!(!confidence.contains_key("Items"));
    }

    #[test]
    fn test_last_occurrence_wins() {
        let tree = TreeBuilder::new()
            .page(|p| p.field("InvoiceTotal", 10.0, 0.5).field("InvoiceTotal", 11.0, 0.6))
            .page(|p| p.field("InvoiceTotal", 12.0, None))
            .build();

        let (data, confidence) = TreeNormalizer::new().normalize(&tree);

        assert_eq!(data.get("InvoiceTotal"), Some(&ScalarValue::Number(12.0)));
        assert_eq!(confidence.get("InvoiceTotal"), None);
        assert!(confidence.contains_key("InvoiceTotal"));
    }

    #[test]
    fn test_no_items_field() {
        let tree = TreeBuilder::new()
            .empty_page()
            .page(|p| p.field("InvoiceId", "1", 0.9))
            .build();

        let (data, _) = TreeNormalizer::new().normalize(&tree);

        assert!(data.items.is_empty());
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["Items"], serde_json::json!([]));
    }

    #[test]
    fn test_items_across_pages_are_concatenated() {
        let tree = TreeBuilder::new()
            .page(|p| {
                p.items(GroupEncoding::Direct, |g| {
                    g.row(|r| r.field("Name", "a")).row(|r| r.field("Name", "b"))
                })
            })
            .empty_page()
            .page(|p| {
                p.items(GroupEncoding::Legacy, |g| {
                    g.style(RowStyle::List).row(|r| r.field("Name", "a"))
                })
            })
            .build();

        let (data, _) = TreeNormalizer::new().normalize(&tree);

        let names: Vec<String> = data
            .items
            .iter()
            .map(|i| i.name.as_ref().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_items_label_is_case_insensitive() {
        let tree = TreeBuilder::new()
            .page(|p| {
                p.group("ITEMS", GroupEncoding::Wrapped, |g| {
                    g.row(|r| r.field("Amount", 1))
                })
            })
            .build();

        let (data, _) = TreeNormalizer::new().normalize(&tree);
        assert_eq!(data.items.len(), 1);
    }

    #[test]
    fn test_custom_schema() {
        let config = ExtractionConfig {
            scalar_fields: vec!["InvoiceId".to_string(), "DueDate".to_string()],
            keep_empty_items: false,
            ..ExtractionConfig::default()
        };
        let tree = TreeBuilder::new()
            .page(|p| {
                p.field("DueDate", "2024-01-29", 0.8)
                    .field("VendorName", "ignored", 0.9)
                    .items(GroupEncoding::Direct, |g| g.row(|r| r.field("Unit", "pcs")))
            })
            .build();

        let (data, confidence) = TreeNormalizer::from_config(&config).normalize(&tree);

        assert_eq!(data.fields.keys().collect::<Vec<_>>(), vec!["InvoiceId", "DueDate"]);
        assert_eq!(data.get("DueDate"), Some(&ScalarValue::from("2024-01-29")));
        assert_eq!(data.vendor_name(), None);
        assert!(data.items.is_empty());
        assert_eq!(confidence.get("DueDate"), Some(&0.8));
    }

    #[test]
    fn test_deterministic() {
        let tree = TreeBuilder::new()
            .page(|p| {
                p.field("SubTotal", 53.82, 0.9)
                    .items(GroupEncoding::Direct, |g| g.row(|r| r.field("Amount", 53.82)))
            })
            .build();
        let normalizer = TreeNormalizer::new();

        assert_eq!(normalizer.normalize(&tree), normalizer.normalize(&tree));
    }
}

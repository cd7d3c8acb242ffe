//! Line-item extraction from the "Items" group field.

use invext_analysis::{DocumentField, RawRow};
use tracing::{debug, trace};

use super::accessor::{FieldShape, read_field};
use crate::models::invoice::InvoiceItem;

/// Collects line items from an "Items" field, whatever its nesting.
#[derive(Debug, Clone)]
pub struct LineItemCollector {
    /// Keep rows that yield no recognized sub-field as all-null items.
    keep_empty_items: bool,
}

impl LineItemCollector {
    /// Create a collector that keeps one item per source row.
    pub fn new() -> Self {
        Self {
            keep_empty_items: true,
        }
    }

    /// Set whether rows without recognized sub-fields produce an item.
    pub fn with_empty_items(mut self, keep: bool) -> Self {
        self.keep_empty_items = keep;
        self
    }

    /// Check if a label names the line-item group.
    pub fn is_items_field(name: &str) -> bool {
        name.eq_ignore_ascii_case("items")
    }

    /// Items of `field` in row order. A field without rows gives an empty
    /// list.
    pub fn collect(&self, field: &DocumentField) -> Vec<InvoiceItem> {
        let FieldShape::Group { encoding, rows } = FieldShape::of(field) else {
            debug!("Items field carries no rows");
            return Vec::new();
        };

        debug!(
            "Collecting {} line item rows from '{}'",
            rows.len(),
            encoding.attribute()
        );

        let mut items = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let item = build_item(row_fields(row));
            if item.is_empty() && !self.keep_empty_items {
                debug!("Dropping line item row {} without recognized fields", index);
                continue;
            }
            items.push(item);
        }
        items
    }
}

impl Default for LineItemCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Flatten a row to its sub-fields. A row node wrapping a group is
/// unwrapped one level; a row node without a group is its own sub-field.
fn row_fields(row: &RawRow) -> Vec<&DocumentField> {
    match row {
        RawRow::Fields(fields) => fields.iter().collect(),
        RawRow::Node(node) => match FieldShape::of(node) {
            FieldShape::Group { rows, .. } => rows
                .iter()
                .flat_map(|inner| match inner {
                    RawRow::Node(field) => vec![field],
                    RawRow::Fields(fields) => fields.iter().collect(),
                    RawRow::Unrecognized(_) => Vec::new(),
                })
                .collect(),
            FieldShape::Scalar(_) => vec![node],
        },
        RawRow::Unrecognized(value) => {
            debug!("Unrecognized line item row: {}", value);
            Vec::new()
        }
    }
}

fn build_item(fields: Vec<&DocumentField>) -> InvoiceItem {
    let mut item = InvoiceItem::default();

    for sub_field in fields {
        let reading = read_field(sub_field);
        let Some(name) = reading.name else {
            trace!("Skipping unlabeled line item sub-field");
            continue;
        };
        if !item.set(name, reading.value) {
            trace!("Dropping unknown line item key '{}'", name);
        }
    }

    item
}

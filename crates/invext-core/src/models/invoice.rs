//! Canonical invoice record produced by normalization.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use invext_analysis::ScalarValue;

/// Marker returned as the vendor name when a vendor has no invoices.
pub const UNKNOWN_VENDOR: &str = "Unknown Vendor";

/// Ordered string-keyed map where every key is present and values are
/// nullable.
///
/// Serializes as a JSON object in key order, with `null` for absent values.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMap<V> {
    entries: Vec<(String, Option<V>)>,
}

impl<V> FieldMap<V> {
    /// Map holding `keys`, all null.
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: keys.into_iter().map(|k| (k.into(), None)).collect(),
        }
    }

    /// Value for `key`, `None` when null or unknown.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Overwrite the value of an existing key. Returns `false` and leaves
    /// the map untouched when `key` is not part of it.
    pub fn set(&mut self, key: &str, value: Option<V>) -> bool {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Overwrite the value of `key`, appending the key when missing.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<V>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&V>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for FieldMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V: Serialize> Serialize for FieldMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for FieldMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for FieldMapVisitor<V> {
            type Value = FieldMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of nullable values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = FieldMap::default();
                while let Some((key, value)) = access.next_entry::<String, Option<V>>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(FieldMapVisitor(PhantomData))
    }
}

/// Per-field confidence scores, same keys as the invoice's scalar fields.
pub type ConfidenceMap = FieldMap<f64>;

/// Flat invoice record: the configured scalar fields plus line items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalInvoice {
    /// Scalar fields in schema order.
    #[serde(flatten)]
    pub fields: FieldMap<ScalarValue>,

    /// Line items in source order.
    #[serde(rename = "Items", default)]
    pub items: Vec<InvoiceItem>,
}

impl CanonicalInvoice {
    pub fn get(&self, key: &str) -> Option<&ScalarValue> {
        self.fields.get(key)
    }

    pub fn invoice_id(&self) -> Option<&ScalarValue> {
        self.get("InvoiceId")
    }

    pub fn vendor_name(&self) -> Option<&ScalarValue> {
        self.get("VendorName")
    }
}

/// A single line item. Always carries exactly these five keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InvoiceItem {
    pub description: Option<ScalarValue>,
    pub name: Option<ScalarValue>,
    pub quantity: Option<ScalarValue>,
    pub unit_price: Option<ScalarValue>,
    pub amount: Option<ScalarValue>,
}

impl InvoiceItem {
    /// Sub-field names recognized on a line item.
    pub const KEYS: [&'static str; 5] = ["Description", "Name", "Quantity", "UnitPrice", "Amount"];

    /// Set the value of a known key. Unknown keys are ignored and return
    /// `false`.
    pub fn set(&mut self, key: &str, value: Option<ScalarValue>) -> bool {
        let slot = match key {
            "Description" => &mut self.description,
            "Name" => &mut self.name,
            "Quantity" => &mut self.quantity,
            "UnitPrice" => &mut self.unit_price,
            "Amount" => &mut self.amount,
            _ => return false,
        };
        *slot = value;
        true
    }

    /// Check if the item has no values at all.
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.name.is_none()
            && self.quantity.is_none()
            && self.unit_price.is_none()
            && self.amount.is_none()
    }
}

/// Outcome of one extraction, handed to persistence and returned to the
/// caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Document classification confidence (0.0 - 1.0).
    pub confidence: f64,

    /// Normalized invoice.
    pub data: CanonicalInvoice,

    /// Field-level confidence scores.
    pub data_confidence: ConfidenceMap,

    /// Seconds spent analyzing and normalizing the document.
    pub prediction_time: f64,
}

/// All invoices stored for one vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorInvoices {
    /// Vendor name, or [`UNKNOWN_VENDOR`] when nothing matched.
    #[serde(rename = "VendorName")]
    pub vendor_name: String,

    #[serde(rename = "TotalInvoices")]
    pub total_invoices: usize,

    /// Invoices ordered by invoice date, oldest first.
    pub invoices: Vec<CanonicalInvoice>,
}

impl VendorInvoices {
    /// Listing for a vendor; the unknown-vendor marker if `invoices` is empty.
    pub fn new(vendor_name: impl Into<String>, invoices: Vec<CanonicalInvoice>) -> Self {
        if invoices.is_empty() {
            return Self::unknown();
        }
        Self {
            vendor_name: vendor_name.into(),
            total_invoices: invoices.len(),
            invoices,
        }
    }

    pub fn unknown() -> Self {
        Self {
            vendor_name: UNKNOWN_VENDOR.to_string(),
            total_invoices: 0,
            invoices: Vec::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.invoices.is_empty()
    }
}

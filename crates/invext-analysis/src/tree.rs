//! Raw field tree returned by the document-analysis service.
//!
//! The service output is deeply nested and its shape varies from field to
//! field. Every attribute is read leniently: a JSON value whose shape does
//! not fit is treated as absent, so a single odd field never rejects the
//! whole document.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Complete analysis result for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFieldTree {
    /// Pages in document order.
    #[serde(default, deserialize_with = "lenient_list")]
    pub pages: Vec<Page>,

    /// Document-type detections, independent of the per-field data.
    #[serde(
        default,
        alias = "detectedDocumentTypes",
        alias = "document_classification",
        alias = "detected_document_types",
        deserialize_with = "classification_list"
    )]
    pub document_classification: Vec<DocumentClassification>,
}

/// One page of detected fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    /// 1-based page number, when the service reports it.
    #[serde(
        default,
        alias = "page_number",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub page_number: Option<u32>,

    /// Detected fields in reading order.
    #[serde(default, alias = "document_fields", deserialize_with = "lenient_list")]
    pub document_fields: Vec<DocumentField>,
}

/// A `(type, confidence)` document classification.
///
/// An entry whose confidence is missing or unreadable keeps
/// `confidence: None` instead of being dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentClassification {
    #[serde(
        default,
        alias = "type",
        alias = "document_type",
        deserialize_with = "lenient_text"
    )]
    pub document_type: String,

    #[serde(default, deserialize_with = "lenient")]
    pub confidence: Option<f64>,
}

impl DocumentClassification {
    pub fn new(document_type: impl Into<String>, confidence: f64) -> Self {
        Self {
            document_type: document_type.into(),
            confidence: Some(confidence),
        }
    }
}

/// One labeled unit of the tree: a scalar or a group of rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentField {
    /// Service-side field kind (`KEY_VALUE`, `LINE_ITEM_GROUP`, ...).
    #[serde(
        default,
        alias = "field_type",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub field_type: Option<String>,

    #[serde(
        default,
        alias = "field_label",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub field_label: Option<FieldLabel>,

    #[serde(
        default,
        alias = "field_value",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub field_value: Option<FieldValue>,
}

impl DocumentField {
    /// A labeled scalar field.
    pub fn scalar(
        name: impl Into<String>,
        value: impl Into<ScalarValue>,
        confidence: Option<f64>,
    ) -> Self {
        Self {
            field_type: Some("KEY_VALUE".to_string()),
            field_label: Some(FieldLabel::new(name, confidence)),
            field_value: Some(FieldValue {
                value: Some(value.into()),
                ..FieldValue::default()
            }),
        }
    }

    /// A labeled group field with rows stored under `encoding`.
    pub fn group(name: impl Into<String>, encoding: GroupEncoding, rows: Vec<RawRow>) -> Self {
        Self {
            field_type: Some("LINE_ITEM_GROUP".to_string()),
            field_label: Some(FieldLabel::new(name, None)),
            field_value: Some(FieldValue::with_rows(encoding, rows)),
        }
    }
}

/// Label attached to a field by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldLabel {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl FieldLabel {
    pub fn new(name: impl Into<String>, confidence: Option<f64>) -> Self {
        Self {
            name: Some(name.into()),
            confidence,
        }
    }
}

/// Value part of a field.
///
/// A scalar field carries `value` and/or `text`. A group field carries its
/// rows under one of the [`GroupEncoding`] attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValue {
    #[serde(
        default,
        alias = "value_type",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub value_type: Option<String>,

    /// Raw text as read from the page.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Typed value (number, date string, ...).
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub value: Option<ScalarValue>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<RawRow>>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub item: Option<RowList>,

    #[serde(
        rename = "_items",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_items: Option<Vec<RawRow>>,
}

impl FieldValue {
    /// A value holding `rows` under the attribute of `encoding`.
    pub fn with_rows(encoding: GroupEncoding, rows: Vec<RawRow>) -> Self {
        let mut value = Self {
            value_type: Some("ARRAY".to_string()),
            ..Self::default()
        };
        match encoding {
            GroupEncoding::Direct => value.items = Some(rows),
            GroupEncoding::Wrapped => value.item = Some(RowList { items: rows }),
            GroupEncoding::Legacy => value.legacy_items = Some(rows),
        }
        value
    }

    /// Rows stored under `encoding`, if that attribute is present.
    pub fn rows(&self, encoding: GroupEncoding) -> Option<&[RawRow]> {
        match encoding {
            GroupEncoding::Direct => self.items.as_deref(),
            GroupEncoding::Wrapped => self.item.as_ref().map(|list| list.items.as_slice()),
            GroupEncoding::Legacy => self.legacy_items.as_deref(),
        }
    }
}

/// Singular wrapper around a row list (`"item": { "items": [...] }`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowList {
    #[serde(default)]
    pub items: Vec<RawRow>,
}

/// The attribute a group's rows are stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupEncoding {
    /// `items: [row, ...]`
    Direct,
    /// `item: { items: [row, ...] }`
    Wrapped,
    /// `_items: [row, ...]`
    Legacy,
}

impl GroupEncoding {
    /// Lookup order when a field carries more than one encoding.
    pub const PRIORITY: [GroupEncoding; 3] = [
        GroupEncoding::Direct,
        GroupEncoding::Wrapped,
        GroupEncoding::Legacy,
    ];

    /// JSON attribute name of this encoding.
    pub fn attribute(self) -> &'static str {
        match self {
            GroupEncoding::Direct => "items",
            GroupEncoding::Wrapped => "item",
            GroupEncoding::Legacy => "_items",
        }
    }
}

/// One row of a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawRow {
    /// The row is a plain list of sub-fields.
    Fields(Vec<DocumentField>),
    /// The row is a field node, usually wrapping a group of sub-fields.
    Node(DocumentField),
    /// Anything else. Kept so the row count stays faithful.
    Unrecognized(serde_json::Value),
}

impl<'de> Deserialize<'de> for RawRow {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::Array(entries) => RawRow::Fields(parse_entries(entries)),
            serde_json::Value::Object(_) => match serde_json::from_value(value.clone()) {
                Ok(node) => RawRow::Node(node),
                Err(e) => {
                    debug!("Unreadable row node: {}", e);
                    RawRow::Unrecognized(value)
                }
            },
            other => RawRow::Unrecognized(other),
        })
    }
}

/// A typed scalar as reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl ScalarValue {
    /// The text content, if this is a text scalar.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ScalarValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Integer(i) => write!(f, "{}", i),
            ScalarValue::Number(n) => write!(f, "{}", n),
            ScalarValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Text(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Integer(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Integer(value.into())
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Number(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => {
            debug!("Ignoring malformed attribute: {}", e);
            Ok(None)
        }
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let text: Option<String> = lenient(deserializer)?;
    Ok(text.unwrap_or_default())
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(entries) = value else {
        if !value.is_null() {
            debug!("Expected a list, ignoring {}", value);
        }
        return Ok(Vec::new());
    };

    Ok(parse_entries(entries))
}

/// Parses each entry on its own, dropping the ones that do not fit.
fn parse_entries<T: DeserializeOwned>(entries: Vec<serde_json::Value>) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!("Dropping malformed list entry: {}", e);
                None
            }
        })
        .collect()
}

/// Classification entries never vanish: an entry that is not an object
/// becomes one with no type and no confidence. A non-list value reads as
/// an unreadable single entry, so it cannot pass for "no classifications".
fn classification_list<'de, D>(deserializer: D) -> Result<Vec<DocumentClassification>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let entries = match value {
        serde_json::Value::Null => return Ok(Vec::new()),
        serde_json::Value::Array(entries) => entries,
        other => {
            debug!("Expected a classification list, got {}", other);
            return Ok(vec![DocumentClassification::default()]);
        }
    };

    Ok(entries
        .into_iter()
        .map(|entry| {
            serde_json::from_value(entry).unwrap_or_else(|e| {
                debug!("Unreadable classification entry: {}", e);
                DocumentClassification::default()
            })
        })
        .collect())
}

//! Uniform read of a single field node.

use invext_analysis::{DocumentField, FieldValue, GroupEncoding, RawRow, ScalarValue};

/// How a field's value is laid out, decided once per field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldShape<'a> {
    /// A single value, typed when the service provided one, else raw text.
    Scalar(Option<ScalarValue>),
    /// A non-empty list of rows found under `encoding`.
    Group {
        encoding: GroupEncoding,
        rows: &'a [RawRow],
    },
}

impl<'a> FieldShape<'a> {
    pub fn of(field: &'a DocumentField) -> Self {
        let Some(value) = field.field_value.as_ref() else {
            return FieldShape::Scalar(None);
        };

        match group_rows(value) {
            Some((encoding, rows)) => FieldShape::Group { encoding, rows },
            None => FieldShape::Scalar(scalar_value(value)),
        }
    }
}

/// What the normalizer needs to know about one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldReading<'a> {
    /// Label name, `None` when the service could not label the field.
    pub name: Option<&'a str>,
    /// Scalar value; always `None` for group fields.
    pub value: Option<ScalarValue>,
    /// Label confidence (0.0 - 1.0).
    pub confidence: Option<f64>,
}

/// Read `(name, value, confidence)` from a field. Missing parts become
/// `None`; this never fails.
pub fn read_field(field: &DocumentField) -> FieldReading<'_> {
    let label = field.field_label.as_ref();

    let name = label
        .and_then(|l| l.name.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty());
    let confidence = label.and_then(|l| l.confidence);

    let value = match FieldShape::of(field) {
        FieldShape::Scalar(value) => value,
        FieldShape::Group { .. } => None,
    };

    FieldReading {
        name,
        value,
        confidence,
    }
}

/// First non-empty row list, trying encodings in priority order.
pub fn group_rows(value: &FieldValue) -> Option<(GroupEncoding, &[RawRow])> {
    GroupEncoding::PRIORITY.iter().find_map(|&encoding| {
        value
            .rows(encoding)
            .filter(|rows| !rows.is_empty())
            .map(|rows| (encoding, rows))
    })
}

fn scalar_value(value: &FieldValue) -> Option<ScalarValue> {
    value
        .value
        .clone()
        .or_else(|| value.text.clone().map(ScalarValue::Text))
}

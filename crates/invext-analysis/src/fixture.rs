//! Builders for raw field trees.
//!
//! Used by tests and by the fixture backend to construct service
//! responses directly, without going through JSON.

use crate::tree::{
    DocumentClassification, DocumentField, FieldLabel, FieldValue, GroupEncoding, Page,
    RawFieldTree, RawRow, ScalarValue,
};

/// Builder for a [`RawFieldTree`].
///
/// ```
/// use invext_analysis::{GroupEncoding, TreeBuilder};
///
/// let tree = TreeBuilder::new()
///     .page(|p| {
///         p.field("VendorName", "SuperStore", 0.95)
///             .items(GroupEncoding::Direct, |g| {
///                 g.row(|r| r.field("Description", "Pen").field("Quantity", 3))
///             })
///     })
///     .classification("INVOICE", 0.97)
///     .build();
///
/// assert_eq!(tree.pages[0].document_fields.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct TreeBuilder {
    pages: Vec<Page>,
    classifications: Vec<DocumentClassification>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page built by `build`.
    pub fn page(mut self, build: impl FnOnce(PageBuilder) -> PageBuilder) -> Self {
        let page_number = self.pages.len() as u32 + 1;
        let fields = build(PageBuilder::default()).fields;
        self.pages.push(Page {
            page_number: Some(page_number),
            document_fields: fields,
        });
        self
    }

    /// Append a page without any detected fields.
    pub fn empty_page(self) -> Self {
        self.page(|p| p)
    }

    /// Add a document-type detection.
    pub fn classification(mut self, document_type: impl Into<String>, confidence: f64) -> Self {
        self.classifications
            .push(DocumentClassification::new(document_type, confidence));
        self
    }

    pub fn build(self) -> RawFieldTree {
        RawFieldTree {
            pages: self.pages,
            document_classification: self.classifications,
        }
    }
}

/// Builder for the fields of one page.
#[derive(Debug, Default)]
pub struct PageBuilder {
    fields: Vec<DocumentField>,
}

impl PageBuilder {
    /// Labeled scalar field with a typed value.
    pub fn field(
        mut self,
        name: impl Into<String>,
        value: impl Into<ScalarValue>,
        confidence: impl Into<Option<f64>>,
    ) -> Self {
        self.fields
            .push(DocumentField::scalar(name, value, confidence.into()));
        self
    }

    /// Labeled scalar field that only carries raw text.
    pub fn text_field(
        mut self,
        name: impl Into<String>,
        text: impl Into<String>,
        confidence: impl Into<Option<f64>>,
    ) -> Self {
        self.fields.push(DocumentField {
            field_type: Some("KEY_VALUE".to_string()),
            field_label: Some(FieldLabel::new(name, confidence.into())),
            field_value: Some(FieldValue {
                value_type: Some("STRING".to_string()),
                text: Some(text.into()),
                ..FieldValue::default()
            }),
        });
        self
    }

    /// Scalar field the service could not label.
    pub fn unlabeled(mut self, value: impl Into<ScalarValue>) -> Self {
        self.fields.push(DocumentField {
            field_label: None,
            ..DocumentField::scalar("", value, None)
        });
        self
    }

    /// Any prepared field node.
    pub fn raw(mut self, field: DocumentField) -> Self {
        self.fields.push(field);
        self
    }

    /// "Items" group with rows stored under `encoding`.
    pub fn items(
        self,
        encoding: GroupEncoding,
        build: impl FnOnce(GroupBuilder) -> GroupBuilder,
    ) -> Self {
        self.group("Items", encoding, build)
    }

    /// Group field named `name` with rows stored under `encoding`.
    pub fn group(
        mut self,
        name: impl Into<String>,
        encoding: GroupEncoding,
        build: impl FnOnce(GroupBuilder) -> GroupBuilder,
    ) -> Self {
        let rows = build(GroupBuilder::default()).into_rows(encoding);
        self.fields.push(DocumentField::group(name, encoding, rows));
        self
    }
}

/// How each row of a group is laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowStyle {
    /// A row node wrapping its sub-fields in a nested group.
    #[default]
    Wrapped,
    /// A row that is a plain list of sub-fields.
    List,
}

/// Builder for the rows of a group.
#[derive(Debug, Default)]
pub struct GroupBuilder {
    rows: Vec<Vec<DocumentField>>,
    style: RowStyle,
}

impl GroupBuilder {
    /// Row layout used for every row of this group.
    pub fn style(mut self, style: RowStyle) -> Self {
        self.style = style;
        self
    }

    pub fn row(mut self, build: impl FnOnce(RowBuilder) -> RowBuilder) -> Self {
        self.rows.push(build(RowBuilder::default()).fields);
        self
    }

    fn into_rows(self, encoding: GroupEncoding) -> Vec<RawRow> {
        let style = self.style;
        self.rows
            .into_iter()
            .map(|fields| match style {
                RowStyle::List => RawRow::Fields(fields),
                RowStyle::Wrapped => RawRow::Node(DocumentField {
                    field_type: Some("LINE_ITEM".to_string()),
                    field_label: None,
                    field_value: Some(FieldValue::with_rows(
                        encoding,
                        fields.into_iter().map(RawRow::Node).collect(),
                    )),
                }),
            })
            .collect()
    }
}

/// Builder for the sub-fields of one row.
#[derive(Debug, Default)]
pub struct RowBuilder {
    fields: Vec<DocumentField>,
}

impl RowBuilder {
    /// Sub-field without a confidence.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.fields.push(DocumentField::scalar(name, value, None));
        self
    }

    /// Sub-field the service could not label.
    pub fn unlabeled(mut self, value: impl Into<ScalarValue>) -> Self {
        self.fields.push(DocumentField {
            field_label: None,
            ..DocumentField::scalar("", value, None)
        });
        self
    }
}

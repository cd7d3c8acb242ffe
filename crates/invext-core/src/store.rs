//! SQLite persistence for extracted invoices.
//!
//! Each accepted extraction becomes one `invoices` header row, its line
//! items in `invoice_items` (ordered by `position`), and one
//! `invoice_confidences` row. Value columns carry no declared type so
//! SQLite keeps every value's own storage class: an invoice id extracted
//! as text stays text, an amount extracted as a number stays a number.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use invext_analysis::ScalarValue;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::invoice::{CanonicalInvoice, ExtractionResult, InvoiceItem, VendorInvoices};
use crate::normalize::FieldSchema;

/// Scalar fields with a dedicated header column. Other configured fields
/// go to the `extra_fields` JSON column.
const FIELD_COLUMNS: [(&str, &str); 10] = [
    ("VendorName", "vendor_name"),
    ("VendorNameLogo", "vendor_name_logo"),
    ("InvoiceId", "invoice_id"),
    ("InvoiceDate", "invoice_date"),
    ("ShippingAddress", "shipping_address"),
    ("BillingAddressRecipient", "billing_address_recipient"),
    ("AmountDue", "amount_due"),
    ("SubTotal", "sub_total"),
    ("ShippingCost", "shipping_cost"),
    ("InvoiceTotal", "invoice_total"),
];

const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS invoices (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        vendor_name,
        vendor_name_logo,
        invoice_id,
        invoice_date,
        shipping_address,
        billing_address_recipient,
        amount_due,
        sub_total,
        shipping_cost,
        invoice_total,
        extra_fields TEXT NOT NULL DEFAULT '{}',
        document_confidence REAL NOT NULL,
        prediction_time REAL NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_invoices_invoice_id ON invoices(invoice_id);
    CREATE INDEX IF NOT EXISTS idx_invoices_vendor_name ON invoices(vendor_name);
    CREATE TABLE IF NOT EXISTS invoice_items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        invoice_row INTEGER NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        description,
        name,
        quantity,
        unit_price,
        amount
    );
    CREATE INDEX IF NOT EXISTS idx_invoice_items_invoice_row ON invoice_items(invoice_row);
    CREATE TABLE IF NOT EXISTS invoice_confidences (
        invoice_row INTEGER PRIMARY KEY REFERENCES invoices(id) ON DELETE CASCADE,
        scores TEXT NOT NULL
    );
";

/// `invoice_id` rendered as lookup text. Whole-valued REAL ids drop the
/// `.0` so they compare like their integer form.
const ID_AS_TEXT: &str = "CASE
        WHEN typeof(invoice_id) = 'real' AND invoice_id = CAST(invoice_id AS INTEGER)
        THEN CAST(CAST(invoice_id AS INTEGER) AS TEXT)
        ELSE CAST(invoice_id AS TEXT)
    END";

/// Invoice store backed by a single SQLite connection.
pub struct InvoiceStore {
    conn: Mutex<Connection>,
    schema: FieldSchema,
}

impl InvoiceStore {
    /// Open (or create) the database at `path`. Missing parent directories
    /// are created.
    pub fn open(path: impl AsRef<Path>, schema: FieldSchema) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Open {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path)?;
        info!("Opened invoice database at {}", path.display());
        Self::init(conn, schema)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(schema: FieldSchema) -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, schema)
    }

    fn init(conn: Connection, schema: FieldSchema) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
            schema,
        })
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Persist one extraction in a single transaction. Returns the row id
    /// of the stored invoice.
    pub fn save_extraction(&self, result: &ExtractionResult) -> Result<i64, StoreError> {
        let data = &result.data;

        let mut extra = serde_json::Map::new();
        for (key, value) in data.fields.iter() {
            if column_for(key).is_none() {
                extra.insert(key.to_string(), serde_json::to_value(value)?);
            }
        }

        let mut header: Vec<Value> = FIELD_COLUMNS
            .iter()
            .map(|(key, _)| to_sql(data.get(key)))
            .collect();
        header.push(Value::Text(serde_json::Value::Object(extra).to_string()));
        header.push(Value::Real(result.confidence));
        header.push(Value::Real(result.prediction_time));
        header.push(Value::Text(Utc::now().to_rfc3339()));

        let scores = serde_json::to_string(&result.data_confidence)?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let sql = format!(
            "INSERT INTO invoices ({}, extra_fields, document_confidence, prediction_time, created_at) VALUES ({})",
            column_list(),
            placeholders(header.len())
        );
        tx.execute(&sql, params_from_iter(header))?;
        let row_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO invoice_items (invoice_row, position, description, name, quantity, unit_price, amount)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (position, item) in data.items.iter().enumerate() {
                stmt.execute(params![
                    row_id,
                    position as i64,
                    to_sql(item.description.as_ref()),
                    to_sql(item.name.as_ref()),
                    to_sql(item.quantity.as_ref()),
                    to_sql(item.unit_price.as_ref()),
                    to_sql(item.amount.as_ref()),
                ])?;
            }
        }

        tx.execute(
            "INSERT INTO invoice_confidences (invoice_row, scores) VALUES (?1, ?2)",
            params![row_id, scores],
        )?;
        tx.commit()?;

        debug!(
            "Stored invoice row {} with {} line items",
            row_id,
            data.items.len()
        );
        Ok(row_id)
    }

    /// Invoice whose identifier equals `invoice_id` as text. A whole-valued
    /// float id matches without its fractional part. When several share
    /// it, the first stored is returned.
    pub fn invoice_by_id(&self, invoice_id: &str) -> Result<Option<CanonicalInvoice>, StoreError> {
        let conn = self.lock()?;

        let sql = format!(
            "SELECT id, {}, extra_fields FROM invoices
             WHERE {} = ?1
             ORDER BY id LIMIT 1",
            column_list(),
            ID_AS_TEXT
        );
        let header = conn
            .query_row(&sql, [invoice_id], read_header)
            .optional()?;

        match header {
            Some(header) => Ok(Some(self.assemble(&conn, header)?)),
            None => {
                debug!("No invoice with id '{}'", invoice_id);
                Ok(None)
            }
        }
    }

    /// All invoices of a vendor (exact, case-sensitive match), oldest
    /// invoice date first. Unknown vendors give the sentinel listing.
    pub fn invoices_by_vendor(&self, vendor_name: &str) -> Result<VendorInvoices, StoreError> {
        let conn = self.lock()?;

        let sql = format!(
            "SELECT id, {}, extra_fields FROM invoices
             WHERE vendor_name = ?1
             ORDER BY invoice_date ASC, id ASC",
            column_list()
        );
        let headers = {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([vendor_name], read_header)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let invoices = headers
            .into_iter()
            .map(|header| self.assemble(&conn, header))
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Vendor '{}' has {} invoices", vendor_name, invoices.len());
        Ok(VendorInvoices::new(vendor_name, invoices))
    }

    /// Number of stored invoices.
    pub fn invoice_count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM invoices", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Rebuild an invoice in this store's schema order.
    fn assemble(&self, conn: &Connection, header: Header) -> Result<CanonicalInvoice, StoreError> {
        let extra: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&header.extra_fields)?;

        let mut fields = self.schema.empty_map();
        for key in self.schema.fields() {
            let value = match FIELD_COLUMNS.iter().position(|(k, _)| k == key) {
                Some(index) => header.columns[index].clone(),
                None => extra
                    .get(key)
                    .cloned()
                    .and_then(|v| serde_json::from_value::<Option<ScalarValue>>(v).ok())
                    .flatten(),
            };
            fields.set(key, value);
        }

        let mut stmt = conn.prepare(
            "SELECT description, name, quantity, unit_price, amount FROM invoice_items
             WHERE invoice_row = ?1 ORDER BY position",
        )?;
        let items = stmt
            .query_map([header.row_id], |row| {
                Ok(InvoiceItem {
                    description: from_sql(row.get_ref(0)?),
                    name: from_sql(row.get_ref(1)?),
                    quantity: from_sql(row.get_ref(2)?),
                    unit_price: from_sql(row.get_ref(3)?),
                    amount: from_sql(row.get_ref(4)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(CanonicalInvoice { fields, items })
    }
}

struct Header {
    row_id: i64,
    columns: Vec<Option<ScalarValue>>,
    extra_fields: String,
}

fn read_header(row: &Row<'_>) -> rusqlite::Result<Header> {
    let mut columns = Vec::with_capacity(FIELD_COLUMNS.len());
    for index in 0..FIELD_COLUMNS.len() {
        columns.push(from_sql(row.get_ref(index + 1)?));
    }
    Ok(Header {
        row_id: row.get(0)?,
        columns,
        extra_fields: row.get(FIELD_COLUMNS.len() + 1)?,
    })
}

fn column_for(key: &str) -> Option<&'static str> {
    FIELD_COLUMNS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, column)| *column)
}

fn column_list() -> String {
    FIELD_COLUMNS
        .iter()
        .map(|(_, column)| *column)
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Booleans are stored as integers.
fn to_sql(value: Option<&ScalarValue>) -> Value {
    match value {
        None => Value::Null,
        Some(ScalarValue::Bool(b)) => Value::Integer(i64::from(*b)),
        Some(ScalarValue::Integer(i)) => Value::Integer(*i),
        Some(ScalarValue::Number(n)) => Value::Real(*n),
        Some(ScalarValue::Text(s)) => Value::Text(s.clone()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Option<ScalarValue> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(ScalarValue::Integer(i)),
        ValueRef::Real(n) => Some(ScalarValue::Number(n)),
        ValueRef::Text(bytes) => Some(ScalarValue::Text(
            String::from_utf8_lossy(bytes).into_owned(),
        )),
        ValueRef::Blob(_) => {
            debug!("Ignoring blob value in invoice column");
            None
        }
    }
}

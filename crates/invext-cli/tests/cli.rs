//! End-to-end tests of the `invext` binary using saved analysis responses.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Temp directory holding an empty config, a database path and a document.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();
        std::fs::write(dir.path().join("invoice.pdf"), b"%PDF-1.4 superstore").unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn invext(&self) -> Command {
        let mut cmd = Command::cargo_bin("invext").unwrap();
        cmd.arg("--config")
            .arg(self.path("config.json"))
            .arg("--database")
            .arg(self.path("invoices.db"));
        cmd
    }

    fn extract(&self, fixture_name: &str) -> assert_cmd::assert::Assert {
        self.invext()
            .arg("extract")
            .arg(self.path("invoice.pdf"))
            .arg("--fixture")
            .arg(fixture(fixture_name))
            .assert()
    }
}

fn stdout_json(assert: &assert_cmd::assert::Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).unwrap()
}

#[test]
fn test_extract_prints_result() {
    let ws = Workspace::new();

    let assert = ws.extract("superstore.json").success();
    let result = stdout_json(&assert);

    assert_eq!(result["confidence"], 0.97);
    assert_eq!(result["data"]["VendorName"], "SuperStore");
    assert_eq!(result["data"]["InvoiceId"], "36259");
    assert_eq!(result["data"]["BillingAddressRecipient"], "Aaron Bergman");
    assert_eq!(result["data"]["InvoiceTotal"], 58.11);
    assert_eq!(result["data"]["VendorNameLogo"], Value::Null);
    assert!(result["data"].get("CustomerTaxId").is_none());
    assert_eq!(
        result["data"]["Items"][0]["Description"],
        "Newell 330 Art, Office Supplies, OFF-AR-5309"
    );
    assert_eq!(result["data"]["Items"][0]["Quantity"], 3);
    assert_eq!(result["data"]["Items"][0]["UnitPrice"], 17.94);
    assert_eq!(result["data"]["Items"][0]["Name"], Value::Null);
    assert_eq!(result["dataConfidence"]["ShippingCost"], 0.88);
}

#[test]
fn test_extracted_invoice_can_be_looked_up() {
    let ws = Workspace::new();
    ws.extract("superstore.json").success();

    let assert = ws.invext().args(["invoice", "36259"]).assert().success();
    let invoice = stdout_json(&assert);
    assert_eq!(invoice["SubTotal"], 53.82);
    assert_eq!(invoice["Items"].as_array().unwrap().len(), 1);

    let assert = ws.invext().args(["vendor", "SuperStore"]).assert().success();
    let listing = stdout_json(&assert);
    assert_eq!(listing["VendorName"], "SuperStore");
    assert_eq!(listing["TotalInvoices"], 1);
}

#[test]
fn test_rejected_document() {
    let ws = Workspace::new();

    ws.extract("other.json")
        .failure()
        .stderr(predicate::str::contains("Invalid document"));

    ws.invext()
        .args(["invoice", "36259"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invoice not found"));
}

#[test]
fn test_no_store_skips_persistence() {
    let ws = Workspace::new();

    ws.invext()
        .arg("extract")
        .arg(ws.path("invoice.pdf"))
        .arg("--fixture")
        .arg(fixture("superstore.json"))
        .arg("--no-store")
        .assert()
        .success();

    let assert = ws.invext().args(["vendor", "SuperStore"]).assert().success();
    let listing = stdout_json(&assert);
    assert_eq!(listing["VendorName"], "Unknown Vendor");
    assert_eq!(listing["TotalInvoices"], 0);
}

#[test]
fn test_missing_input() {
    let ws = Workspace::new();

    ws.invext()
        .arg("extract")
        .arg(ws.path("missing.pdf"))
        .arg("--fixture")
        .arg(fixture("superstore.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_batch_writes_summary() {
    let ws = Workspace::new();
    std::fs::write(ws.path("second.pdf"), b"%PDF-1.4 again").unwrap();
    let out_dir = ws.path("out");

    ws.invext()
        .arg("batch")
        .arg(format!("{}/*.pdf", ws.dir.path().display()))
        .arg("--fixture")
        .arg(fixture("superstore.json"))
        .arg("--output-dir")
        .arg(&out_dir)
        .arg("--summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 files"));

    assert!(out_dir.join("invoice.json").exists());
    assert!(out_dir.join("second.json").exists());

    let summary = std::fs::read_to_string(out_dir.join("summary.csv")).unwrap();
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("filename,status,invoice_id"));
    assert!(lines[1].contains(",success,36259,SuperStore,58.11,"));
}

#[test]
fn test_config_get_and_set() {
    let ws = Workspace::new();

    ws.invext()
        .args(["config", "get", "extraction.min_document_confidence"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.9"));

    ws.invext()
        .args(["config", "set", "extraction.keep_empty_items", "false"])
        .assert()
        .success();

    ws.invext()
        .args(["config", "get", "extraction.keep_empty_items"])
        .assert()
        .success()
        .stdout(predicate::str::contains("false"));

    ws.invext()
        .args(["config", "get", "extraction.nope"])
        .assert()
        .failure();
}

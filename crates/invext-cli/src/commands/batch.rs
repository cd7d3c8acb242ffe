//! Batch command - extract invoices from multiple documents.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use invext_core::{ExtractionPipeline, ExtractionResult, InvextError};

use super::Settings;

/// Document extensions picked up from the glob pattern.
const DOCUMENT_EXTENSIONS: [&str; 7] = ["pdf", "png", "jpg", "jpeg", "tiff", "tif", "bmp"];

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern of input documents
    #[arg(required = true)]
    input: String,

    /// Use a saved analysis response (JSON) instead of calling the service
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Do not store the extracted invoices
    #[arg(long)]
    no_store: bool,

    /// Directory for one JSON result per document
    #[arg(short = 'd', long)]
    output_dir: Option<PathBuf>,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

enum Outcome {
    Extracted(ExtractionResult),
    Rejected(String),
    Failed(String),
}

/// Result of processing a single document.
struct BatchEntry {
    path: PathBuf,
    outcome: Outcome,
}

pub async fn run(args: BatchArgs, settings: &Settings) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = settings.load_config()?;
    if args.no_store {
        config.store.persist = false;
    }

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file() && is_document(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(output_dir) = &args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let analyzer = super::build_analyzer(&config, args.fixture.as_deref())?;
    let pipeline = Arc::new(ExtractionPipeline::from_config(analyzer, &config)?);

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );

    let mut entries = Vec::with_capacity(files.len());
    for path in files {
        let outcome = match extract_file(&pipeline, &path).await {
            Ok(result) => Outcome::Extracted(result),
            Err(InvextError::Rejected(reason)) => {
                warn!("Rejected {}: {}", path.display(), reason);
                Outcome::Rejected(format!("Invalid document: {}", reason))
            }
            Err(e) if args.continue_on_error => {
                warn!("Failed to process {}: {}", path.display(), e);
                Outcome::Failed(e.to_string())
            }
            Err(e) => {
                error!("Failed to process {}: {}", path.display(), e);
                pb.abandon();
                anyhow::bail!("Processing {} failed: {}", path.display(), e);
            }
        };

        if let (Outcome::Extracted(result), Some(output_dir)) = (&outcome, &args.output_dir) {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("invoice");
            let output_path = output_dir.join(format!("{}.json", stem));
            fs::write(&output_path, serde_json::to_string_pretty(result)?)?;
            debug!("Wrote output to {}", output_path.display());
        }

        entries.push(BatchEntry { path, outcome });
        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &entries)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let extracted = entries
        .iter()
        .filter(|e| matches!(e.outcome, Outcome::Extracted(_)))
        .count();
    let unsuccessful: Vec<_> = entries
        .iter()
        .filter_map(|e| match &e.outcome {
            Outcome::Extracted(_) => None,
            Outcome::Rejected(reason) | Outcome::Failed(reason) => Some((&e.path, reason)),
        })
        .collect();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        entries.len(),
        start.elapsed()
    );
    println!(
        "   {} extracted, {} not extracted",
        style(extracted).green(),
        style(unsuccessful.len()).red()
    );

    if !unsuccessful.is_empty() {
        println!();
        println!("{}", style("Not extracted:").red());
        for (path, reason) in &unsuccessful {
            println!("  - {}: {}", path.display(), reason);
        }
    }

    Ok(())
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| DOCUMENT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

async fn extract_file(
    pipeline: &Arc<ExtractionPipeline>,
    path: &Path,
) -> Result<ExtractionResult, InvextError> {
    let document = fs::read(path)?;
    let pipeline = Arc::clone(pipeline);
    tokio::task::spawn_blocking(move || pipeline.submit(&document))
        .await
        .map_err(|e| InvextError::Io(std::io::Error::other(e)))?
}

fn write_summary(path: &Path, entries: &[BatchEntry]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "invoice_id",
        "vendor_name",
        "invoice_total",
        "confidence",
        "prediction_time",
        "error",
    ])?;

    for entry in entries {
        let filename = entry
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        match &entry.outcome {
            Outcome::Extracted(result) => {
                let text = |key: &str| {
                    result
                        .data
                        .get(key)
                        .map(|v| v.to_string())
                        .unwrap_or_default()
                };
                wtr.write_record([
                    filename,
                    "success",
                    &text("InvoiceId"),
                    &text("VendorName"),
                    &text("InvoiceTotal"),
                    &format!("{:.2}", result.confidence),
                    &format!("{:.3}", result.prediction_time),
                    "",
                ])?;
            }
            Outcome::Rejected(reason) | Outcome::Failed(reason) => {
                let status = match entry.outcome {
                    Outcome::Rejected(_) => "rejected",
                    _ => "error",
                };
                wtr.write_record([filename, status, "", "", "", "", "", reason.as_str()])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_document() {
        assert!(is_document(Path::new("a/invoice.pdf")));
        assert!(is_document(Path::new("scan.JPG")));
        assert!(!is_document(Path::new("tree.json")));
        assert!(!is_document(Path::new("README")));
    }
}

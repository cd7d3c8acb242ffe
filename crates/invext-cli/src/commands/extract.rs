//! Extract command - extract an invoice from a single document.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::{debug, info};

use invext_core::{ExtractionPipeline, InvextError};

use super::Settings;

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input document (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Use a saved analysis response (JSON) instead of calling the service
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Do not store the extracted invoice
    #[arg(long)]
    no_store: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

pub async fn run(args: ExtractArgs, settings: &Settings) -> anyhow::Result<()> {
    let mut config = settings.load_config()?;
    if args.no_store {
        config.store.persist = false;
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Extracting invoice from: {}", args.input.display());
    let document = fs::read(&args.input)?;

    let analyzer = super::build_analyzer(&config, args.fixture.as_deref())?;
    let pipeline = ExtractionPipeline::from_config(analyzer, &config)?;

    let pb = super::spinner("Analyzing document...");
    let outcome = tokio::task::spawn_blocking(move || pipeline.submit(&document)).await?;
    pb.finish_and_clear();

    let result = match outcome {
        Ok(result) => result,
        Err(InvextError::Rejected(reason)) => anyhow::bail!("Invalid document: {}", reason),
        Err(e) => return Err(e.into()),
    };

    let output = super::to_json(&result, args.pretty)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Prediction time: {:.3}s", result.prediction_time);

    Ok(())
}

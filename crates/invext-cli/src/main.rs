//! CLI application for invoice extraction.

mod commands;
mod server;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use commands::{batch, config, extract, invoice, serve, vendor};

/// Invoice extraction - turn document-analysis results into invoice records
#[derive(Parser)]
#[command(name = "invext")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// SQLite database path (overrides the config file)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract an invoice from a single document
    Extract(extract::ExtractArgs),

    /// Extract invoices from multiple documents
    Batch(batch::BatchArgs),

    /// Show a stored invoice
    Invoice(invoice::InvoiceArgs),

    /// List stored invoices of a vendor
    Vendor(vendor::VendorArgs),

    /// Run the HTTP service
    Serve(serve::ServeArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG takes precedence over -v
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let settings = commands::Settings {
        config_path: cli.config,
        database: cli.database,
    };

    match cli.command {
        Commands::Extract(args) => extract::run(args, &settings).await,
        Commands::Batch(args) => batch::run(args, &settings).await,
        Commands::Invoice(args) => invoice::run(args, &settings).await,
        Commands::Vendor(args) => vendor::run(args, &settings).await,
        Commands::Serve(args) => serve::run(args, &settings).await,
        Commands::Config(args) => config::run(args, &settings).await,
    }
}

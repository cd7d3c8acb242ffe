//! Serve command - run the HTTP service.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use console::style;
use tracing::warn;

use invext_core::ExtractionPipeline;

use super::Settings;
use crate::server::{self, ApiState};

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Listen address (default from config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Answer every upload with a saved analysis response (JSON)
    #[arg(long)]
    fixture: Option<PathBuf>,
}

pub async fn run(args: ServeArgs, settings: &Settings) -> anyhow::Result<()> {
    let config = settings.load_config()?;
    if !config.store.persist {
        warn!("Persistence is disabled; invoice lookups will fail");
    }

    let analyzer = super::build_analyzer(&config, args.fixture.as_deref())?;
    let pipeline = ExtractionPipeline::from_config(analyzer, &config)?;

    let addr = args.bind.unwrap_or_else(|| config.server.bind_addr.clone());
    let state = ApiState::new(Arc::new(pipeline), config.server.max_upload_bytes);

    println!(
        "{} Listening on {} ({} backend)",
        style("ℹ").blue(),
        addr,
        state.pipeline.analyzer_name()
    );

    server::start_server(&addr, state).await?;
    Ok(())
}

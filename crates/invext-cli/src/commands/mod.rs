//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod extract;
pub mod invoice;
pub mod serve;
pub mod vendor;

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::debug;

use invext_core::models::config::InvextConfig;
use invext_core::{DocumentAnalyzer, FieldSchema, FixtureAnalyzer, HttpAnalyzer, InvoiceStore};

/// Options shared by every subcommand.
pub struct Settings {
    pub config_path: Option<String>,
    pub database: Option<PathBuf>,
}

impl Settings {
    /// Config file in use: the `--config` path, else the default location.
    pub fn config_file(&self) -> PathBuf {
        self.config_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(config::default_config_path)
    }

    /// Load configuration and apply command-line overrides. A missing
    /// default config file falls back to defaults; a missing explicit one
    /// is an error.
    pub fn load_config(&self) -> anyhow::Result<InvextConfig> {
        let path = self.config_file();
        let mut config = if self.config_path.is_some() || path.exists() {
            debug!("Loading configuration from {}", path.display());
            InvextConfig::from_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config {}: {}", path.display(), e)
            })?
        } else {
            InvextConfig::default()
        };

        if let Some(database) = &self.database {
            config.store.database_path = database.clone();
        }
        Ok(config)
    }
}

/// Analysis backend: a saved response when `fixture` is given, else the
/// configured HTTP service.
pub fn build_analyzer(
    config: &InvextConfig,
    fixture: Option<&Path>,
) -> anyhow::Result<Box<dyn DocumentAnalyzer>> {
    match fixture {
        Some(path) => {
            let analyzer = FixtureAnalyzer::from_file(path)
                .map_err(|e| anyhow::anyhow!("Failed to load fixture {}: {}", path.display(), e))?;
            Ok(Box::new(analyzer))
        }
        None => Ok(Box::new(HttpAnalyzer::new(config.analysis.http_options()))),
    }
}

/// Open the configured invoice database.
pub fn open_store(config: &InvextConfig) -> anyhow::Result<InvoiceStore> {
    let schema = FieldSchema::new(config.extraction.scalar_fields.iter().cloned());
    Ok(InvoiceStore::open(&config.store.database_path, schema)?)
}

pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

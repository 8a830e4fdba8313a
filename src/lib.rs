//! Camtrap - camera trap species recognition server.
//!
//! Serves a `SpeciesNet`-compatible prediction API over HTTP and saves
//! annotated copies of input images with bounding boxes drawn on them.

#![warn(missing_docs)]

pub mod annotate;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod inference;
pub mod registry;
pub mod server;

use clap::Parser;
use cli::Cli;
use config::ServerConfig;
use inference::{EnsembleOptions, OnnxPredictor};
use std::sync::Arc;
use tracing::info;

pub use error::{Error, Result};

/// Main entry point for the camtrap server.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let config = ServerConfig::from_cli(&cli);

    let registry = registry::load_registry()?;
    let entry = registry::find_model(&registry, &config.model).ok_or_else(|| {
        Error::ModelNotFound {
            name: config.model.clone(),
        }
    })?;

    let runtime = tokio::runtime::Runtime::new().map_err(|e| Error::Internal {
        message: format!("Failed to create async runtime: {e}"),
    })?;

    runtime.block_on(async {
        let files = registry::ensure_model(entry, !cli.quiet).await?;

        info!("Loading model: {} ({})", entry.id, entry.version);
        let predictor = OnnxPredictor::load(
            &files,
            &entry.version,
            EnsembleOptions {
                geofence: config.geofence,
                detector_threshold: config.detector_threshold,
            },
        )?;

        server::serve(&config, Arc::new(predictor)).await
    })
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // ORT logging is suppressed by default; raise it with -v/-vv/-vvv.
    let filter_str = if quiet {
        "warn,ort=off".to_string()
    } else {
        match verbose {
            0 => "info,ort=off".to_string(),
            1 => "debug,ort=warn".to_string(),
            2 => "trace,ort=info".to_string(),
            _ => "trace".to_string(),
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    fmt().with_env_filter(filter).init();
}

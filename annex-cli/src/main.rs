//! ## annotations-exporter
//! **Kubernetes labels and annotations as Prometheus metrics**
//!
//! Watches the configured resource types, keeps a bounded revision history
//! of each object's tracked labels and annotations, and serves it on
//! `/metrics`. `/healthz` reports ready once every watch has synced.
//! Any watch failure stops the process.

use annex_telemetry::{EventLogger, LogFormat};
use anyhow::anyhow;
use clap::Parser;
use tracing::error;

mod app;
mod commands;
mod server;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    let format: LogFormat = config.telemetry.log_format.parse().map_err(|e| anyhow!("{e}"))?;
    EventLogger::init(&config.telemetry.log_filter, format);

    if let Err(err) = app::run(config).await {
        error!(error = %format_args!("{err:#}"), "Exporter failed");
        return Err(err);
    }
    Ok(())
}

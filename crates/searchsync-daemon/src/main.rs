//! searchsync daemon
//!
//! Keeps a search index synchronized with a catalog of product records.
//!
//! # Usage
//!
//! ```bash
//! searchsync start [--no-incremental]
//! searchsync reindex
//! searchsync serialize-all
//! searchsync status
//! searchsync ingest records.jsonl [--delete]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (platform config dir, e.g. ~/.config/searchsync/config.toml)
//! 3. Environment variables (SEARCHSYNC_*)

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use searchsync_daemon::{
    ingest, reindex, reset_all, serialize_all, show_status, start, AppConfig, Cli, Commands,
};

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Start { no_incremental } => {
            start(config, no_incremental).await?;
        }
        Commands::Reindex => {
            reindex(config).await?;
        }
        Commands::SerializeAll => {
            serialize_all(config).await?;
        }
        Commands::ResetAll => {
            reset_all(config).await?;
        }
        Commands::Status => {
            show_status(config).await?;
        }
        Commands::Ingest { file, delete } => {
            ingest(config, &file, delete).await?;
        }
    }

    Ok(())
}

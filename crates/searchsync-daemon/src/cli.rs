//! CLI argument parsing for the searchsync daemon.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// searchsync daemon
///
/// Keeps a search index synchronized with a catalog of product records.
#[derive(Parser, Debug)]
#[command(name = "searchsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides the default platform location)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Daemon commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduler monitor and worker pool until interrupted
    Start {
        /// Boot with incremental updates disabled
        #[arg(long)]
        no_incremental: bool,
    },

    /// Rebuild the entire index and atomically swap the alias
    Reindex,

    /// Schedule serialization for every record, regardless of state
    SerializeAll,

    /// Reset every state row so all sync work is redone
    ResetAll,

    /// Show state counts and the incremental-update flag
    Status,

    /// Upsert catalog records from a JSONL file (one record per line)
    Ingest {
        /// Path to the JSONL file
        file: PathBuf,

        /// Mark the ingested records soft-deleted instead of live
        #[arg(long)]
        delete: bool,
    },
}

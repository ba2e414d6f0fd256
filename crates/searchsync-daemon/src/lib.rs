//! searchsync daemon library.
//!
//! Wires the store, engine client, scheduler, and workers into a running
//! service, and exposes the administrative commands the CLI fronts.

mod cli;
mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use commands::{ingest, reindex, reset_all, serialize_all, show_status, start};
pub use config::AppConfig;

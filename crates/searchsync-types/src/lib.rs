//! Shared types for the searchsync pipeline.
//!
//! Everything that crosses a crate boundary lives here: the catalog record
//! snapshot, the per-record sync state machine, the document producer seam,
//! the administrative settings flag, and the pipeline tunables.

mod config;
mod producer;
mod record;
mod settings;
mod state;

pub use config::SyncConfig;
pub use producer::{AttributesProducer, DocumentProducer, ProduceError};
pub use record::{CatalogRecord, RecordId};
pub use settings::SyncSettings;
pub use state::RecordState;

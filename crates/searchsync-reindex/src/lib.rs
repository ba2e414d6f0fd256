//! Zero-downtime full reindex for searchsync.
//!
//! Builds a fresh physical index, bulk-populates it from the serialized
//! corpus, gates the cutover on an import error-rate threshold, retargets
//! the stable alias in one atomic alias update, and garbage-collects
//! orphaned predecessor indices.

mod coordinator;
mod error;
mod naming;

pub use coordinator::{ReindexCoordinator, ReindexOutcome, ReindexReport};
pub use error::ReindexError;
pub use naming::{is_lineage_member, lineage_index_name};

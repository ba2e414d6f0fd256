//! Reindex error types.
//!
//! An abort on the failure-ratio gate is not an error: the run is logged
//! as aborted and reported through `ReindexOutcome`. These variants cover
//! genuine failures talking to the store or the engine.

use thiserror::Error;

use searchsync_engine::EngineError;
use searchsync_store::StoreError;

/// Errors that can occur during a reindex run
#[derive(Error, Debug)]
pub enum ReindexError {
    /// State store operation failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Engine call failed
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

//! Worker error types.

use thiserror::Error;

use searchsync_engine::{BulkFailure, EngineError};
use searchsync_store::StoreError;

/// Errors from a serialization batch
#[derive(Error, Debug)]
pub enum SerializeError {
    /// State store operation failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from an upload batch
#[derive(Error, Debug)]
pub enum UploadError {
    /// State store operation failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Engine call failed as a whole (transport, status, malformed body)
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// The bulk call returned per-item failures. Successes were committed
    /// before this was raised; the listed records keep their upload lock
    /// and are retried after the lock TTL expires.
    #[error("bulk upload failed for {} record(s): [{}]", .failures.len(), format_failures(.failures))]
    PartialUpload {
        /// Every failed record with its engine-supplied reason.
        failures: Vec<BulkFailure>,
    },
}

fn format_failures(failures: &[BulkFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

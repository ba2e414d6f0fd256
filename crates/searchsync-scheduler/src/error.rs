//! Scheduler error types.

use thiserror::Error;

use searchsync_store::StoreError;

/// Errors that can occur during a scheduling pass
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// State store operation failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

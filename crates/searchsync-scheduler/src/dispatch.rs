//! Batch job dispatch.
//!
//! The scheduler hands off work as fire-and-forget [`BatchJob`] messages.
//! The transport only has to offer at-least-once delivery: duplicate
//! deliveries produce duplicate-but-idempotent work because every job
//! carries the exact ids it is allowed to touch. An in-process tokio
//! channel implementation is provided; external queue transports implement
//! the same trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use searchsync_types::RecordId;

/// The two worker kinds a batch can be dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    /// Produce and store document JSON.
    Serialize,
    /// Push serialized documents (and deletions) to the search engine.
    Upload,
}

impl std::fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerKind::Serialize => write!(f, "serialize"),
            WorkerKind::Upload => write!(f, "upload"),
        }
    }
}

/// One unit of dispatched work: a worker kind and the ids it may process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    /// Which worker should handle the batch.
    pub kind: WorkerKind,
    /// Record ids claimed for this batch.
    pub record_ids: Vec<RecordId>,
}

impl BatchJob {
    /// Create a serialization job.
    pub fn serialize(record_ids: Vec<RecordId>) -> Self {
        Self {
            kind: WorkerKind::Serialize,
            record_ids,
        }
    }

    /// Create an upload job.
    pub fn upload(record_ids: Vec<RecordId>) -> Self {
        Self {
            kind: WorkerKind::Upload,
            record_ids,
        }
    }
}

/// Dispatch failure. The stamped lock is left in place so the batch is
/// naturally retried once the lock TTL expires.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The transport is no longer accepting jobs
    #[error("job queue closed")]
    Closed,
}

/// Fire-and-forget transport for batch jobs.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    /// Enqueue one batch job.
    async fn dispatch(&self, job: BatchJob) -> Result<(), DispatchError>;
}

/// Sending half of the in-process job queue.
pub struct QueueDispatcher {
    sender: mpsc::Sender<BatchJob>,
}

#[async_trait]
impl JobDispatcher for QueueDispatcher {
    async fn dispatch(&self, job: BatchJob) -> Result<(), DispatchError> {
        self.sender.send(job).await.map_err(|_| DispatchError::Closed)
    }
}

/// Receiving half of the in-process job queue, drained by the worker pool.
pub type JobReceiver = mpsc::Receiver<BatchJob>;

/// Create an in-process job queue with the given capacity.
///
/// Dispatch backpressures once `capacity` jobs are waiting, which bounds
/// how far the scheduler can run ahead of the workers.
pub fn job_queue(capacity: usize) -> (QueueDispatcher, JobReceiver) {
    let (sender, receiver) = mpsc::channel(capacity);
    (QueueDispatcher { sender }, receiver)
}

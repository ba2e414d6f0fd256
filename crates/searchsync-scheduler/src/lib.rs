//! Work scheduler for the searchsync pipeline.
//!
//! Polls the state store for records needing serialization or upload,
//! claims them in bounded batches by stamping the corresponding lock, and
//! dispatches each batch as one unit of work. Claims are released only by
//! TTL expiry, which is the pipeline's sole retry mechanism: a crashed
//! worker or a lost dispatch simply lets the lock age out.

mod dispatch;
mod error;
mod scheduler;

pub use dispatch::{
    job_queue, BatchJob, DispatchError, JobDispatcher, JobReceiver, QueueDispatcher, WorkerKind,
};
pub use error::SchedulerError;
pub use scheduler::{ScheduleReport, Scheduler};

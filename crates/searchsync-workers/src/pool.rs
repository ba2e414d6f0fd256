//! Worker pool draining the dispatch queue.
//!
//! Each dispatched batch runs to completion or times out; it is never
//! cancelled mid-flight. A timeout or failure just leaves the batch's
//! claims to expire, after which the scheduler re-discovers the records.

use std::sync::Arc;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use searchsync_scheduler::{BatchJob, JobReceiver, WorkerKind};
use searchsync_types::SyncConfig;

use crate::serializer::SerializationWorker;
use crate::uploader::BulkUploader;

/// Runs dispatched batches with per-kind timeouts.
pub struct WorkerPool {
    serializer: Arc<SerializationWorker>,
    uploader: Arc<BulkUploader>,
    config: SyncConfig,
}

impl WorkerPool {
    /// Create a pool over the two worker kinds.
    pub fn new(
        serializer: Arc<SerializationWorker>,
        uploader: Arc<BulkUploader>,
        config: SyncConfig,
    ) -> Self {
        Self {
            serializer,
            uploader,
            config,
        }
    }

    /// Drain the queue until shutdown is signalled or the queue closes.
    ///
    /// The in-flight batch always completes; jobs still queued at
    /// shutdown are dropped and re-surface via lock expiry.
    pub async fn run(&self, mut receiver: JobReceiver, shutdown: CancellationToken) {
        info!("Worker pool started");

        loop {
            tokio::select! {
                job = receiver.recv() => {
                    match job {
                        Some(job) => self.handle(job).await,
                        None => break,
                    }
                }
                _ = shutdown.cancelled() => break,
            }
        }

        info!("Worker pool stopped");
    }

    /// Run one batch under its kind's timeout.
    pub async fn handle(&self, job: BatchJob) {
        let batch_size = job.record_ids.len();
        match job.kind {
            WorkerKind::Serialize => {
                match timeout(
                    self.config.serialization_timeout(),
                    self.serializer.run(&job.record_ids),
                )
                .await
                {
                    Err(_) => error!(
                        batch_size,
                        "Serialization batch timed out, claims left to expire"
                    ),
                    Ok(Err(e)) => error!(batch_size, error = %e, "Serialization batch failed"),
                    Ok(Ok(_)) => {}
                }
            }
            WorkerKind::Upload => {
                match timeout(
                    self.config.upload_timeout(),
                    self.uploader.execute(&job.record_ids),
                )
                .await
                {
                    Err(_) => error!(
                        batch_size,
                        "Upload batch timed out, claims left to expire"
                    ),
                    Ok(Err(e)) => error!(batch_size, error = %e, "Upload batch failed"),
                    Ok(Ok(_)) => {}
                }
            }
        }
    }
}

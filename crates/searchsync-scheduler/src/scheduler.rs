//! Work discovery and batch assignment.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use searchsync_store::Store;
use searchsync_types::{RecordId, SyncConfig, SyncSettings};

use crate::dispatch::{BatchJob, JobDispatcher, WorkerKind};
use crate::error::SchedulerError;

/// Outcome of one scheduling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    /// Serialization batches dispatched.
    pub serialization_batches: usize,
    /// Upload batches dispatched.
    pub upload_batches: usize,
}

impl ScheduleReport {
    /// Whether the pass dispatched any work.
    pub fn has_work(&self) -> bool {
        self.serialization_batches > 0 || self.upload_batches > 0
    }
}

/// Discovers eligible records and hands off bounded batches.
///
/// Multiple scheduler instances may run concurrently: the lock stamp
/// placed just before dispatch means two schedulers racing on overlapping
/// batches produce at most duplicate-but-idempotent work, never lost work.
pub struct Scheduler {
    store: Arc<Store>,
    dispatcher: Arc<dyn JobDispatcher>,
    settings: Arc<SyncSettings>,
    config: SyncConfig,
}

impl Scheduler {
    /// Create a scheduler over the given store and dispatch transport.
    pub fn new(
        store: Arc<Store>,
        dispatcher: Arc<dyn JobDispatcher>,
        settings: Arc<SyncSettings>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            settings,
            config,
        }
    }

    /// Check the store for work and schedule it if necessary.
    ///
    /// No-op while incremental updates are administratively disabled; the
    /// flag is read fresh on every pass.
    pub async fn check_and_schedule(&self) -> Result<ScheduleReport, SchedulerError> {
        if !self.settings.incremental_enabled() {
            debug!("Incremental updates disabled, skipping scheduling pass");
            return Ok(ScheduleReport::default());
        }

        debug!("Checking for work");

        let now = Utc::now();
        let serialization_ids = self
            .store
            .scan_needing_serialization(now, self.config.serialization_lock_ttl())?;
        let serialization_batches = self
            .assign(WorkerKind::Serialize, &serialization_ids)
            .await?;

        let now = Utc::now();
        let upload_ids = self
            .store
            .scan_needing_upload(now, self.config.upload_lock_ttl())?;
        let upload_batches = self.assign(WorkerKind::Upload, &upload_ids).await?;

        let report = ScheduleReport {
            serialization_batches,
            upload_batches,
        };
        if report.has_work() {
            info!(
                serialization_batches = report.serialization_batches,
                upload_batches = report.upload_batches,
                "Dispatched work"
            );
        }
        Ok(report)
    }

    /// Schedule serialization for every record regardless of current
    /// state. Backfill escape hatch after bulk catalog imports; the
    /// workers themselves still honor the incremental flag.
    pub async fn serialize_all(&self) -> Result<usize, SchedulerError> {
        let ids = self.store.all_state_ids()?;
        info!(count = ids.len(), "Scheduling serialization for all records");
        self.assign(WorkerKind::Serialize, &ids).await
    }

    /// Claim and dispatch `record_ids` in batches, returning the number of
    /// batches dispatched.
    ///
    /// The lock is stamped before dispatch, and deliberately not released
    /// when dispatch fails: the claim ages out after its TTL and the
    /// records become eligible again on a later pass. A failed batch never
    /// blocks the remaining ones.
    async fn assign(
        &self,
        kind: WorkerKind,
        record_ids: &[RecordId],
    ) -> Result<usize, SchedulerError> {
        let mut dispatched = 0;

        for chunk in record_ids.chunks(self.config.batch_size.max(1)) {
            let now = Utc::now();
            match kind {
                WorkerKind::Serialize => self.store.lock_for_serialization(chunk, now)?,
                WorkerKind::Upload => self.store.lock_for_upload(chunk, now)?,
            }

            let job = BatchJob {
                kind,
                record_ids: chunk.to_vec(),
            };
            match self.dispatcher.dispatch(job).await {
                Ok(()) => {
                    debug!(kind = %kind, batch_size = chunk.len(), "Dispatched batch");
                    dispatched += 1;
                }
                Err(e) => {
                    error!(
                        kind = %kind,
                        batch_size = chunk.len(),
                        error = %e,
                        "Failed to dispatch batch, claim left to expire"
                    );
                }
            }
        }

        Ok(dispatched)
    }

    /// Monitor loop: run a scheduling pass every configured interval until
    /// shutdown is signalled.
    ///
    /// The signal is honored at the top of each iteration, so an in-flight
    /// pass always completes and no batch is abandoned mid-dispatch.
    pub async fn monitor(&self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.config.check_interval_secs,
            "Starting scheduler monitor"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            if let Err(e) = self.check_and_schedule().await {
                error!(error = %e, "Scheduling pass failed");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.check_interval()) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        info!("Scheduler monitor stopped");
    }
}

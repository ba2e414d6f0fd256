//! Bulk uploader.
//!
//! Synchronizes a batch of claimed records to the search engine in one
//! round trip: indexable records with a document become upserts,
//! non-indexable records become deletes. Only records the engine
//! individually confirms are marked uploaded; failures keep their claim
//! so the upstream problem has time to clear before the TTL retry.

use std::sync::Arc;

use tracing::{debug, info, warn};

use searchsync_engine::{BulkAction, BulkSummary, SearchEngine};
use searchsync_store::Store;
use searchsync_types::{RecordId, SyncSettings};

use crate::error::UploadError;

/// Outcome of one successfully confirmed upload batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Engine-side processing time in milliseconds.
    pub took_ms: u64,
    /// Records the engine confirmed and the store marked uploaded.
    pub uploaded: usize,
    /// Records excluded from the request (already confirmed, or reset
    /// raced the claim and the document is gone).
    pub skipped: usize,
}

/// Uploads batches of claimed records to the search engine.
pub struct BulkUploader {
    store: Arc<Store>,
    engine: Arc<dyn SearchEngine>,
    settings: Arc<SyncSettings>,
    index_name: String,
}

impl BulkUploader {
    /// Create an uploader writing to `index_name` (normally the alias).
    pub fn new(
        store: Arc<Store>,
        engine: Arc<dyn SearchEngine>,
        settings: Arc<SyncSettings>,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            engine,
            settings,
            index_name: index_name.into(),
        }
    }

    /// Upload a batch of claimed record ids.
    ///
    /// Partial success is the expected common case: confirmed records are
    /// committed first, then the failures are surfaced as one aggregate
    /// [`UploadError::PartialUpload`] so the problem is noticed instead of
    /// silently retrying forever.
    pub async fn execute(&self, record_ids: &[RecordId]) -> Result<UploadReport, UploadError> {
        if !self.settings.incremental_enabled() {
            debug!("Incremental updates disabled, dropping upload batch");
            return Ok(UploadReport::default());
        }

        let states = self.store.get_states(record_ids)?;
        let mut actions = Vec::with_capacity(states.len());
        let mut skipped = record_ids.len() - states.len();

        for state in &states {
            // Already confirmed: the engine reflects this record, nothing
            // to re-send. Makes a repeated invocation of the same batch a
            // no-op.
            if state.uploaded {
                skipped += 1;
                continue;
            }

            if state.indexable {
                match &state.document_json {
                    Some(document_json) => actions.push(BulkAction::Index {
                        record_id: state.record_id,
                        document_json: document_json.clone(),
                    }),
                    // Reset raced the claim; the record re-enters the
                    // serialization queue and must not be counted uploaded.
                    None => skipped += 1,
                }
            } else {
                actions.push(BulkAction::Delete {
                    record_id: state.record_id,
                });
            }
        }

        if actions.is_empty() {
            debug!(skipped = skipped, "Nothing eligible to upload");
            return Ok(UploadReport {
                skipped,
                ..Default::default()
            });
        }

        let response = self.engine.bulk(&self.index_name, &actions).await?;
        let summary = BulkSummary::from_response(&response)?;

        // Commit confirmed records first; failures are reported after.
        self.store.mark_uploaded(&summary.succeeded)?;

        if summary.all_succeeded() {
            info!(
                took_ms = summary.took,
                uploaded = summary.succeeded.len(),
                "Engine confirmed upload batch"
            );
            Ok(UploadReport {
                took_ms: summary.took,
                uploaded: summary.succeeded.len(),
                skipped,
            })
        } else {
            warn!(
                uploaded = summary.succeeded.len(),
                failed = summary.failed.len(),
                "Upload batch partially failed"
            );
            Err(UploadError::PartialUpload {
                failures: summary.failed,
            })
        }
    }
}

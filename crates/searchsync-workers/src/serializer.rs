//! Serialization worker.
//!
//! Populates `document_json` for a batch of claimed record ids. Each
//! record's write is independent and idempotent, so there is no partial
//! cleanup path: whatever this worker does not finish simply keeps its
//! claim until the lock TTL expires.

use std::sync::Arc;

use tracing::{debug, info, warn};

use searchsync_store::Store;
use searchsync_types::{DocumentProducer, RecordId, SyncSettings};

use crate::error::SerializeError;

/// Outcome of one serialization batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializeReport {
    /// Documents produced and stored.
    pub serialized: usize,
    /// Records skipped (disappeared or reset mid-flight).
    pub skipped: usize,
    /// Producer failures, left for TTL retry.
    pub failed: usize,
}

/// Produces and stores documents for batches of claimed records.
pub struct SerializationWorker {
    store: Arc<Store>,
    producer: Arc<dyn DocumentProducer>,
    settings: Arc<SyncSettings>,
}

impl SerializationWorker {
    /// Create a worker over the given store and document producer.
    pub fn new(
        store: Arc<Store>,
        producer: Arc<dyn DocumentProducer>,
        settings: Arc<SyncSettings>,
    ) -> Self {
        Self {
            store,
            producer,
            settings,
        }
    }

    /// Serialize a batch of claimed record ids.
    ///
    /// A record whose content disappeared between scheduling and
    /// processing is skipped, not failed. A producer failure skips that
    /// one record and leaves its claim to expire; the rest of the batch
    /// proceeds.
    pub async fn run(&self, record_ids: &[RecordId]) -> Result<SerializeReport, SerializeError> {
        if !self.settings.incremental_enabled() {
            debug!("Incremental updates disabled, dropping serialization batch");
            return Ok(SerializeReport::default());
        }

        let records = self.store.get_records(record_ids)?;
        let mut report = SerializeReport {
            skipped: record_ids.len() - records.len(),
            ..Default::default()
        };

        for record in &records {
            match self.producer.produce(record) {
                Ok(document_json) => {
                    if self.store.store_document(record.id, document_json)? {
                        report.serialized += 1;
                    } else {
                        report.skipped += 1;
                    }
                }
                Err(e) => {
                    warn!(record_id = record.id, error = %e, "Document production failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            serialized = report.serialized,
            skipped = report.skipped,
            failed = report.failed,
            "Serialization batch complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use tempfile::TempDir;

    use searchsync_types::{AttributesProducer, CatalogRecord, ProduceError};

    /// Fails for a fixed set of record ids.
    struct PickyProducer {
        fail_ids: Vec<RecordId>,
    }

    impl DocumentProducer for PickyProducer {
        fn produce(&self, record: &CatalogRecord) -> Result<String, ProduceError> {
            if self.fail_ids.contains(&record.id) {
                Err(ProduceError::new(record.id, "broken taxonomy"))
            } else {
                AttributesProducer.produce(record)
            }
        }
    }

    fn test_store() -> (Arc<Store>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(Store::open(temp_dir.path()).unwrap());
        (store, temp_dir)
    }

    fn worker(store: Arc<Store>, producer: impl DocumentProducer + 'static) -> SerializationWorker {
        SerializationWorker::new(store, Arc::new(producer), Arc::new(SyncSettings::default()))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_serializes_batch_and_clears_locks() {
        let (store, _temp) = test_store();
        let now = Utc::now();
        for id in 1..=2 {
            store
                .put_record(&CatalogRecord::new(id, json!({"name": format!("r{}", id)})))
                .unwrap();
        }
        store.lock_for_serialization(&[1, 2], now).unwrap();

        let report = worker(store.clone(), AttributesProducer)
            .run(&[1, 2])
            .await
            .unwrap();
        assert_eq!(report.serialized, 2);
        assert_eq!(report.failed, 0);

        let state = store.get_state(1).unwrap().unwrap();
        assert_eq!(state.document_json.as_deref(), Some(r#"{"name":"r1"}"#));
        assert!(state.serialization_lock_at.is_none());
        assert!(state.needs_upload(now, Duration::minutes(20)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_producer_failure_skips_record_and_keeps_claim() {
        let (store, _temp) = test_store();
        let now = Utc::now();
        for id in 1..=3 {
            store
                .put_record(&CatalogRecord::new(id, json!({})))
                .unwrap();
        }
        store.lock_for_serialization(&[1, 2, 3], now).unwrap();

        let report = worker(store.clone(), PickyProducer { fail_ids: vec![2] })
            .run(&[1, 2, 3])
            .await
            .unwrap();
        assert_eq!(report.serialized, 2);
        assert_eq!(report.failed, 1);

        // The failed record stays claimed and unserialized until the TTL
        // expires, then re-enters the needs-serialization set.
        let failed = store.get_state(2).unwrap().unwrap();
        assert!(failed.document_json.is_none());
        assert!(failed.serialization_lock_at.is_some());
        assert!(failed.needs_serialization(now + Duration::hours(2), Duration::hours(1)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_record_is_skipped() {
        let (store, _temp) = test_store();
        store.put_record(&CatalogRecord::new(1, json!({}))).unwrap();

        let report = worker(store.clone(), AttributesProducer)
            .run(&[1, 42])
            .await
            .unwrap();
        assert_eq!(report.serialized, 1);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_disabled_flag_drops_batch() {
        let (store, _temp) = test_store();
        store.put_record(&CatalogRecord::new(1, json!({}))).unwrap();

        let settings = Arc::new(SyncSettings::default());
        settings.set_incremental_enabled(false);
        let worker =
            SerializationWorker::new(store.clone(), Arc::new(AttributesProducer), settings);

        let report = worker.run(&[1]).await.unwrap();
        assert_eq!(report, SerializeReport::default());
        assert!(store.get_state(1).unwrap().unwrap().document_json.is_none());
    }
}

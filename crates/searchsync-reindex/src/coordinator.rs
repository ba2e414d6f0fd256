//! Full reindex orchestration.
//!
//! The run is linear: create index, import, gate, swap, mark, cleanup.
//! Incremental updates are suspended for the whole run and restored on
//! every exit path, so a crash can never leave them permanently disabled.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use searchsync_engine::{AliasAction, BulkAction, BulkSummary, SearchEngine};
use searchsync_store::Store;
use searchsync_types::{RecordId, SyncConfig, SyncSettings};

use crate::error::ReindexError;
use crate::naming::{is_lineage_member, lineage_index_name};

/// Import failure ratio above which the alias swap is refused.
///
/// A systemic serialization or upload problem must not silently replace a
/// working index with a mostly-empty one.
const MAX_FAILURE_RATIO: f64 = 0.05;

/// How a reindex run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReindexOutcome {
    /// The alias now points at the new index.
    Swapped,
    /// The failure ratio exceeded the threshold; the old binding stands.
    Aborted,
}

/// Result of a reindex run.
#[derive(Debug, Clone)]
pub struct ReindexReport {
    /// How the run ended.
    pub outcome: ReindexOutcome,
    /// Name of the physical index this run created.
    pub new_index: String,
    /// Total state rows at gate time (the failure-ratio denominator).
    pub total: u64,
    /// Records the engine confirmed into the new index.
    pub imported: usize,
    /// Records whose import failed; they stay pending for the
    /// incremental retry path.
    pub failed: Vec<RecordId>,
    /// Wall-clock duration of the run in milliseconds.
    pub elapsed_ms: u64,
}

/// Restores the incremental-update flag to its captured value on drop,
/// whatever path the run took out of scope.
struct SuspendIncremental {
    settings: Arc<SyncSettings>,
    previous: bool,
}

impl SuspendIncremental {
    fn new(settings: Arc<SyncSettings>) -> Self {
        let previous = settings.set_incremental_enabled(false);
        debug!(previous, "Suspended incremental updates");
        Self { settings, previous }
    }
}

impl Drop for SuspendIncremental {
    fn drop(&mut self) {
        self.settings.set_incremental_enabled(self.previous);
        debug!(restored = self.previous, "Restored incremental updates");
    }
}

/// Rebuilds the entire index behind the stable alias.
///
/// Non-serialized records are not imported; run the scheduler's
/// serialize-all backfill first when bootstrapping a fresh deployment. In
/// steady state the incremental serialization path keeps the corpus
/// serialized.
pub struct ReindexCoordinator {
    store: Arc<Store>,
    engine: Arc<dyn SearchEngine>,
    settings: Arc<SyncSettings>,
    alias: String,
    config: SyncConfig,
}

impl ReindexCoordinator {
    /// Create a coordinator for the given alias.
    pub fn new(
        store: Arc<Store>,
        engine: Arc<dyn SearchEngine>,
        settings: Arc<SyncSettings>,
        alias: impl Into<String>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            engine,
            settings,
            alias: alias.into(),
            config,
        }
    }

    /// Run a full reindex.
    ///
    /// On abort the new index is left in place for inspection and the
    /// alias binding is untouched. A cleanup failure does not invalidate
    /// a successful swap; orphans are collected by the next run.
    pub async fn run(&self) -> Result<ReindexReport, ReindexError> {
        let started = Instant::now();
        let _suspend = SuspendIncremental::new(self.settings.clone());

        let new_index = lineage_index_name(&self.alias, Utc::now());
        info!(index = %new_index, "Creating reindex target index");
        self.engine.create_index(&new_index).await?;

        let (imported, failed) = self.import(&new_index).await?;
        info!(
            imported = imported.len(),
            failed = failed.len(),
            "Reindex import complete"
        );

        let total = self.store.count_states()?;
        if total > 0 && failed.len() as f64 / total as f64 > MAX_FAILURE_RATIO {
            error!(
                total,
                failed = failed.len(),
                index = %new_index,
                "Import failure ratio over threshold, aborting index swap"
            );
            return Ok(ReindexReport {
                outcome: ReindexOutcome::Aborted,
                new_index,
                total,
                imported: imported.len(),
                failed,
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }

        self.swap(&new_index).await?;

        // Confirmed imports are now served by the live alias; failed ones
        // stay pending and re-enter the incremental upload path.
        self.store.mark_uploaded(&imported)?;

        self.cleanup().await;

        Ok(ReindexReport {
            outcome: ReindexOutcome::Swapped,
            new_index,
            total,
            imported: imported.len(),
            failed,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Stream the serialized corpus into `new_index` in fixed-size
    /// batches, accumulating confirmed and failed ids across batches.
    async fn import(
        &self,
        new_index: &str,
    ) -> Result<(Vec<RecordId>, Vec<RecordId>), ReindexError> {
        let ids: Vec<RecordId> = self
            .store
            .serialized_states()?
            .into_iter()
            .map(|state| state.record_id)
            .collect();
        let mut imported = Vec::with_capacity(ids.len());
        let mut failed = Vec::new();

        for batch_ids in ids.chunks(self.config.reindex_batch_size.max(1)) {
            // Re-fetch per batch: a record reset by a racing mutation since
            // the scan loses its document and drops out of this import.
            let states = self.store.get_states(batch_ids)?;
            let actions: Vec<BulkAction> = states
                .iter()
                .filter(|state| state.indexable)
                .filter_map(|state| {
                    state.document_json.as_ref().map(|json| BulkAction::Index {
                        record_id: state.record_id,
                        document_json: json.clone(),
                    })
                })
                .collect();
            if actions.is_empty() {
                continue;
            }

            let response = self.engine.bulk(new_index, &actions).await?;
            let summary = BulkSummary::from_response(&response)?;

            if summary.all_succeeded() {
                info!(
                    took_ms = summary.took,
                    count = summary.succeeded.len(),
                    "Imported batch"
                );
            } else {
                for failure in &summary.failed {
                    error!(record_id = failure.record_id, reason = %failure.reason, "Failed to import record");
                }
            }

            imported.extend(summary.succeeded);
            failed.extend(summary.failed.into_iter().map(|f| f.record_id));
        }

        Ok((imported, failed))
    }

    /// Retarget the alias in one atomic action list: remove it from every
    /// index it is currently bound to, add it to the new one. A brand-new
    /// deployment has no binding yet and gets a bare add.
    async fn swap(&self, new_index: &str) -> Result<(), ReindexError> {
        let bound = self.engine.alias_indices(&self.alias).await?;

        let mut actions: Vec<AliasAction> = bound
            .into_iter()
            .map(|old_index| AliasAction::Remove {
                index: old_index,
                alias: self.alias.clone(),
            })
            .collect();
        actions.push(AliasAction::Add {
            index: new_index.to_string(),
            alias: self.alias.clone(),
        });

        self.engine.update_aliases(&actions).await?;
        info!(alias = %self.alias, index = %new_index, "Alias swapped");
        Ok(())
    }

    /// Delete lineage members that no longer hold any alias. Best-effort:
    /// failures are logged and the orphans are retried by the next run.
    async fn cleanup(&self) {
        let bindings = match self.engine.all_aliases().await {
            Ok(bindings) => bindings,
            Err(e) => {
                warn!(error = %e, "Failed to list indices for cleanup");
                return;
            }
        };

        for (index, aliases) in bindings {
            if !aliases.is_empty() || !is_lineage_member(&self.alias, &index) {
                continue;
            }
            match self.engine.delete_index(&index).await {
                Ok(()) => info!(index = %index, "Deleted orphaned index"),
                Err(e) => warn!(index = %index, error = %e, "Failed to delete orphaned index"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    use searchsync_engine::{BulkItem, BulkItemResult, BulkResponse, EngineError};
    use searchsync_types::CatalogRecord;

    /// In-memory engine with real index/alias bookkeeping.
    #[derive(Default)]
    struct FakeEngine {
        indices: Mutex<HashMap<String, HashSet<String>>>,
        fail_ids: HashSet<RecordId>,
        fail_bulk: bool,
        bulk_batches: Mutex<Vec<(String, usize)>>,
    }

    impl FakeEngine {
        fn failing(ids: &[RecordId]) -> Self {
            Self {
                fail_ids: ids.iter().copied().collect(),
                ..Default::default()
            }
        }

        async fn seed_index(&self, name: &str, aliases: &[&str]) {
            self.indices.lock().await.insert(
                name.to_string(),
                aliases.iter().map(|a| a.to_string()).collect(),
            );
        }

        async fn alias_of(&self, alias: &str) -> Vec<String> {
            let mut bound: Vec<String> = self
                .indices
                .lock()
                .await
                .iter()
                .filter(|(_, aliases)| aliases.contains(alias))
                .map(|(name, _)| name.clone())
                .collect();
            bound.sort();
            bound
        }

        async fn index_names(&self) -> Vec<String> {
            let mut names: Vec<String> = self.indices.lock().await.keys().cloned().collect();
            names.sort();
            names
        }
    }

    #[async_trait]
    impl SearchEngine for FakeEngine {
        async fn bulk(
            &self,
            index: &str,
            actions: &[BulkAction],
        ) -> Result<BulkResponse, EngineError> {
            if self.fail_bulk {
                return Err(EngineError::Status {
                    status: 503,
                    body: "cluster unavailable".to_string(),
                });
            }
            self.bulk_batches
                .lock()
                .await
                .push((index.to_string(), actions.len()));
            let items = actions
                .iter()
                .map(|action| {
                    let record_id = action.record_id();
                    let failed = self.fail_ids.contains(&record_id);
                    BulkItem {
                        index: Some(BulkItemResult {
                            id: record_id.to_string(),
                            status: if failed { 400 } else { 201 },
                            error: failed.then(|| json!({"type": "mapper_parsing_exception"})),
                        }),
                        delete: None,
                    }
                })
                .collect::<Vec<_>>();
            Ok(BulkResponse {
                took: 5,
                errors: items.iter().any(|i| i.result().unwrap().error.is_some()),
                items,
            })
        }

        async fn create_index(&self, name: &str) -> Result<(), EngineError> {
            self.indices
                .lock()
                .await
                .insert(name.to_string(), HashSet::new());
            Ok(())
        }

        async fn delete_index(&self, name: &str) -> Result<(), EngineError> {
            self.indices.lock().await.remove(name);
            Ok(())
        }

        async fn alias_indices(&self, alias: &str) -> Result<Vec<String>, EngineError> {
            Ok(self.alias_of(alias).await)
        }

        async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), EngineError> {
            let mut indices = self.indices.lock().await;
            for action in actions {
                match action {
                    AliasAction::Add { index, alias } => {
                        indices
                            .entry(index.clone())
                            .or_default()
                            .insert(alias.clone());
                    }
                    AliasAction::Remove { index, alias } => {
                        if let Some(aliases) = indices.get_mut(index) {
                            aliases.remove(alias);
                        }
                    }
                }
            }
            Ok(())
        }

        async fn all_aliases(&self) -> Result<HashMap<String, Vec<String>>, EngineError> {
            Ok(self
                .indices
                .lock()
                .await
                .iter()
                .map(|(name, aliases)| (name.clone(), aliases.iter().cloned().collect()))
                .collect())
        }
    }

    fn test_store() -> (Arc<Store>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(Store::open(temp_dir.path()).unwrap());
        (store, temp_dir)
    }

    fn seed_serialized(store: &Store, count: u64) {
        for id in 1..=count {
            store
                .put_record(&CatalogRecord::new(id, json!({"n": id})))
                .unwrap();
            store
                .store_document(id, format!("{{\"n\":{}}}", id))
                .unwrap();
        }
    }

    fn coordinator(
        store: Arc<Store>,
        engine: Arc<FakeEngine>,
        settings: Arc<SyncSettings>,
    ) -> ReindexCoordinator {
        ReindexCoordinator::new(
            store,
            engine,
            settings,
            "products",
            SyncConfig::default().with_reindex_batch_size(10),
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_swap_under_threshold_and_cleanup() {
        let (store, _temp) = test_store();
        seed_serialized(&store, 21);

        // One failure out of 21 is under the 5% gate.
        let engine = Arc::new(FakeEngine::failing(&[1]));
        engine
            .seed_index("products_20200101000000000", &["products"])
            .await;
        engine.seed_index("products_20190101000000000", &[]).await;
        engine.seed_index("unrelated_index", &[]).await;

        let settings = Arc::new(SyncSettings::default());
        let report = coordinator(store.clone(), engine.clone(), settings.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(report.outcome, ReindexOutcome::Swapped);
        assert_eq!(report.total, 21);
        assert_eq!(report.imported, 20);
        assert_eq!(report.failed, vec![1]);

        // Alias points only at the new index.
        assert_eq!(engine.alias_of("products").await, vec![report.new_index.clone()]);

        // Both stale lineage members are gone, unrelated indices stay.
        assert_eq!(
            engine.index_names().await,
            vec![report.new_index.clone(), "unrelated_index".to_string()]
        );

        // Confirmed imports marked uploaded; the failed one stays pending.
        assert!(!store.get_state(1).unwrap().unwrap().uploaded);
        for id in 2..=21 {
            assert!(store.get_state(id).unwrap().unwrap().uploaded);
        }

        // Import ran in batches of 10 against the new index.
        let batches = engine.bulk_batches.lock().await;
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|(index, _)| index == &report.new_index));
        assert_eq!(
            batches.iter().map(|(_, n)| *n).collect::<Vec<_>>(),
            vec![10, 10, 1]
        );

        assert!(settings.incremental_enabled());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_abort_over_threshold_leaves_alias_untouched() {
        let (store, _temp) = test_store();
        seed_serialized(&store, 2);

        // One failure out of 2 is 50%: abort.
        let engine = Arc::new(FakeEngine::failing(&[2]));
        engine
            .seed_index("products_20200101000000000", &["products"])
            .await;

        let settings = Arc::new(SyncSettings::default());
        let report = coordinator(store.clone(), engine.clone(), settings.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(report.outcome, ReindexOutcome::Aborted);
        assert_eq!(report.failed, vec![2]);

        // The old binding stands.
        assert_eq!(
            engine.alias_of("products").await,
            vec!["products_20200101000000000".to_string()]
        );

        // The new index is left in place for inspection.
        assert!(engine
            .index_names()
            .await
            .contains(&report.new_index));

        // Nothing was marked uploaded, not even the record that imported.
        assert!(!store.get_state(1).unwrap().unwrap().uploaded);
        assert!(!store.get_state(2).unwrap().unwrap().uploaded);

        assert!(settings.incremental_enabled());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_zero_records_swaps_to_empty_index() {
        let (store, _temp) = test_store();
        let engine = Arc::new(FakeEngine::default());
        let settings = Arc::new(SyncSettings::default());

        let report = coordinator(store, engine.clone(), settings)
            .run()
            .await
            .unwrap();

        // An empty corpus is a valid terminal state, not a partial failure.
        assert_eq!(report.outcome, ReindexOutcome::Swapped);
        assert_eq!(report.total, 0);
        assert_eq!(engine.alias_of("products").await, vec![report.new_index]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_first_run_has_no_alias_to_remove() {
        let (store, _temp) = test_store();
        seed_serialized(&store, 1);
        let engine = Arc::new(FakeEngine::default());
        let settings = Arc::new(SyncSettings::default());

        let report = coordinator(store, engine.clone(), settings)
            .run()
            .await
            .unwrap();

        assert_eq!(report.outcome, ReindexOutcome::Swapped);
        assert_eq!(engine.alias_of("products").await, vec![report.new_index]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unserialized_records_stay_pending() {
        let (store, _temp) = test_store();
        seed_serialized(&store, 2);
        // Record 3 exists but was never serialized; it is not imported.
        store.put_record(&CatalogRecord::new(3, json!({}))).unwrap();

        let engine = Arc::new(FakeEngine::default());
        let settings = Arc::new(SyncSettings::default());
        let report = coordinator(store.clone(), engine, settings)
            .run()
            .await
            .unwrap();

        assert_eq!(report.outcome, ReindexOutcome::Swapped);
        assert_eq!(report.imported, 2);
        assert!(!store.get_state(3).unwrap().unwrap().uploaded);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_flag_restored_on_engine_failure() {
        let (store, _temp) = test_store();
        seed_serialized(&store, 1);

        let engine = Arc::new(FakeEngine {
            fail_bulk: true,
            ..Default::default()
        });
        let settings = Arc::new(SyncSettings::default());

        let result = coordinator(store, engine, settings.clone()).run().await;
        assert!(matches!(result, Err(ReindexError::Engine(_))));

        // The suspension is scoped, not sticky.
        assert!(settings.incremental_enabled());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_flag_restored_to_previous_value() {
        let (store, _temp) = test_store();
        let engine = Arc::new(FakeEngine::default());

        // Operator had incremental updates off before the run; a reindex
        // must not silently re-enable them.
        let settings = Arc::new(SyncSettings::default());
        settings.set_incremental_enabled(false);

        coordinator(store, engine, settings.clone())
            .run()
            .await
            .unwrap();
        assert!(!settings.incremental_enabled());
    }
}

//! RocksDB wrapper for searchsync storage.
//!
//! Provides:
//! - Database open with column family setup
//! - Atomic record upsert + state reset (one write batch, so a catalog
//!   mutation can never land without re-queuing the record for sync)
//! - Conditional bulk lock stamping keyed by id-set
//! - Eligibility scans backing the scheduler's work discovery

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use rocksdb::{IteratorMode, Options, WriteBatch, DB};
use serde::Serialize;
use tracing::{debug, info};

use searchsync_types::{CatalogRecord, RecordId, RecordState};

use crate::column_families::{build_cf_descriptors, CF_RECORDS, CF_STATES};
use crate::error::StoreError;
use crate::keys::{RecordKey, StateKey};

/// State-row counts for observability.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StateCounts {
    /// Total state rows.
    pub total: u64,
    /// Rows currently eligible for serialization.
    pub needing_serialization: u64,
    /// Rows currently eligible for upload.
    pub needing_upload: u64,
    /// Rows confirmed by the search engine.
    pub uploaded: u64,
}

/// Record and sync-state store.
///
/// One state row exists per record, created by [`Store::put_record`] and
/// never deleted while the record exists (soft-deleted records keep their
/// row so the deletion can be uploaded).
pub struct Store {
    db: DB,
}

impl Store {
    /// Open storage at the given path, creating if necessary.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        info!("Opening store at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(4);

        let cf_descriptors = build_cf_descriptors();
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        Ok(Self { db })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily, StoreError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(name.to_string()))
    }

    /// Upsert a catalog record and reset its state row, atomically.
    ///
    /// A fresh state row and a reset one are the same thing (unserialized,
    /// not uploaded, unlocked), so creation and the reset-on-mutation rule
    /// share this path. `indexable` is recomputed from the snapshot.
    pub fn put_record(&self, record: &CatalogRecord) -> Result<(), StoreError> {
        let records_cf = self.cf(CF_RECORDS)?;
        let states_cf = self.cf(CF_STATES)?;

        let state = RecordState::new(record.id, record.indexable());

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &records_cf,
            RecordKey::new(record.id).to_bytes(),
            record.to_bytes()?,
        );
        batch.put_cf(
            &states_cf,
            StateKey::new(record.id).to_bytes(),
            state.to_bytes()?,
        );
        self.db.write(batch)?;

        debug!(
            record_id = record.id,
            indexable = record.indexable(),
            "Stored record and reset state"
        );
        Ok(())
    }

    /// Get a catalog record by id.
    pub fn get_record(&self, record_id: RecordId) -> Result<Option<CatalogRecord>, StoreError> {
        let records_cf = self.cf(CF_RECORDS)?;
        let bytes = self
            .db
            .get_cf(&records_cf, RecordKey::new(record_id).to_bytes())?;
        match bytes {
            Some(bytes) => Ok(Some(CatalogRecord::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Get records for a batch of ids. Missing ids are silently skipped
    /// (the record disappeared between scheduling and processing).
    pub fn get_records(&self, record_ids: &[RecordId]) -> Result<Vec<CatalogRecord>, StoreError> {
        let mut records = Vec::with_capacity(record_ids.len());
        for &id in record_ids {
            if let Some(record) = self.get_record(id)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Get a state row by record id.
    pub fn get_state(&self, record_id: RecordId) -> Result<Option<RecordState>, StoreError> {
        let states_cf = self.cf(CF_STATES)?;
        let bytes = self
            .db
            .get_cf(&states_cf, StateKey::new(record_id).to_bytes())?;
        match bytes {
            Some(bytes) => Ok(Some(RecordState::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Get state rows for a batch of ids, skipping missing ones.
    pub fn get_states(&self, record_ids: &[RecordId]) -> Result<Vec<RecordState>, StoreError> {
        let mut states = Vec::with_capacity(record_ids.len());
        for &id in record_ids {
            if let Some(state) = self.get_state(id)? {
                states.push(state);
            }
        }
        Ok(states)
    }

    /// Ids of all records eligible for serialization at `now`.
    ///
    /// Returned in store iteration order; the scheduler pages the result
    /// into batches. No ordering guarantee beyond that.
    pub fn scan_needing_serialization(
        &self,
        now: DateTime<Utc>,
        lock_ttl: Duration,
    ) -> Result<Vec<RecordId>, StoreError> {
        self.scan_states(|state| state.needs_serialization(now, lock_ttl))
    }

    /// Ids of all records eligible for upload at `now`.
    pub fn scan_needing_upload(
        &self,
        now: DateTime<Utc>,
        lock_ttl: Duration,
    ) -> Result<Vec<RecordId>, StoreError> {
        self.scan_states(|state| state.needs_upload(now, lock_ttl))
    }

    /// Ids of every state row, regardless of state.
    pub fn all_state_ids(&self) -> Result<Vec<RecordId>, StoreError> {
        self.scan_states(|_| true)
    }

    fn scan_states<F>(&self, predicate: F) -> Result<Vec<RecordId>, StoreError>
    where
        F: Fn(&RecordState) -> bool,
    {
        let states_cf = self.cf(CF_STATES)?;
        let mut ids = Vec::new();
        for entry in self.db.iterator_cf(&states_cf, IteratorMode::Start) {
            let (_, value) = entry?;
            let state = RecordState::from_bytes(&value)?;
            if predicate(&state) {
                ids.push(state.record_id);
            }
        }
        Ok(ids)
    }

    /// Stamp the serialization lock to `now` for exactly the given ids.
    ///
    /// This is the scheduler's mutual-exclusion point: two schedulers
    /// racing on overlapping batches both stamp, but each dispatched job
    /// only processes the ids it was given, so the worst case is
    /// duplicate-but-idempotent work.
    pub fn lock_for_serialization(
        &self,
        record_ids: &[RecordId],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.update_states(record_ids, |state| {
            state.serialization_lock_at = Some(now);
        })
    }

    /// Stamp the upload lock to `now` for exactly the given ids.
    pub fn lock_for_upload(
        &self,
        record_ids: &[RecordId],
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.update_states(record_ids, |state| {
            state.upload_lock_at = Some(now);
        })
    }

    /// Mark the given ids uploaded and clear their upload locks, in one
    /// bulk update. Done in batch because nothing can be marked until the
    /// engine has confirmed the whole set.
    pub fn mark_uploaded(&self, record_ids: &[RecordId]) -> Result<(), StoreError> {
        self.update_states(record_ids, |state| {
            state.mark_uploaded();
        })
    }

    /// Move every state row back to the initial state so all work is
    /// redone. Administrative escape hatch.
    pub fn reset_all(&self) -> Result<u64, StoreError> {
        let ids = self.all_state_ids()?;
        self.update_states(&ids, |state| {
            let indexable = state.indexable;
            state.reset(indexable);
        })?;
        info!(count = ids.len(), "Reset all state rows");
        Ok(ids.len() as u64)
    }

    fn update_states<F>(&self, record_ids: &[RecordId], apply: F) -> Result<(), StoreError>
    where
        F: Fn(&mut RecordState),
    {
        if record_ids.is_empty() {
            return Ok(());
        }

        let states_cf = self.cf(CF_STATES)?;
        let mut batch = WriteBatch::default();
        for &id in record_ids {
            let key = StateKey::new(id).to_bytes();
            // Rows that vanished since the caller collected ids are skipped.
            let Some(bytes) = self.db.get_cf(&states_cf, &key)? else {
                continue;
            };
            let mut state = RecordState::from_bytes(&bytes)?;
            apply(&mut state);
            batch.put_cf(&states_cf, key, state.to_bytes()?);
        }
        self.db.write(batch)?;
        Ok(())
    }

    /// Store a produced document and release the serialization lock.
    ///
    /// Returns false when the state row no longer exists (the record was
    /// hard-removed mid-flight); the caller treats that as a skip.
    pub fn store_document(
        &self,
        record_id: RecordId,
        document_json: String,
    ) -> Result<bool, StoreError> {
        let states_cf = self.cf(CF_STATES)?;
        let key = StateKey::new(record_id).to_bytes();
        let Some(bytes) = self.db.get_cf(&states_cf, &key)? else {
            return Ok(false);
        };
        let mut state = RecordState::from_bytes(&bytes)?;
        state.store_document(document_json);
        self.db.put_cf(&states_cf, key, state.to_bytes()?)?;
        Ok(true)
    }

    /// All state rows that are indexable and serialized, for a full
    /// reindex import.
    pub fn serialized_states(&self) -> Result<Vec<RecordState>, StoreError> {
        let states_cf = self.cf(CF_STATES)?;
        let mut states = Vec::new();
        for entry in self.db.iterator_cf(&states_cf, IteratorMode::Start) {
            let (_, value) = entry?;
            let state = RecordState::from_bytes(&value)?;
            if state.indexable && state.document_json.is_some() {
                states.push(state);
            }
        }
        Ok(states)
    }

    /// Total number of state rows.
    pub fn count_states(&self) -> Result<u64, StoreError> {
        let states_cf = self.cf(CF_STATES)?;
        let mut count = 0u64;
        for entry in self.db.iterator_cf(&states_cf, IteratorMode::Start) {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    /// Aggregate state counts evaluated at `now`.
    pub fn counts(
        &self,
        now: DateTime<Utc>,
        serialization_lock_ttl: Duration,
        upload_lock_ttl: Duration,
    ) -> Result<StateCounts, StoreError> {
        let states_cf = self.cf(CF_STATES)?;
        let mut counts = StateCounts::default();
        for entry in self.db.iterator_cf(&states_cf, IteratorMode::Start) {
            let (_, value) = entry?;
            let state = RecordState::from_bytes(&value)?;
            counts.total += 1;
            if state.needs_serialization(now, serialization_lock_ttl) {
                counts.needing_serialization += 1;
            }
            if state.needs_upload(now, upload_lock_ttl) {
                counts.needing_upload += 1;
            }
            if state.uploaded {
                counts.uploaded += 1;
            }
        }
        Ok(counts)
    }
}

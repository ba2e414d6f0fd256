//! Per-record sync state machine.
//!
//! One state row exists per catalog record. It tracks how far the record
//! has progressed through `serialize -> upload`, and carries the two lock
//! timestamps the scheduler uses to keep concurrent workers from picking
//! up the same record. Locks are never released on failure; they expire
//! after a TTL, which is the pipeline's only retry mechanism.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::record::RecordId;

/// Sync tracking state for one catalog record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordState {
    /// Identifier of the owning catalog record.
    pub record_id: RecordId,

    /// Serialized document payload; `None` means not yet serialized.
    pub document_json: Option<String>,

    /// True once the search engine has confirmed this record's latest
    /// write (or its deletion, for non-indexable records).
    pub uploaded: bool,

    /// Set when a worker claims the record for serialization.
    pub serialization_lock_at: Option<DateTime<Utc>>,

    /// Set when a worker claims the record for upload.
    pub upload_lock_at: Option<DateTime<Utc>>,

    /// Whether the record currently belongs in the index.
    pub indexable: bool,
}

impl RecordState {
    /// Create a fresh state row: unserialized, not uploaded, unlocked.
    pub fn new(record_id: RecordId, indexable: bool) -> Self {
        Self {
            record_id,
            document_json: None,
            uploaded: false,
            serialization_lock_at: None,
            upload_lock_at: None,
            indexable,
        }
    }

    /// Move the state back to the initial state so all work is redone.
    ///
    /// This happens on every content-relevant catalog mutation and is the
    /// only way staleness enters the system; the record re-enters the
    /// needs-serialization set on the next scheduler pass.
    pub fn reset(&mut self, indexable: bool) {
        self.document_json = None;
        self.uploaded = false;
        self.serialization_lock_at = None;
        self.upload_lock_at = None;
        self.indexable = indexable;
    }

    /// Store a freshly produced document and release the serialization lock.
    pub fn store_document(&mut self, document_json: String) {
        self.document_json = Some(document_json);
        self.serialization_lock_at = None;
    }

    /// Record engine confirmation and release the upload lock.
    pub fn mark_uploaded(&mut self) {
        self.uploaded = true;
        self.upload_lock_at = None;
    }

    /// Whether the record needs a serialization pass.
    ///
    /// Indexable, no document yet, and no live serialization lock.
    pub fn needs_serialization(&self, now: DateTime<Utc>, lock_ttl: Duration) -> bool {
        self.indexable
            && self.document_json.is_none()
            && lock_open(self.serialization_lock_at, now, lock_ttl)
    }

    /// Whether the record needs an upload pass.
    ///
    /// Not yet confirmed, either serialized or excluded from the index
    /// (exclusion is uploaded as a deletion), and no live upload lock.
    pub fn needs_upload(&self, now: DateTime<Utc>, lock_ttl: Duration) -> bool {
        !self.uploaded
            && (self.document_json.is_some() || !self.indexable)
            && lock_open(self.upload_lock_at, now, lock_ttl)
    }

    /// Serialize to JSON bytes for storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// A lock is open when it was never stamped or when its age exceeds the TTL.
fn lock_open(lock_at: Option<DateTime<Utc>>, now: DateTime<Utc>, ttl: Duration) -> bool {
    match lock_at {
        None => true,
        Some(at) => now - at > ttl,
    }
}

//! Catalog record snapshot handed to the sync pipeline.
//!
//! The catalog's own schema is irrelevant here: the pipeline only needs a
//! stable id, an opaque attribute payload for the document producer, and
//! enough information to decide whether the record belongs in the index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a catalog record (and of its state row).
pub type RecordId = u64;

/// Point-in-time snapshot of a catalog record.
///
/// Soft deletion is represented by `deleted_at`; a deleted record keeps its
/// state row and goes through one more upload cycle so the index entry is
/// removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Catalog-assigned identifier.
    pub id: RecordId,

    /// Opaque payload consumed by the document producer.
    #[serde(default)]
    pub attributes: serde_json::Value,

    /// Soft-deletion timestamp, if the record has been removed.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl CatalogRecord {
    /// Create a live record snapshot.
    pub fn new(id: RecordId, attributes: serde_json::Value) -> Self {
        Self {
            id,
            attributes,
            deleted_at: None,
        }
    }

    /// Whether the record should appear in the search index.
    pub fn indexable(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Mark the record soft-deleted as of `at`.
    pub fn with_deleted_at(mut self, at: DateTime<Utc>) -> Self {
        self.deleted_at = Some(at);
        self
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

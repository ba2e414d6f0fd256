//! Document producer seam.
//!
//! Turning a catalog record into its indexed JSON representation is not
//! this pipeline's business: deployments inject their own producer. The
//! trait is deliberately a pure function of the record snapshot; it must
//! be safe to call repeatedly and must not mutate the source.

use thiserror::Error;

use crate::record::{CatalogRecord, RecordId};

/// A document production failure for a single record.
///
/// Recovered locally: the record is skipped, stays in the
/// needs-serialization set, and is retried on a later scheduler pass.
#[derive(Debug, Error)]
#[error("document production failed for record {record_id}: {message}")]
pub struct ProduceError {
    /// Record the producer failed on.
    pub record_id: RecordId,
    /// Producer-supplied failure description.
    pub message: String,
}

impl ProduceError {
    /// Create a production error for a record.
    pub fn new(record_id: RecordId, message: impl Into<String>) -> Self {
        Self {
            record_id,
            message: message.into(),
        }
    }
}

/// Produces the indexed JSON document for a catalog record.
pub trait DocumentProducer: Send + Sync {
    /// Build the JSON document for `record`.
    fn produce(&self, record: &CatalogRecord) -> Result<String, ProduceError>;
}

/// Default producer: the record's attribute payload, verbatim.
///
/// Deployments that shape documents (nested taxonomies, denormalized
/// pricing, etc.) supply their own [`DocumentProducer`] instead.
#[derive(Debug, Default)]
pub struct AttributesProducer;

impl DocumentProducer for AttributesProducer {
    fn produce(&self, record: &CatalogRecord) -> Result<String, ProduceError> {
        serde_json::to_string(&record.attributes)
            .map_err(|e| ProduceError::new(record.id, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attributes_producer() {
        let record = CatalogRecord::new(3, json!({"name": "Widget"}));
        let json = AttributesProducer.produce(&record).unwrap();
        assert_eq!(json, r#"{"name":"Widget"}"#);
    }

    #[test]
    fn test_produce_error_display() {
        let err = ProduceError::new(9, "missing price");
        assert_eq!(
            err.to_string(),
            "document production failed for record 9: missing price"
        );
    }
}

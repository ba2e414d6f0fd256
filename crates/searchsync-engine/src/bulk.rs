//! Bulk request construction and per-item result interpretation.
//!
//! A bulk request mixes index and delete actions, each tagged with the
//! record id as the document id. The response carries one result per
//! action in submission order; an action failed iff its result carries an
//! error marker. Both the incremental uploader and the reindex importer
//! interpret responses through [`BulkSummary`].

use serde::Deserialize;
use serde_json::json;

use searchsync_types::RecordId;

use crate::error::EngineError;

/// One action within a bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkAction {
    /// Upsert the record's document under its id.
    Index {
        /// Record id, used as the document id.
        record_id: RecordId,
        /// Pre-serialized JSON document.
        document_json: String,
    },
    /// Remove the record's document from the index.
    Delete {
        /// Record id, used as the document id.
        record_id: RecordId,
    },
}

impl BulkAction {
    /// The record id this action targets.
    pub fn record_id(&self) -> RecordId {
        match self {
            BulkAction::Index { record_id, .. } => *record_id,
            BulkAction::Delete { record_id } => *record_id,
        }
    }
}

/// Encode actions as an NDJSON bulk body.
///
/// Index actions contribute two lines (action header then source); delete
/// actions contribute one. The trailing newline is required by the API.
pub fn encode_body(actions: &[BulkAction]) -> String {
    let mut body = String::new();
    for action in actions {
        match action {
            BulkAction::Index {
                record_id,
                document_json,
            } => {
                body.push_str(&json!({"index": {"_id": record_id.to_string()}}).to_string());
                body.push('\n');
                body.push_str(document_json);
                body.push('\n');
            }
            BulkAction::Delete { record_id } => {
                body.push_str(&json!({"delete": {"_id": record_id.to_string()}}).to_string());
                body.push('\n');
            }
        }
    }
    body
}

/// Per-action result inside a bulk response item.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkItemResult {
    /// Document id the action targeted.
    #[serde(rename = "_id")]
    pub id: String,

    /// HTTP-style status for the individual action.
    #[serde(default)]
    pub status: u16,

    /// Error marker; present iff the action failed.
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// One item of a bulk response, keyed by the action kind.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkItem {
    /// Result of an index action, if this item was one.
    #[serde(default)]
    pub index: Option<BulkItemResult>,

    /// Result of a delete action, if this item was one.
    #[serde(default)]
    pub delete: Option<BulkItemResult>,
}

impl BulkItem {
    /// The action result regardless of kind.
    pub fn result(&self) -> Option<&BulkItemResult> {
        self.index.as_ref().or(self.delete.as_ref())
    }
}

/// Response to a bulk request.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkResponse {
    /// Engine-side processing time in milliseconds.
    #[serde(default)]
    pub took: u64,

    /// True when at least one action failed.
    #[serde(default)]
    pub errors: bool,

    /// Per-action results in submission order.
    #[serde(default)]
    pub items: Vec<BulkItem>,
}

/// A failed bulk action.
#[derive(Debug, Clone)]
pub struct BulkFailure {
    /// Record the action targeted.
    pub record_id: RecordId,
    /// Engine-supplied failure reason.
    pub reason: String,
}

impl std::fmt::Display for BulkFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "record {}: {}", self.record_id, self.reason)
    }
}

/// A bulk response partitioned into confirmed successes and failures.
#[derive(Debug, Clone, Default)]
pub struct BulkSummary {
    /// Engine-side processing time in milliseconds.
    pub took: u64,
    /// Record ids whose action the engine confirmed.
    pub succeeded: Vec<RecordId>,
    /// Failed actions with their reasons.
    pub failed: Vec<BulkFailure>,
}

impl BulkSummary {
    /// Partition a bulk response by per-item error markers.
    ///
    /// A delete of an already-absent document reports a 404 status but no
    /// error marker and counts as a success: the engine state matches the
    /// intent.
    pub fn from_response(response: &BulkResponse) -> Result<Self, EngineError> {
        let mut summary = BulkSummary {
            took: response.took,
            ..Default::default()
        };

        for item in &response.items {
            let result = item.result().ok_or_else(|| {
                EngineError::InvalidResponse("bulk item without action result".to_string())
            })?;
            let record_id: RecordId = result.id.parse().map_err(|_| {
                EngineError::InvalidResponse(format!("non-numeric document id: {}", result.id))
            })?;

            match &result.error {
                None => summary.succeeded.push(record_id),
                Some(error) => summary.failed.push(BulkFailure {
                    record_id,
                    reason: error.to_string(),
                }),
            }
        }

        Ok(summary)
    }

    /// Whether every action succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_body_mixed_actions() {
        let actions = vec![
            BulkAction::Index {
                record_id: 10,
                document_json: r#"{"name":"Widget"}"#.to_string(),
            },
            BulkAction::Delete { record_id: 20 },
        ];

        let body = encode_body(&actions);
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], r#"{"index":{"_id":"10"}}"#);
        assert_eq!(lines[1], r#"{"name":"Widget"}"#);
        assert_eq!(lines[2], r#"{"delete":{"_id":"20"}}"#);
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn test_encode_body_empty() {
        assert!(encode_body(&[]).is_empty());
    }

    #[test]
    fn test_summary_partitions_by_error_marker() {
        let response: BulkResponse = serde_json::from_str(
            r#"{
                "took": 12,
                "errors": true,
                "items": [
                    {"index": {"_id": "10", "status": 200}},
                    {"index": {"_id": "20", "status": 429,
                               "error": {"type": "es_rejected_execution_exception"}}},
                    {"delete": {"_id": "30", "status": 404}}
                ]
            }"#,
        )
        .unwrap();

        let summary = BulkSummary::from_response(&response).unwrap();

        assert_eq!(summary.took, 12);
        assert_eq!(summary.succeeded, vec![10, 30]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].record_id, 20);
        assert!(summary.failed[0].reason.contains("rejected"));
        assert!(!summary.all_succeeded());
    }

    #[test]
    fn test_summary_all_success() {
        let response: BulkResponse = serde_json::from_str(
            r#"{"took": 3, "errors": false,
                "items": [{"index": {"_id": "1", "status": 201}}]}"#,
        )
        .unwrap();

        let summary = BulkSummary::from_response(&response).unwrap();
        assert!(summary.all_succeeded());
        assert_eq!(summary.succeeded, vec![1]);
    }

    #[test]
    fn test_summary_rejects_malformed_item() {
        let response: BulkResponse =
            serde_json::from_str(r#"{"took": 1, "errors": false, "items": [{}]}"#).unwrap();
        assert!(matches!(
            BulkSummary::from_response(&response),
            Err(EngineError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_summary_rejects_non_numeric_id() {
        let response: BulkResponse = serde_json::from_str(
            r#"{"took": 1, "errors": false,
                "items": [{"index": {"_id": "abc", "status": 200}}]}"#,
        )
        .unwrap();
        assert!(matches!(
            BulkSummary::from_response(&response),
            Err(EngineError::InvalidResponse(_))
        ));
    }
}

//! Search engine client for searchsync.
//!
//! Wraps the engine's REST surface behind the [`SearchEngine`] trait: bulk
//! document writes with per-item results, index administration, and the
//! atomic multi-action alias update used for zero-downtime cutover. The
//! HTTP implementation targets the Elasticsearch-compatible API; tests
//! inject mock implementations of the trait instead.

mod bulk;
mod error;
mod http;

pub use bulk::{
    encode_body, BulkAction, BulkFailure, BulkItem, BulkItemResult, BulkResponse, BulkSummary,
};
pub use error::EngineError;
pub use http::{AliasAction, EngineConfig, HttpSearchEngine, SearchEngine};

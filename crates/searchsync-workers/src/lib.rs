//! Workers for the searchsync pipeline.
//!
//! The serialization worker turns claimed records into stored documents;
//! the bulk uploader synchronizes claimed records to the search engine
//! with per-item confirmation. Both are driven by the worker pool, which
//! drains the dispatch queue under per-kind timeouts.

mod error;
mod pool;
mod serializer;
mod uploader;

pub use error::{SerializeError, UploadError};
pub use pool::WorkerPool;
pub use serializer::{SerializationWorker, SerializeReport};
pub use uploader::{BulkUploader, UploadReport};

//! Pipeline tunables.
//!
//! Loaded from the daemon's layered configuration; every duration is
//! stored in seconds so the struct serializes cleanly.

use serde::{Deserialize, Serialize};

/// Tunable knobs for scheduling, locking, and worker timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Records per dispatched batch (default: 600).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Seconds between scheduler passes (default: 60).
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Serialization lock TTL in seconds (default: 3600).
    ///
    /// Serialization is neither fast nor very concurrent, so a claimed
    /// record may sit in the queue for a while before a worker gets to it.
    #[serde(default = "default_serialization_lock_ttl")]
    pub serialization_lock_ttl_secs: u64,

    /// Upload lock TTL in seconds (default: 1200).
    ///
    /// Uploads confirm quickly, so abandoned claims are reclaimed sooner.
    #[serde(default = "default_upload_lock_ttl")]
    pub upload_lock_ttl_secs: u64,

    /// Timeout for one serialization batch in seconds (default: 300).
    #[serde(default = "default_serialization_timeout")]
    pub serialization_timeout_secs: u64,

    /// Timeout for one upload batch in seconds (default: 600).
    ///
    /// The engine normally confirms within seconds, but an overloaded
    /// cluster can lag well behind.
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,

    /// Records per reindex import batch (default: 500).
    #[serde(default = "default_reindex_batch_size")]
    pub reindex_batch_size: usize,
}

fn default_batch_size() -> usize {
    600
}

fn default_check_interval() -> u64 {
    60
}

fn default_serialization_lock_ttl() -> u64 {
    3600
}

fn default_upload_lock_ttl() -> u64 {
    1200
}

fn default_serialization_timeout() -> u64 {
    300
}

fn default_upload_timeout() -> u64 {
    600
}

fn default_reindex_batch_size() -> usize {
    500
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            check_interval_secs: default_check_interval(),
            serialization_lock_ttl_secs: default_serialization_lock_ttl(),
            upload_lock_ttl_secs: default_upload_lock_ttl(),
            serialization_timeout_secs: default_serialization_timeout(),
            upload_timeout_secs: default_upload_timeout(),
            reindex_batch_size: default_reindex_batch_size(),
        }
    }
}

impl SyncConfig {
    /// Serialization lock TTL as a chrono duration.
    pub fn serialization_lock_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.serialization_lock_ttl_secs as i64)
    }

    /// Upload lock TTL as a chrono duration.
    pub fn upload_lock_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.upload_lock_ttl_secs as i64)
    }

    /// Interval between scheduler passes.
    pub fn check_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.check_interval_secs)
    }

    /// Timeout for one serialization batch.
    pub fn serialization_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.serialization_timeout_secs)
    }

    /// Timeout for one upload batch.
    pub fn upload_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.upload_timeout_secs)
    }

    /// Set the dispatch batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the reindex import batch size.
    pub fn with_reindex_batch_size(mut self, size: usize) -> Self {
        self.reindex_batch_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.batch_size, 600);
        assert_eq!(config.check_interval_secs, 60);
        assert_eq!(config.serialization_lock_ttl_secs, 3600);
        assert_eq!(config.upload_lock_ttl_secs, 1200);
        assert_eq!(config.reindex_batch_size, 500);
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: SyncConfig = serde_json::from_str("{\"batch_size\": 10}").unwrap();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.upload_lock_ttl_secs, 1200);
    }

    #[test]
    fn test_ttl_conversions() {
        let config = SyncConfig::default();
        assert_eq!(config.serialization_lock_ttl(), chrono::Duration::hours(1));
        assert_eq!(config.upload_lock_ttl(), chrono::Duration::minutes(20));
        assert_eq!(config.check_interval().as_secs(), 60);
    }
}

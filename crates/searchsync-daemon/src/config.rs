//! Configuration loading for the searchsync daemon.
//!
//! Layered: built-in defaults -> config file -> SEARCHSYNC_* environment
//! variables. The default config file lives in the platform config
//! directory (e.g. ~/.config/searchsync/config.toml).

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use searchsync_types::SyncConfig;

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Store database path.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Search engine base URL.
    #[serde(default = "default_engine_url")]
    pub engine_url: String,

    /// Search engine request timeout in seconds.
    #[serde(default = "default_engine_timeout")]
    pub engine_timeout_secs: u64,

    /// Stable alias the uploader writes through and the reindex
    /// coordinator retargets.
    #[serde(default = "default_index_alias")]
    pub index_alias: String,

    /// Initial value of the incremental-update flag.
    #[serde(default = "default_incremental_enabled")]
    pub incremental_enabled: bool,

    /// Capacity of the in-process job queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Scheduling, locking, and timeout tunables.
    #[serde(default)]
    pub sync: SyncConfig,
}

fn default_db_path() -> String {
    ProjectDirs::from("", "", "searchsync")
        .map(|dirs| dirs.data_dir().join("db").to_string_lossy().into_owned())
        .unwrap_or_else(|| "./searchsync-db".to_string())
}

fn default_engine_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_engine_timeout() -> u64 {
    60
}

fn default_index_alias() -> String {
    "products".to_string()
}

fn default_incremental_enabled() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            engine_url: default_engine_url(),
            engine_timeout_secs: default_engine_timeout(),
            index_alias: default_index_alias(),
            incremental_enabled: default_incremental_enabled(),
            queue_capacity: default_queue_capacity(),
            sync: SyncConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration, layering file and environment over defaults.
    ///
    /// When `config_path` is None the default platform location is used
    /// if a file exists there.
    pub fn load(config_path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();

        match config_path {
            Some(path) => {
                builder = builder.add_source(File::from(PathBuf::from(path)));
            }
            None => {
                if let Some(dirs) = ProjectDirs::from("", "", "searchsync") {
                    let default_path = dirs.config_dir().join("config.toml");
                    builder = builder.add_source(File::from(default_path).required(false));
                }
            }
        }

        builder = builder.add_source(Environment::with_prefix("SEARCHSYNC").separator("__"));

        builder.build()?.try_deserialize()
    }

    /// Engine request timeout as a duration.
    pub fn engine_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.engine_timeout_secs)
    }
}

//! Administrative toggle for incremental updates.
//!
//! A single shared flag, injected explicitly (never ambient global state)
//! so tests can supply distinct instances per scenario. Every scheduling
//! and worker cycle reads it fresh at the top of the cycle; the reindex
//! coordinator suspends it for the duration of a run.

use std::sync::atomic::{AtomicBool, Ordering};

/// Shared administrative settings for the pipeline.
///
/// Cheap to clone behind an `Arc`; reads and writes are atomic.
#[derive(Debug)]
pub struct SyncSettings {
    incremental_enabled: AtomicBool,
}

impl SyncSettings {
    /// Create settings with the given incremental-update flag.
    pub fn new(incremental_enabled: bool) -> Self {
        Self {
            incremental_enabled: AtomicBool::new(incremental_enabled),
        }
    }

    /// Whether incremental updates are currently enabled.
    pub fn incremental_enabled(&self) -> bool {
        self.incremental_enabled.load(Ordering::SeqCst)
    }

    /// Set the flag, returning the previous value.
    pub fn set_incremental_enabled(&self, enabled: bool) -> bool {
        self.incremental_enabled.swap(enabled, Ordering::SeqCst)
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_enabled() {
        assert!(SyncSettings::default().incremental_enabled());
    }

    #[test]
    fn test_swap_returns_previous() {
        let settings = SyncSettings::default();
        assert!(settings.set_incremental_enabled(false));
        assert!(!settings.incremental_enabled());
        assert!(!settings.set_incremental_enabled(true));
        assert!(settings.incremental_enabled());
    }
}

//! Shared health state for the /health endpoint.
//! Updated by SyncService after every sync attempt.

use std::sync::atomic::{AtomicU64, Ordering};

/// Sync counters. Written by the service, read by the API.
#[derive(Default)]
pub struct HealthState {
    /// Unix seconds of the last successful sync (0 = none yet).
    pub last_sync_at_secs: AtomicU64,
    pub syncs_completed: AtomicU64,
    pub syncs_failed: AtomicU64,
    /// Rows written by the last successful sync, summed over its tabs.
    pub last_rows_written: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, at_secs: u64, rows: u64) {
        self.last_sync_at_secs.store(at_secs, Ordering::Relaxed);
        self.last_rows_written.store(rows, Ordering::Relaxed);
        self.syncs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.syncs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_sync_at_secs(&self) -> u64 {
        self.last_sync_at_secs.load(Ordering::Relaxed)
    }

    pub fn syncs_completed(&self) -> u64 {
        self.syncs_completed.load(Ordering::Relaxed)
    }

    pub fn syncs_failed(&self) -> u64 {
        self.syncs_failed.load(Ordering::Relaxed)
    }

    pub fn last_rows_written(&self) -> u64 {
        self.last_rows_written.load(Ordering::Relaxed)
    }
}

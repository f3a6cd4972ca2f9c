//! Port interfaces for sync observation

use dirmirror_domain::{RecordFailure, SyncPhase};

/// Receives progress from a running sync pass.
///
/// Every method has a no-op default so observers implement only what they
/// need. Calls happen on the task driving the pass; keep them cheap.
pub trait SyncObserver: Send + Sync {
    /// The pass entered a new phase
    fn on_phase(&self, _phase: &SyncPhase) {}

    /// A page of the remote collection was read
    fn on_fetch_progress(&self, _pages: usize, _records: usize) {}

    /// The record at `index` was written to the cache
    fn on_record_synced(&self, _index: usize, _id: &str) {}

    /// The record could not be written
    fn on_record_failed(&self, _failure: &RecordFailure) {}
}

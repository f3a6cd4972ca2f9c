//! Sync pass reporting
//!
//! A pass moves through [`SyncPhase`] once and ends in a [`SyncReport`].

use serde::{Deserialize, Serialize};

use crate::MirrorError;

/// Where a sync pass currently is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    Fetching,
    /// The remote collection could not be read; nothing was written.
    FetchFailed,
    Fetched {
        records: usize,
    },
    Syncing,
    Completed {
        synced: usize,
        failed: usize,
        skipped: usize,
    },
}

impl SyncPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FetchFailed | Self::Completed { .. })
    }
}

/// A record that could not be written during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    /// Position of the record in fetch order.
    pub index: usize,
    /// Record id when it could be read.
    pub id: Option<String>,
    pub error: MirrorError,
}

/// Outcome of one completed sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub fetched: usize,
    pub synced: usize,
    pub failures: Vec<RecordFailure>,
    /// Records never attempted because the pass was cancelled.
    pub skipped: usize,
}

impl SyncReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// The remote collection was empty.
    pub fn source_was_empty(&self) -> bool {
        self.fetched == 0
    }

    pub fn was_cancelled(&self) -> bool {
        self.skipped > 0
    }

    /// `synced + failed + skipped == fetched`
    pub fn is_balanced(&self) -> bool {
        self.synced + self.failed() + self.skipped == self.fetched
    }

    pub fn phase(&self) -> SyncPhase {
        SyncPhase::Completed { synced: self.synced, failed: self.failed(), skipped: self.skipped }
    }
}

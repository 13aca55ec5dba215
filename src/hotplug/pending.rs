//! Pending Label Tracker
//!
//! Remembers whole disks that were labeled and whose partition has not been
//! announced yet. Entries are keyed by physical path.

use chrono::{DateTime, Utc};

/// A label request waiting for its partition to appear
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLabel {
    /// Physical path of the labeled disk
    pub phys_path: String,
    /// When the label was issued
    pub requested_at: DateTime<Utc>,
}

/// Ordered list of outstanding label requests
#[derive(Debug, Default)]
pub struct PendingLabels {
    entries: Vec<PendingLabel>,
}

impl PendingLabels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a label request
    pub fn insert(&mut self, phys_path: impl Into<String>) {
        self.entries.push(PendingLabel {
            phys_path: phys_path.into(),
            requested_at: Utc::now(),
        });
    }

    /// Remove and return the oldest entry for `phys_path`
    pub fn take(&mut self, phys_path: &str) -> Option<PendingLabel> {
        let idx = self.entries.iter().position(|e| e.phys_path == phys_path)?;
        Some(self.entries.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Physical paths of all outstanding requests, oldest first
    pub fn phys_paths(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.phys_path.clone()).collect()
    }

    /// Discard everything; used at teardown
    pub fn drain(&mut self) -> Vec<PendingLabel> {
        std::mem::take(&mut self.entries)
    }
}

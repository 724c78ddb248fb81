//! Cluster-wide aggregates kept alongside the record map.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::model::SyncState;

/// Seconds since the Unix epoch, negative for instants before it.
pub fn unix_seconds(t: SystemTime) -> f64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

/// Most recent import and sync instants observed across all records.
///
/// Both start at the Unix epoch, which doubles as the "unknown" value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterTimestamps {
    pub last_import_time: SystemTime,
    pub last_sync_time: SystemTime,
}

impl Default for ClusterTimestamps {
    fn default() -> Self {
        Self {
            last_import_time: UNIX_EPOCH,
            last_sync_time: UNIX_EPOCH,
        }
    }
}

impl ClusterTimestamps {
    /// Move the import watermark forward. Returns true if it moved.
    pub fn advance_import(&mut self, t: SystemTime) -> bool {
        advance(&mut self.last_import_time, t)
    }

    /// Move the sync watermark forward. Returns true if it moved.
    pub fn advance_sync(&mut self, t: SystemTime) -> bool {
        advance(&mut self.last_sync_time, t)
    }
}

fn advance(watermark: &mut SystemTime, t: SystemTime) -> bool {
    if t > *watermark {
        *watermark = t;
        true
    } else {
        false
    }
}

/// Pipeline stage that reports errors on the repo status resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Source,
    Importer,
    Syncer,
}

impl Component {
    pub const ALL: [Component; 3] = [Component::Source, Component::Importer, Component::Syncer];

    pub fn as_label(self) -> &'static str {
        match self {
            Component::Source => "source",
            Component::Importer => "importer",
            Component::Syncer => "syncer",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Latest error count per pipeline stage.
///
/// The repo status carries authoritative current counts, so every update
/// replaces all three values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorTally {
    pub source: u64,
    pub importer: u64,
    pub syncer: u64,
}

impl ErrorTally {
    pub fn new(source: u64, importer: u64, syncer: u64) -> Self {
        Self { source, importer, syncer }
    }

    pub fn get(&self, component: Component) -> u64 {
        match component {
            Component::Source => self.source,
            Component::Importer => self.importer,
            Component::Syncer => self.syncer,
        }
    }
}

/// Live number of records in each sync state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateCounts([u64; 4]);

impl StateCounts {
    pub fn get(&self, state: SyncState) -> u64 {
        self.0[state.index()]
    }

    pub fn increment(&mut self, state: SyncState) {
        self.0[state.index()] += 1;
    }

    /// Decrement the count for `state`. Returns false, leaving the count at
    /// zero, if it was already zero.
    pub fn decrement(&mut self, state: SyncState) -> bool {
        let slot = &mut self.0[state.index()];
        match slot.checked_sub(1) {
            Some(n) => {
                *slot = n;
                true
            }
            None => false,
        }
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SyncState, u64)> + '_ {
        SyncState::ALL.into_iter().map(|s| (s, self.get(s)))
    }
}

//! Sync state of a tracked config resource.
//!
//! # States
//! - Unknown: never reported, or reported with an empty tag
//! - Pending: change observed, not yet applied
//! - Synced: applied and confirmed
//! - Error: apply attempt failed

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The aggregator's belief about a resource's last reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Unknown,
    Pending,
    Synced,
    Error,
}

/// A status tag that does not name any known sync state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sync state tag {0:?}")]
pub struct ParseSyncStateError(pub String);

impl SyncState {
    /// Every state, in gauge publication order.
    pub const ALL: [SyncState; 4] = [
        SyncState::Unknown,
        SyncState::Pending,
        SyncState::Synced,
        SyncState::Error,
    ];

    pub fn is_synced(self) -> bool {
        matches!(self, SyncState::Synced)
    }

    /// Label value used for the per-state gauge series.
    pub fn as_label(self) -> &'static str {
        match self {
            SyncState::Unknown => "unknown",
            SyncState::Pending => "pending",
            SyncState::Synced => "synced",
            SyncState::Error => "error",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            SyncState::Unknown => 0,
            SyncState::Pending => 1,
            SyncState::Synced => 2,
            SyncState::Error => 3,
        }
    }
}

impl FromStr for SyncState {
    type Err = ParseSyncStateError;

    /// Parses a status tag as written by the syncing components.
    ///
    /// `"stale"` is the older spelling of pending and an empty tag means the
    /// resource has not reported yet.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "" | "unknown" => Ok(SyncState::Unknown),
            "pending" | "stale" => Ok(SyncState::Pending),
            "synced" => Ok(SyncState::Synced),
            "error" => Ok(SyncState::Error),
            _ => Err(ParseSyncStateError(tag.to_string())),
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

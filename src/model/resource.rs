//! Watched resource types.
//!
//! These mirror the status portion of the resources written by the syncing
//! components. Only the fields the monitor reads are modelled; unknown fields
//! are ignored on deserialization.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::model::ErrorTally;

/// The closed set of resource kinds the monitor reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Per-namespace config.
    Namespace,
    /// Cluster-scoped config.
    Cluster,
    /// Repository-wide status.
    Repo,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Namespace, ResourceKind::Cluster, ResourceKind::Repo];

    /// Directory holding resources of this kind under a source root.
    pub fn dir_name(self) -> &'static str {
        match self {
            ResourceKind::Namespace => "namespaces",
            ResourceKind::Cluster => "cluster",
            ResourceKind::Repo => "repo",
        }
    }

    pub fn from_dir_name(dir: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.dir_name() == dir)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Namespace => "namespace",
            ResourceKind::Cluster => "cluster",
            ResourceKind::Repo => "repo",
        };
        f.write_str(s)
    }
}

/// Identity of one watched resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceKey {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self { kind, name: name.into() }
    }

    pub fn namespace(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::Namespace, name)
    }

    pub fn cluster(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::Cluster, name)
    }

    pub fn repo(name: impl Into<String>) -> Self {
        Self::new(ResourceKind::Repo, name)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// A namespace or cluster config and its sync status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigResource {
    pub name: String,
    #[serde(default)]
    pub status: ConfigStatus,
}

/// Sync status block of a config resource.
///
/// Times are Unix seconds; zero means the stage has not reported a time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigStatus {
    pub sync_state: String,
    pub import_time: u64,
    pub sync_time: u64,
}

impl ConfigResource {
    pub fn new(name: impl Into<String>, sync_state: &str, import_time: u64, sync_time: u64) -> Self {
        Self {
            name: name.into(),
            status: ConfigStatus {
                sync_state: sync_state.to_string(),
                import_time,
                sync_time,
            },
        }
    }

    /// Import time as an instant; `None` if it does not fit in a `SystemTime`.
    pub fn import_time(&self) -> Option<SystemTime> {
        from_unix_secs(self.status.import_time)
    }

    pub fn sync_time(&self) -> Option<SystemTime> {
        from_unix_secs(self.status.sync_time)
    }
}

fn from_unix_secs(secs: u64) -> Option<SystemTime> {
    UNIX_EPOCH.checked_add(Duration::from_secs(secs))
}

/// The repository-wide status resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoResource {
    pub name: String,
    #[serde(default)]
    pub status: RepoStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoStatus {
    pub source: StageStatus,
    pub import: StageStatus,
    pub sync: StageStatus,
}

/// Errors currently reported by one pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageStatus {
    pub errors: Vec<String>,
}

impl RepoResource {
    /// Current per-stage error counts.
    pub fn error_tally(&self) -> ErrorTally {
        ErrorTally::new(
            self.status.source.errors.len() as u64,
            self.status.import.errors.len() as u64,
            self.status.sync.errors.len() as u64,
        )
    }
}

/// A fetched resource of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Config(ConfigResource),
    Repo(RepoResource),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_missing_times() {
        let res: ConfigResource =
            serde_json::from_str(r#"{"name":"ns-a","status":{"sync_state":"stale"}}"#).unwrap();
        assert_eq!(res.status.sync_state, "stale");
        assert_eq!(res.import_time(), Some(UNIX_EPOCH));
        assert_eq!(res.sync_time(), Some(UNIX_EPOCH));
    }

    #[test]
    fn test_out_of_range_time_is_none() {
        let res = ConfigResource::new("ns-a", "synced", u64::MAX, 110);
        assert_eq!(res.import_time(), None);
        assert_eq!(res.sync_time(), Some(UNIX_EPOCH + Duration::from_secs(110)));
    }

    #[test]
    fn test_repo_error_tally() {
        let res: RepoResource = serde_json::from_str(
            r#"{
                "name": "repo",
                "status": {
                    "source": {"errors": ["clone failed", "auth"]},
                    "sync": {"errors": ["apply"]}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(res.error_tally(), ErrorTally::new(2, 0, 1));
    }

    #[test]
    fn test_kind_dir_names() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_dir_name(kind.dir_name()), Some(kind));
        }
        assert_eq!(ResourceKind::from_dir_name("secrets"), None);
        assert_eq!(ResourceKey::namespace("ns-a").to_string(), "namespace/ns-a");
    }
}

//! Where watched resources are fetched from.
//!
//! # Responsibilities
//! - Fetch one resource by key, distinguishing "absent" from other failures
//! - List every resource currently present (for resync)
//!
//! # Design Decisions
//! - Fetching is synchronous; the controller runs it on the blocking pool
//!   under a timeout
//! - `NotFound` is the only error that means the resource is gone

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::model::{ConfigResource, RepoResource, Resource, ResourceKey, ResourceKind};

/// Errors that can occur while fetching a resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The resource does not exist (anymore).
    #[error("resource {0} not found")]
    NotFound(ResourceKey),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("fetch timed out after {millis} ms")]
    Timeout { millis: u64 },

    /// The blocking fetch task panicked or was cancelled.
    #[error("fetch task failed: {0}")]
    Join(String),

    #[error("source unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }
}

/// A store of watched resources.
pub trait ResourceSource: Send + Sync + 'static {
    fn fetch(&self, key: &ResourceKey) -> Result<Resource, FetchError>;
    fn list(&self) -> Result<Vec<ResourceKey>, FetchError>;
}

/// Resources stored as JSON files under a root directory:
/// `namespaces/<name>.json`, `cluster/<name>.json`, `repo/<name>.json`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &ResourceKey) -> PathBuf {
        self.root
            .join(key.kind.dir_name())
            .join(format!("{}.json", key.name))
    }

    /// Map a file path back to the resource it holds, if it is one.
    pub fn key_for_path(&self, path: &Path) -> Option<ResourceKey> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut parts = relative.components();
        let dir = parts.next()?.as_os_str().to_str()?;
        let file = Path::new(parts.next()?.as_os_str());
        if parts.next().is_some() || file.extension()? != "json" {
            return None;
        }
        let kind = ResourceKind::from_dir_name(dir)?;
        let name = file.file_stem()?.to_str()?;
        Some(ResourceKey::new(kind, name))
    }
}

impl ResourceSource for DirectorySource {
    fn fetch(&self, key: &ResourceKey) -> Result<Resource, FetchError> {
        let content = match fs::read_to_string(self.path_for(key)) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FetchError::NotFound(key.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        let resource = match key.kind {
            ResourceKind::Repo => Resource::Repo(serde_json::from_str::<RepoResource>(&content)?),
            ResourceKind::Namespace | ResourceKind::Cluster => {
                Resource::Config(serde_json::from_str::<ConfigResource>(&content)?)
            }
        };
        Ok(resource)
    }

    fn list(&self) -> Result<Vec<ResourceKey>, FetchError> {
        let mut keys = Vec::new();
        for kind in ResourceKind::ALL {
            let entries = match fs::read_dir(self.root.join(kind.dir_name())) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            for entry in entries {
                if let Some(key) = self.key_for_path(&entry?.path()) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Resources held in memory.
///
/// Lets embedding callers feed the monitor directly and lets tests inject
/// transient fetch failures.
#[derive(Debug, Default)]
pub struct MemorySource {
    resources: Mutex<HashMap<ResourceKey, Resource>>,
    failures: Mutex<HashMap<ResourceKey, u32>>,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a namespace or cluster config.
    pub fn put_config(&self, kind: ResourceKind, resource: ConfigResource) -> ResourceKey {
        let key = ResourceKey::new(kind, resource.name.clone());
        lock(&self.resources).insert(key.clone(), Resource::Config(resource));
        key
    }

    pub fn put_repo(&self, resource: RepoResource) -> ResourceKey {
        let key = ResourceKey::repo(resource.name.clone());
        lock(&self.resources).insert(key.clone(), Resource::Repo(resource));
        key
    }

    pub fn remove(&self, key: &ResourceKey) -> Option<Resource> {
        lock(&self.resources).remove(key)
    }

    /// Make the next `times` fetches of `key` fail with `Unavailable`.
    pub fn fail_next(&self, key: &ResourceKey, times: u32) {
        lock(&self.failures).insert(key.clone(), times);
    }

    /// Total fetch attempts so far, including failed ones.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl ResourceSource for MemorySource {
    fn fetch(&self, key: &ResourceKey) -> Result<Resource, FetchError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);

        if let Some(remaining) = lock(&self.failures).get_mut(key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(FetchError::Unavailable(format!("injected failure for {key}")));
            }
        }

        lock(&self.resources)
            .get(key)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(key.clone()))
    }

    fn list(&self) -> Result<Vec<ResourceKey>, FetchError> {
        let mut keys: Vec<_> = lock(&self.resources).keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("sync-monitor-source-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&root);
        root
    }

    #[test]
    fn test_key_for_path() {
        let source = DirectorySource::new("/data");
        assert_eq!(
            source.key_for_path(Path::new("/data/namespaces/ns-a.json")),
            Some(ResourceKey::namespace("ns-a"))
        );
        assert_eq!(
            source.key_for_path(Path::new("/data/repo/repo.json")),
            Some(ResourceKey::repo("repo"))
        );
        assert_eq!(source.key_for_path(Path::new("/data/namespaces/ns-a.yaml")), None);
        assert_eq!(source.key_for_path(Path::new("/data/other/ns-a.json")), None);
        assert_eq!(source.key_for_path(Path::new("/data/namespaces/x/ns-a.json")), None);
        assert_eq!(source.key_for_path(Path::new("/elsewhere/namespaces/ns-a.json")), None);
    }

    #[test]
    fn test_directory_fetch_and_list() {
        let root = temp_root("fetch");
        let source = DirectorySource::new(&root);
        fs::create_dir_all(root.join("namespaces")).unwrap();
        fs::create_dir_all(root.join("repo")).unwrap();
        fs::write(
            root.join("namespaces/ns-a.json"),
            r#"{"name":"ns-a","status":{"sync_state":"synced","import_time":100,"sync_time":110}}"#,
        )
        .unwrap();
        fs::write(root.join("repo/repo.json"), r#"{"name":"repo"}"#).unwrap();
        fs::write(root.join("namespaces/README.txt"), "ignored").unwrap();

        let keys = source.list().unwrap();
        assert_eq!(keys, vec![ResourceKey::namespace("ns-a"), ResourceKey::repo("repo")]);

        match source.fetch(&ResourceKey::namespace("ns-a")).unwrap() {
            Resource::Config(res) => assert_eq!(res.status.sync_time, 110),
            other => panic!("unexpected resource {other:?}"),
        }
        assert!(source.fetch(&ResourceKey::cluster("ns-a")).unwrap_err().is_not_found());

        fs::write(root.join("namespaces/broken.json"), "{").unwrap();
        let err = source.fetch(&ResourceKey::namespace("broken")).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));

        fs::remove_dir_all(&root).unwrap_or_default();
    }

    #[test]
    fn test_memory_injected_failures() {
        let source = MemorySource::new();
        let key = source.put_config(ResourceKind::Namespace, ConfigResource::new("ns-a", "synced", 1, 2));
        source.fail_next(&key, 2);

        assert!(matches!(source.fetch(&key), Err(FetchError::Unavailable(_))));
        assert!(matches!(source.fetch(&key), Err(FetchError::Unavailable(_))));
        assert!(source.fetch(&key).is_ok());
        assert_eq!(source.fetch_count(), 3);

        source.remove(&key);
        assert!(source.fetch(&key).unwrap_err().is_not_found());
    }
}

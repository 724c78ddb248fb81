//! Shared helpers for integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Poll `cond` until it holds or `timeout` elapses. Returns the last result.
#[allow(dead_code)]
pub async fn wait_until<F>(timeout: Duration, mut cond: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// A fresh, empty directory under the system temp dir.
#[allow(dead_code)]
pub fn temp_root(tag: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("sync-monitor-it-{}-{}", tag, std::process::id()));
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(&root).unwrap();
    root
}

/// Write a config resource file the way the syncing components would.
#[allow(dead_code)]
pub fn write_config(root: &Path, dir: &str, name: &str, tag: &str, import_time: u64, sync_time: u64) {
    let dir = root.join(dir);
    fs::create_dir_all(&dir).unwrap();
    let body = serde_json::json!({
        "name": name,
        "status": {
            "sync_state": tag,
            "import_time": import_time,
            "sync_time": sync_time,
        }
    });
    fs::write(dir.join(format!("{name}.json")), body.to_string()).unwrap();
}

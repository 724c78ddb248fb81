//! Change detection for watched resources.
//!
//! # Responsibilities
//! - Watch the source directory and enqueue keys of changed files
//! - Periodically relist the source so missed events still converge
//!
//! # Design Decisions
//! - Events carry no payload; workers always fetch the current object
//! - Resync enqueues keys seen now *and* in the previous listing, so a
//!   deletion whose event was lost is still reconciled (as not-found)

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::broadcast;
use tokio::time;

use crate::model::ResourceKey;
use crate::reconcile::controller::WorkQueue;
use crate::reconcile::source::{DirectorySource, ResourceSource};

/// Filesystem watcher feeding the work queue.
pub struct ResourceWatcher {
    source: Arc<DirectorySource>,
    queue: WorkQueue,
}

impl ResourceWatcher {
    pub fn new(source: Arc<DirectorySource>, queue: WorkQueue) -> Self {
        Self { source, queue }
    }

    /// Start watching in a background thread.
    ///
    /// The returned watcher must be kept alive for as long as events are
    /// wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let root = self.source.root().to_path_buf();
        let source = self.source;
        let queue = self.queue;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_create() || event.kind.is_modify() || event.kind.is_remove()) {
                        return;
                    }
                    for path in &event.paths {
                        if let Some(key) = source.key_for_path(path) {
                            tracing::debug!(resource = %key, kind = ?event.kind, "Resource change detected");
                            if !queue.enqueue(key) {
                                tracing::debug!("Work queue closed; dropping change event");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        tracing::info!(path = ?root, "Resource watcher started");
        Ok(watcher)
    }
}

/// Relist `source` every `interval` and enqueue what it finds, until
/// shutdown. The first listing happens immediately.
pub async fn run_resync(
    source: Arc<dyn ResourceSource>,
    queue: WorkQueue,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::info!(interval_secs = interval.as_secs(), "Resync loop starting");

    let mut ticker = time::interval(interval);
    let mut previous = HashSet::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                previous = resync_once(&source, &queue, previous).await;
            }
            _ = shutdown.recv() => {
                tracing::info!("Resync loop received shutdown signal, exiting loop");
                break;
            }
        }
    }
}

/// One relist pass. Returns the keys listed this time, or `previous`
/// unchanged if listing failed.
pub async fn resync_once(
    source: &Arc<dyn ResourceSource>,
    queue: &WorkQueue,
    previous: HashSet<ResourceKey>,
) -> HashSet<ResourceKey> {
    let src = source.clone();
    let current: HashSet<ResourceKey> = match tokio::task::spawn_blocking(move || src.list()).await {
        Ok(Ok(keys)) => keys.into_iter().collect(),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Resync listing failed");
            return previous;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Resync listing task failed");
            return previous;
        }
    };

    let mut enqueued = 0usize;
    for key in current.union(&previous) {
        if queue.enqueue(key.clone()) {
            enqueued += 1;
        }
    }
    tracing::debug!(listed = current.len(), enqueued, "Resync pass complete");
    current
}

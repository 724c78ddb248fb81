//! Work queue and reconcile workers.
//!
//! # Data Flow
//! ```text
//! watcher / resync / callers
//!     → WorkQueue::enqueue(key)
//!     → dispatcher shards by name hash
//!     → worker N: fetch (blocking pool, timeout) → adapter → aggregator
//!     → on Requeue: sleep(backoff) → back into the queue
//! ```
//!
//! # Design Decisions
//! - A key always lands on the same worker, so one key is never reconciled
//!   concurrently with itself; different keys run in parallel
//! - Delivery is at-least-once; duplicates are harmless because the
//!   aggregator is idempotent
//! - Each item runs in its own task; a panic while reconciling one key is
//!   logged and the worker moves on to the next key

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time;

use crate::aggregator::ClusterState;
use crate::config::WorkerConfig;
use crate::model::{Resource, ResourceKey};
use crate::reconcile::adapter::{reconcile_fetched, ReconcileOutcome};
use crate::reconcile::source::{FetchError, ResourceSource};
use crate::resilience::RequeueBackoff;

#[derive(Debug, Clone)]
struct QueueItem {
    key: ResourceKey,
    attempt: u32,
}

/// Handle for submitting keys to the controller.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    tx: mpsc::UnboundedSender<QueueItem>,
}

impl WorkQueue {
    /// Queue a key for reconciliation. Returns false once the controller
    /// has stopped.
    pub fn enqueue(&self, key: ResourceKey) -> bool {
        self.tx.send(QueueItem { key, attempt: 0 }).is_ok()
    }
}

/// Runs reconcile workers over the shared aggregate.
pub struct Controller {
    rx: mpsc::UnboundedReceiver<QueueItem>,
    ctx: Arc<WorkerContext>,
    workers: usize,
}

struct WorkerContext {
    state: Arc<ClusterState>,
    source: Arc<dyn ResourceSource>,
    fetch_timeout: Duration,
    backoff: RequeueBackoff,
    requeue: WorkQueue,
}

impl Controller {
    /// Create a controller and the queue that feeds it.
    pub fn new(
        state: Arc<ClusterState>,
        source: Arc<dyn ResourceSource>,
        config: &WorkerConfig,
        fetch_timeout: Duration,
    ) -> (Self, WorkQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = WorkQueue { tx };

        let ctx = Arc::new(WorkerContext {
            state,
            source,
            fetch_timeout,
            backoff: RequeueBackoff::new(config),
            requeue: queue.clone(),
        });

        let controller = Self {
            rx,
            ctx,
            workers: config.count.max(1),
        };
        (controller, queue)
    }

    /// Dispatch queued keys to workers until shutdown.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(workers = self.workers, "Reconcile controller starting");

        let mut shards = Vec::with_capacity(self.workers);
        let mut handles = Vec::with_capacity(self.workers);
        for id in 0..self.workers {
            let (tx, rx) = mpsc::unbounded_channel();
            shards.push(tx);
            handles.push(tokio::spawn(run_worker(id, rx, self.ctx.clone())));
        }

        loop {
            tokio::select! {
                item = self.rx.recv() => {
                    let Some(item) = item else { break };
                    let shard = shard_for(&item.key, shards.len());
                    if shards[shard].send(item).is_err() {
                        tracing::error!(worker = shard, "Reconcile worker stopped unexpectedly");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Controller received shutdown signal, draining workers");
                    break;
                }
            }
        }

        drop(shards);
        for handle in handles {
            let _ = handle.await;
        }
        tracing::info!("Reconcile controller stopped");
    }
}

fn shard_for(key: &ResourceKey, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.name.hash(&mut hasher);
    (hasher.finish() % shards as u64) as usize
}

async fn run_worker(id: usize, mut rx: mpsc::UnboundedReceiver<QueueItem>, ctx: Arc<WorkerContext>) {
    while let Some(item) = rx.recv().await {
        let key = item.key.clone();
        let task_ctx = ctx.clone();
        if let Err(e) = tokio::spawn(async move { task_ctx.process(item).await }).await {
            tracing::error!(worker = id, resource = %key, error = %e, "Reconcile task failed; continuing");
        }
    }
    tracing::debug!(worker = id, "Reconcile worker exiting");
}

impl WorkerContext {
    async fn process(&self, item: QueueItem) {
        let fetched = fetch_with_timeout(self.source.clone(), item.key.clone(), self.fetch_timeout).await;

        match reconcile_fetched(&self.state, &item.key, fetched) {
            ReconcileOutcome::Requeue => self.requeue_later(item),
            outcome => tracing::trace!(resource = %item.key, ?outcome, "Reconciled"),
        }
    }

    fn requeue_later(&self, item: QueueItem) {
        let attempt = item.attempt.saturating_add(1);
        let delay = self.backoff.delay(attempt);
        tracing::debug!(
            resource = %item.key,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Requeueing after backoff"
        );

        let tx = self.requeue.tx.clone();
        tokio::spawn(async move {
            time::sleep(delay).await;
            // Fails only when the controller has shut down.
            let _ = tx.send(QueueItem { key: item.key, attempt });
        });
    }
}

/// Fetch `key` on the blocking pool, giving up after `timeout`.
pub async fn fetch_with_timeout(
    source: Arc<dyn ResourceSource>,
    key: ResourceKey,
    timeout: Duration,
) -> Result<Resource, FetchError> {
    let task = tokio::task::spawn_blocking(move || source.fetch(&key));
    match time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(FetchError::Join(e.to_string())),
        Err(_) => Err(FetchError::Timeout {
            millis: timeout.as_millis() as u64,
        }),
    }
}

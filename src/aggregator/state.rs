//! The cluster state store.
//!
//! Holds what the monitor believes each tracked config's sync state to be,
//! along with the import/sync watermarks and the latest error tally. All
//! derived gauges are updated inside the same critical section as the map.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use serde::Serialize;

use crate::aggregator::error::{AggregatorError, AggregatorResult};
use crate::model::{unix_seconds, ClusterTimestamps, Component, ErrorTally, StateCounts, SyncState};
use crate::observability::metrics::{Gauge, Histogram, MetricsSink};

/// Concurrency-safe aggregate of config sync status.
///
/// Created once at start-up and shared via `Arc` with every reconcile
/// worker. Every mutator takes the single internal lock for its whole body.
pub struct ClusterState {
    inner: Mutex<Inner>,
    sink: Arc<dyn MetricsSink>,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, SyncState>,
    counts: StateCounts,
    timestamps: ClusterTimestamps,
    errors: ErrorTally,
}

/// Point-in-time copy of the aggregate, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSnapshot {
    pub records: BTreeMap<String, SyncState>,
    pub counts: BTreeMap<&'static str, u64>,
    /// Unix seconds.
    pub last_import_time: f64,
    /// Unix seconds.
    pub last_sync_time: f64,
    pub errors: ErrorTally,
}

impl ClusterState {
    /// Create an empty aggregate and publish the initial value of every
    /// gauge series, so each one exists before the first update.
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        let inner = Inner::default();
        for state in SyncState::ALL {
            sink.set_gauge(Gauge::Configs(state), 0.0);
        }
        for component in Component::ALL {
            sink.set_gauge(Gauge::Errors(component), 0.0);
        }
        sink.set_gauge(Gauge::LastImportTime, unix_seconds(inner.timestamps.last_import_time));
        sink.set_gauge(Gauge::LastSyncTime, unix_seconds(inner.timestamps.last_sync_time));

        Self {
            inner: Mutex::new(inner),
            sink,
        }
    }

    /// Record the latest observed status of a config.
    ///
    /// Advances the watermarks, observes a latency sample when the record
    /// enters `Synced`, moves the per-state gauges if the state changed, and
    /// stores the new state. An `Err` reports an invariant violation; the
    /// update has still been applied.
    pub fn process_status(
        &self,
        name: &str,
        state: SyncState,
        import_time: SystemTime,
        sync_time: SystemTime,
    ) -> AggregatorResult<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let mut violation = None;

        if name.is_empty() {
            violation = Some(AggregatorError::EmptyName);
        }

        if inner.timestamps.advance_import(import_time) {
            self.sink.set_gauge(Gauge::LastImportTime, unix_seconds(import_time));
        }
        if inner.timestamps.advance_sync(sync_time) {
            self.sink.set_gauge(Gauge::LastSyncTime, unix_seconds(sync_time));
        }

        let previous = inner.records.get(name).copied();
        let was_synced = previous.is_some_and(SyncState::is_synced);
        if state.is_synced() && !was_synced {
            let latency = unix_seconds(sync_time) - unix_seconds(import_time);
            if latency < 0.0 {
                tracing::warn!(
                    resource = name,
                    latency_secs = latency,
                    "Sync time precedes import time; recording negative latency"
                );
            }
            self.sink.observe(Histogram::SyncLatency, latency);
        }

        if previous != Some(state) {
            if let Some(old) = previous {
                if !inner.counts.decrement(old) {
                    violation.get_or_insert(AggregatorError::CountUnderflow { state: old });
                } else {
                    self.sink.dec_gauge(Gauge::Configs(old));
                }
            }
            inner.counts.increment(state);
            self.sink.inc_gauge(Gauge::Configs(state));
        }

        match inner.records.get_mut(name) {
            Some(slot) => *slot = state,
            None => {
                inner.records.insert(name.to_string(), state);
            }
        }

        match violation {
            Some(err) => {
                if matches!(err, AggregatorError::CountUnderflow { .. }) {
                    self.recount(inner);
                }
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Replace the per-stage error tally with the repo's current counts.
    pub fn process_repo_status(&self, source_errors: u64, import_errors: u64, sync_errors: u64) {
        let tally = ErrorTally::new(source_errors, import_errors, sync_errors);
        let mut inner = self.lock();
        inner.errors = tally;
        for component in Component::ALL {
            self.sink.set_gauge(Gauge::Errors(component), tally.get(component) as f64);
        }
    }

    /// Stop tracking a config whose resource no longer exists.
    ///
    /// Returns whether a record was removed. Deleting an unknown name is a
    /// no-op, since delete notifications may be delivered more than once.
    pub fn delete_record(&self, name: &str) -> bool {
        let mut guard = self.lock();
        let inner = &mut *guard;

        let Some(state) = inner.records.remove(name) else {
            return false;
        };

        if inner.counts.decrement(state) {
            self.sink.dec_gauge(Gauge::Configs(state));
        } else {
            tracing::error!(
                resource = name,
                state = %state,
                "{}",
                AggregatorError::CountUnderflow { state }
            );
            self.recount(inner);
        }
        true
    }

    /// Rebuild the counts from the map and republish every state gauge.
    fn recount(&self, inner: &mut Inner) {
        let mut counts = StateCounts::default();
        for state in inner.records.values() {
            counts.increment(*state);
        }
        inner.counts = counts;
        for (state, n) in counts.iter() {
            self.sink.set_gauge(Gauge::Configs(state), n as f64);
        }
    }

    pub fn state_of(&self, name: &str) -> Option<SyncState> {
        self.lock().records.get(name).copied()
    }

    /// Live number of records in `state`.
    pub fn count(&self, state: SyncState) -> u64 {
        self.lock().counts.get(state)
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    pub fn timestamps(&self) -> ClusterTimestamps {
        self.lock().timestamps
    }

    pub fn errors(&self) -> ErrorTally {
        self.lock().errors
    }

    pub fn snapshot(&self) -> ClusterSnapshot {
        let inner = self.lock();
        ClusterSnapshot {
            records: inner.records.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            counts: inner.counts.iter().map(|(s, n)| (s.as_label(), n)).collect(),
            last_import_time: unix_seconds(inner.timestamps.last_import_time),
            last_sync_time: unix_seconds(inner.timestamps.last_sync_time),
            errors: inner.errors,
        }
    }

    // A panic in one caller must not stop later updates.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define the metric series the aggregator publishes
//! - Expose a Prometheus-compatible scrape endpoint
//! - Provide an in-memory sink for tests and exporter-less runs
//!
//! # Metrics
//! - `syncmon_configs` (gauge): live records per sync state, label `state`
//! - `syncmon_errors` (gauge): current errors per pipeline stage, label `component`
//! - `syncmon_last_import_timestamp` (gauge): newest import time, Unix seconds
//! - `syncmon_last_sync_timestamp` (gauge): newest sync time, Unix seconds
//! - `syncmon_sync_latency_seconds` (histogram): import → synced latency
//!
//! # Design Decisions
//! - The aggregator talks to a `MetricsSink`, never to the exporter directly
//! - Sink calls must not block; they run under the aggregator lock

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};
use thiserror::Error;

use crate::model::{Component, SyncState};

pub const CONFIGS: &str = "syncmon_configs";
pub const ERRORS: &str = "syncmon_errors";
pub const LAST_IMPORT_TIMESTAMP: &str = "syncmon_last_import_timestamp";
pub const LAST_SYNC_TIMESTAMP: &str = "syncmon_last_sync_timestamp";
pub const SYNC_LATENCY_SECONDS: &str = "syncmon_sync_latency_seconds";

/// Default latency histogram buckets, in seconds.
pub const DEFAULT_LATENCY_BUCKETS: [f64; 10] = [0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0];

/// A gauge series, including its label value where it has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gauge {
    Configs(SyncState),
    Errors(Component),
    LastImportTime,
    LastSyncTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Histogram {
    SyncLatency,
}

/// Destination for the aggregator's metric updates.
pub trait MetricsSink: Send + Sync {
    fn set_gauge(&self, gauge: Gauge, value: f64);
    fn inc_gauge(&self, gauge: Gauge);
    fn dec_gauge(&self, gauge: Gauge);
    fn observe(&self, histogram: Histogram, value: f64);
}

/// Errors raised while installing the exporter.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to install Prometheus exporter: {0}")]
    Install(#[from] BuildError),
}

/// Install the global Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr, latency_buckets: &[f64]) -> Result<(), MetricsError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(Matcher::Full(SYNC_LATENCY_SECONDS.to_string()), latency_buckets)?
        .install()?;

    describe_metrics();
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

fn describe_metrics() {
    metrics::describe_gauge!(CONFIGS, "Number of tracked configs in each sync state");
    metrics::describe_gauge!(ERRORS, "Errors currently reported by each pipeline stage");
    metrics::describe_gauge!(LAST_IMPORT_TIMESTAMP, "Newest observed import time (Unix seconds)");
    metrics::describe_gauge!(LAST_SYNC_TIMESTAMP, "Newest observed sync time (Unix seconds)");
    metrics::describe_histogram!(
        SYNC_LATENCY_SECONDS,
        metrics::Unit::Seconds,
        "Time from import to synced for configs entering the synced state"
    );
}

/// Sink backed by the `metrics` facade, exported by whichever recorder is
/// installed (normally the Prometheus one from [`init_metrics`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusSink;

impl PrometheusSink {
    fn gauge(gauge: Gauge) -> metrics::Gauge {
        match gauge {
            Gauge::Configs(state) => metrics::gauge!(CONFIGS, "state" => state.as_label()),
            Gauge::Errors(component) => metrics::gauge!(ERRORS, "component" => component.as_label()),
            Gauge::LastImportTime => metrics::gauge!(LAST_IMPORT_TIMESTAMP),
            Gauge::LastSyncTime => metrics::gauge!(LAST_SYNC_TIMESTAMP),
        }
    }
}

impl MetricsSink for PrometheusSink {
    fn set_gauge(&self, gauge: Gauge, value: f64) {
        Self::gauge(gauge).set(value);
    }

    fn inc_gauge(&self, gauge: Gauge) {
        Self::gauge(gauge).increment(1.0);
    }

    fn dec_gauge(&self, gauge: Gauge) {
        Self::gauge(gauge).decrement(1.0);
    }

    fn observe(&self, histogram: Histogram, value: f64) {
        match histogram {
            Histogram::SyncLatency => metrics::histogram!(SYNC_LATENCY_SECONDS).record(value),
        }
    }
}

/// Sink that keeps every value in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    inner: Mutex<MemoryRecords>,
}

#[derive(Debug, Default)]
struct MemoryRecords {
    gauges: HashMap<Gauge, f64>,
    samples: HashMap<Histogram, Vec<f64>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a gauge; zero if it was never touched.
    pub fn gauge(&self, gauge: Gauge) -> f64 {
        self.records().gauges.get(&gauge).copied().unwrap_or(0.0)
    }

    /// Every sample observed into a histogram, in order.
    pub fn samples(&self, histogram: Histogram) -> Vec<f64> {
        self.records().samples.get(&histogram).cloned().unwrap_or_default()
    }

    fn records(&self) -> std::sync::MutexGuard<'_, MemoryRecords> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MetricsSink for MemorySink {
    fn set_gauge(&self, gauge: Gauge, value: f64) {
        self.records().gauges.insert(gauge, value);
    }

    fn inc_gauge(&self, gauge: Gauge) {
        *self.records().gauges.entry(gauge).or_insert(0.0) += 1.0;
    }

    fn dec_gauge(&self, gauge: Gauge) {
        *self.records().gauges.entry(gauge).or_insert(0.0) -= 1.0;
    }

    fn observe(&self, histogram: Histogram, value: f64) {
        self.records().samples.entry(histogram).or_default().push(value);
    }
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the monitor.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::observability::metrics::DEFAULT_LATENCY_BUCKETS;

/// Root configuration for the sync monitor.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MonitorConfig {
    /// Where watched resources are read from.
    pub source: SourceConfig,

    /// Reconcile worker pool and requeue backoff.
    pub workers: WorkerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Diagnostics API.
    pub admin: AdminConfig,
}

/// Resource source configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Root directory holding `namespaces/`, `cluster/` and `repo/`.
    pub root_dir: String,

    /// Watch the root directory for changes.
    pub watch: bool,

    /// Full relist interval in seconds.
    pub resync_secs: u64,

    /// Timeout for a single resource fetch in milliseconds.
    pub fetch_timeout_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root_dir: "/var/lib/sync-monitor/resources".to_string(),
            watch: true,
            resync_secs: 60,
            fetch_timeout_ms: 2000,
        }
    }
}

/// Reconcile worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of reconcile workers. Keys are sharded across them by name.
    pub count: usize,

    /// Base delay for exponential requeue backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum requeue delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: 4,
            base_delay_ms: 100,
            max_delay_ms: 30_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Sync latency histogram buckets in seconds.
    pub latency_buckets: Vec<f64>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
            latency_buckets: DEFAULT_LATENCY_BUCKETS.to_vec(),
        }
    }
}

/// Admin diagnostics API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: MonitorConfig = toml::from_str("").unwrap();
        assert_eq!(config.workers.count, 4);
        assert_eq!(config.source.fetch_timeout_ms, 2000);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
        assert_eq!(config.observability.latency_buckets.len(), 10);
    }

    #[test]
    fn test_partial_override() {
        let config: MonitorConfig = toml::from_str(
            r#"
            [source]
            root_dir = "/tmp/resources"
            watch = false

            [observability]
            log_format = "json"
            latency_buckets = [1.0, 5.0]
            "#,
        )
        .unwrap();
        assert_eq!(config.source.root_dir, "/tmp/resources");
        assert!(!config.source.watch);
        assert_eq!(config.source.resync_secs, 60);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.latency_buckets, vec![1.0, 5.0]);
    }
}

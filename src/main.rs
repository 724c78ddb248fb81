//! Config Sync Status Monitor (v1)
//!
//! Watches namespace configs, cluster configs and the repo status resource,
//! and exports their aggregated sync status as Prometheus metrics.
//!
//! # Architecture Overview
//!
//! ```text
//!   resource files ──▶ watcher / resync ──▶ work queue ──▶ reconcile workers
//!                                                              │ fetch (timeout)
//!                                                              ▼
//!                                                          adapters
//!                                                              │
//!                                                              ▼
//!                          admin API ◀── read ──  ClusterState (one lock)
//!                                                              │ gauges / histogram
//!                                                              ▼
//!                                                     Prometheus endpoint
//! ```

use std::path::PathBuf;

use clap::Parser;

use sync_monitor::config::{load_config, MonitorConfig};
use sync_monitor::lifecycle;
use sync_monitor::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "sync-monitor")]
#[command(about = "Aggregates config sync status into metrics", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => MonitorConfig::default(),
    };

    init_logging(&config.observability.log_level, config.observability.log_format)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?args.config,
        root = %config.source.root_dir,
        metrics_enabled = config.observability.metrics_enabled,
        admin_enabled = config.admin.enabled,
        "sync-monitor starting"
    );

    lifecycle::run(config).await?;
    Ok(())
}

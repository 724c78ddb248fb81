//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start background tasks (controller, watcher, resync, admin API)
//! - Stop them in order on shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The metrics exporter is installed before the aggregator publishes its
//!   initial zero gauges

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use notify::RecommendedWatcher;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::admin::serve_admin;
use crate::aggregator::ClusterState;
use crate::config::MonitorConfig;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_signal;
use crate::observability::metrics::{init_metrics, MemorySink, MetricsError, MetricsSink, PrometheusSink};
use crate::reconcile::{run_resync, Controller, DirectorySource, ResourceWatcher};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error("invalid address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
}

/// A started monitor and its background tasks.
pub struct Monitor {
    state: Arc<ClusterState>,
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<()>>,
    admin_addr: Option<SocketAddr>,
    _watcher: Option<RecommendedWatcher>,
}

impl Monitor {
    /// Start every subsystem described by `config`.
    pub async fn start(config: &MonitorConfig) -> Result<Self, StartupError> {
        let sink: Arc<dyn MetricsSink> = if config.observability.metrics_enabled {
            let addr: SocketAddr = config.observability.metrics_address.parse()?;
            init_metrics(addr, &config.observability.latency_buckets)?;
            Arc::new(PrometheusSink)
        } else {
            tracing::info!("Metrics endpoint disabled; keeping metrics in memory");
            Arc::new(MemorySink::new())
        };
        let state = Arc::new(ClusterState::new(sink));

        let source = Arc::new(DirectorySource::new(&config.source.root_dir));
        std::fs::create_dir_all(source.root())?;

        let shutdown = Shutdown::new();
        let mut tasks = Vec::new();

        let (controller, queue) = Controller::new(
            state.clone(),
            source.clone(),
            &config.workers,
            Duration::from_millis(config.source.fetch_timeout_ms),
        );
        tasks.push(tokio::spawn(controller.run(shutdown.subscribe())));

        let watcher = if config.source.watch {
            Some(ResourceWatcher::new(source.clone(), queue.clone()).run()?)
        } else {
            tracing::info!("Resource watching disabled; relying on resync");
            None
        };

        tasks.push(tokio::spawn(run_resync(
            source,
            queue,
            Duration::from_secs(config.source.resync_secs),
            shutdown.subscribe(),
        )));

        let mut admin_addr = None;
        if config.admin.enabled {
            let listener = TcpListener::bind(&config.admin.bind_address).await?;
            admin_addr = Some(listener.local_addr()?);
            let state = state.clone();
            let shutdown_rx = shutdown.subscribe();
            tasks.push(tokio::spawn(async move {
                if let Err(e) = serve_admin(listener, state, shutdown_rx).await {
                    tracing::error!(error = %e, "Admin API failed");
                }
            }));
        }

        tracing::info!(
            root = %config.source.root_dir,
            workers = config.workers.count,
            "Sync monitor running"
        );

        Ok(Self {
            state,
            shutdown,
            tasks,
            admin_addr,
            _watcher: watcher,
        })
    }

    pub fn state(&self) -> &Arc<ClusterState> {
        &self.state
    }

    /// Address the admin API is bound to, if enabled.
    pub fn admin_addr(&self) -> Option<SocketAddr> {
        self.admin_addr
    }

    /// Signal every task to stop and wait for them.
    pub async fn stop(self) {
        self.shutdown.trigger();
        for task in self.tasks {
            let _ = task.await;
        }
        tracing::info!(tracked = self.state.len(), "Shutdown complete");
    }
}

/// Run the monitor until a termination signal arrives.
pub async fn run(config: MonitorConfig) -> Result<(), StartupError> {
    let monitor = Monitor::start(&config).await?;
    wait_for_signal().await;
    monitor.stop().await;
    Ok(())
}

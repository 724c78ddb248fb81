//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (gauges, histograms via MetricsSink)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every log event (resource, state, error)
//! - Metric updates are cheap and never block
//! - The aggregator depends on the sink trait, not on the exporter

pub mod logging;
pub mod metrics;

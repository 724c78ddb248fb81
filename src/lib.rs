//! Config sync status monitor library.
//!
//! Aggregates the sync status of independently reconciled config resources
//! into per-state counts, error tallies and latency metrics.

pub mod admin;
pub mod aggregator;
pub mod config;
pub mod lifecycle;
pub mod model;
pub mod observability;
pub mod reconcile;
pub mod resilience;

pub use aggregator::{AggregatorError, ClusterState};
pub use config::MonitorConfig;
pub use lifecycle::{Monitor, Shutdown};
pub use model::SyncState;

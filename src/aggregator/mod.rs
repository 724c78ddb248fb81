//! Cluster state aggregator.
//!
//! # Data Flow
//! ```text
//! Reconcile adapters (any number of workers):
//!     → process_status(name, state, import_time, sync_time)
//!     → process_repo_status(source, import, sync)
//!     → delete_record(name)
//!
//! Inside one lock:
//!     record map + state counts + watermarks + error tally
//!     → metric deltas to the MetricsSink, in mutation order
//! ```
//!
//! # Design Decisions
//! - Single exclusive lock; gauges are updated in the same critical section
//!   as the map so they never drift from it
//! - Invariant violations are returned but the mutation is still applied
//! - No I/O, no awaits, no retries

pub mod error;
pub mod state;

pub use error::{AggregatorError, AggregatorResult};
pub use state::{ClusterSnapshot, ClusterState};

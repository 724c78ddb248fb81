//! Config record model.
//!
//! # Data Flow
//! ```text
//! resource files (JSON)
//!     → resource.rs (ConfigResource / RepoResource, serde)
//!     → reconcile adapters extract (state, import_time, sync_time)
//!     → sync_state.rs (SyncState tag)
//!     → aggregator stores name → SyncState
//!
//! Aggregate bookkeeping (cluster.rs):
//!     ClusterTimestamps (watermarks), ErrorTally, StateCounts
//! ```
//!
//! # Design Decisions
//! - Only the state is kept per record; timestamps are transient
//! - Watermarks only move forward
//! - Error tally is overwritten, never accumulated

pub mod cluster;
pub mod resource;
pub mod sync_state;

pub use cluster::{unix_seconds, ClusterTimestamps, Component, ErrorTally, StateCounts};
pub use resource::{ConfigResource, RepoResource, Resource, ResourceKey, ResourceKind};
pub use sync_state::SyncState;

//! Reconciliation subsystem.
//!
//! # Data Flow
//! ```text
//! Change detection (watcher.rs):
//!     file event / periodic resync
//!     → WorkQueue (controller.rs)
//!
//! Reconcile (controller.rs):
//!     worker picks key
//!     → source.rs fetch (timeout)
//!     → adapter.rs maps result to one aggregator call
//!     → on transient failure: requeue with backoff
//! ```
//!
//! # Design Decisions
//! - Resource kinds are a closed set handled by one adapter function
//! - Adapters own retries; the aggregator only ever sees final results
//! - Control flow is one-way: adapters call the aggregator, never back

pub mod adapter;
pub mod controller;
pub mod source;
pub mod watcher;

pub use adapter::{reconcile_fetched, ReconcileOutcome};
pub use controller::{fetch_with_timeout, Controller, WorkQueue};
pub use source::{DirectorySource, FetchError, MemorySource, ResourceSource};
pub use watcher::{resync_once, run_resync, ResourceWatcher};

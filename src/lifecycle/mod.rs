//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Metrics exporter → Aggregator → Controller → Watcher/Resync → Admin API
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → loops exit → workers drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: the aggregator exists before anything can feed it
//! - Aggregate state is not persisted; it is rebuilt by the first resync

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{run, Monitor, StartupError};

//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Failed resource fetch (not "not found"):
//!     → backoff.rs (delay grows with each attempt, capped, jittered)
//!     → key re-enters the work queue after the delay
//! ```
//!
//! # Design Decisions
//! - Retrying is the reconcile layer's job; the aggregator never retries
//! - Every fetch has a deadline (see reconcile::controller)
//! - Jitter spreads requeues of keys that failed together

pub mod backoff;
pub use backoff::RequeueBackoff;

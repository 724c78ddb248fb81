//! Aggregator error definitions.

use thiserror::Error;

use crate::model::sync_state::ParseSyncStateError;
use crate::model::SyncState;

/// Invariant violations detected by the aggregator.
///
/// None of these abort processing: the mutation that raised them has
/// already been applied when the error is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregatorError {
    /// A status notification arrived without a resource name.
    #[error("status notification has an empty resource name")]
    EmptyName,

    /// The live count for a state was already zero when a record left it.
    #[error("live count for state {state} would drop below zero")]
    CountUnderflow { state: SyncState },

    /// The resource reported a state tag the monitor does not know.
    #[error(transparent)]
    UnknownStateTag(#[from] ParseSyncStateError),
}

/// Result type for aggregator operations.
pub type AggregatorResult<T> = Result<T, AggregatorError>;

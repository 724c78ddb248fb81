//! Resource-kind adapters.
//!
//! # Responsibilities
//! - Turn a fetch result into exactly one aggregator call (or none)
//! - Decide whether a failed fetch must be requeued
//!
//! # Rules
//! ```text
//! config found      → process_status(kind/name, state, import_time, sync_time)
//! config bad times  → log, no aggregator call, no requeue
//! config not found  → delete_record(kind/name)
//! repo found        → process_repo_status(source, import, sync)
//! repo not found    → nothing
//! any other failure → log, requeue, no aggregator call
//! ```
//!
//! Records are named by the full key (`namespace/foo`, `cluster/foo`), so a
//! namespace config and a cluster config with the same name never share one.

use crate::aggregator::{AggregatorError, ClusterState};
use crate::model::{ConfigResource, ErrorTally, RepoResource, Resource, ResourceKey, ResourceKind, SyncState};
use crate::reconcile::source::FetchError;

/// What a reconcile pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A config's status was recorded.
    Recorded(SyncState),
    /// The config is gone; `was_tracked` tells whether a record was removed.
    Deleted { was_tracked: bool },
    /// The repo's error counts were recorded.
    RepoRecorded(ErrorTally),
    /// Nothing to record.
    Skipped,
    /// The resource content is unusable; retrying would read the same content.
    Rejected,
    /// The fetch failed and the key must be retried.
    Requeue,
}

/// Apply the result of fetching `key` to the aggregate.
pub fn reconcile_fetched(
    state: &ClusterState,
    key: &ResourceKey,
    fetched: Result<Resource, FetchError>,
) -> ReconcileOutcome {
    match (key.kind, fetched) {
        (ResourceKind::Namespace | ResourceKind::Cluster, Ok(Resource::Config(resource))) => {
            record_config(state, key, &resource)
        }
        (ResourceKind::Repo, Ok(Resource::Repo(resource))) => record_repo(state, &resource),
        (_, Ok(_)) => {
            tracing::error!(resource = %key, "Fetched resource does not match the requested kind");
            ReconcileOutcome::Skipped
        }
        (ResourceKind::Repo, Err(FetchError::NotFound(_))) => {
            tracing::info!(resource = %key, "Repo status resource not found; keeping last error counts");
            ReconcileOutcome::Skipped
        }
        (_, Err(FetchError::NotFound(_))) => {
            let was_tracked = state.delete_record(&key.to_string());
            tracing::debug!(resource = %key, was_tracked, "Config deleted");
            ReconcileOutcome::Deleted { was_tracked }
        }
        (_, Err(e)) => {
            tracing::warn!(resource = %key, error = %e, "Failed to fetch resource; requeueing");
            ReconcileOutcome::Requeue
        }
    }
}

fn record_config(state: &ClusterState, key: &ResourceKey, resource: &ConfigResource) -> ReconcileOutcome {
    let sync_state = match resource.status.sync_state.parse::<SyncState>() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(
                resource = %key,
                error = %AggregatorError::from(e),
                "Malformed sync state; recording as unknown"
            );
            SyncState::Unknown
        }
    };

    let (Some(import_time), Some(sync_time)) = (resource.import_time(), resource.sync_time()) else {
        tracing::error!(
            resource = %key,
            import_time = resource.status.import_time,
            sync_time = resource.status.sync_time,
            "Status time out of range; ignoring resource"
        );
        return ReconcileOutcome::Rejected;
    };

    if let Err(e) = state.process_status(&key.to_string(), sync_state, import_time, sync_time) {
        tracing::warn!(resource = %key, error = %e, "Status recorded with invariant violation");
    }
    tracing::debug!(resource = %key, state = %sync_state, "Status recorded");
    ReconcileOutcome::Recorded(sync_state)
}

fn record_repo(state: &ClusterState, resource: &RepoResource) -> ReconcileOutcome {
    let tally = resource.error_tally();
    state.process_repo_status(tally.source, tally.importer, tally.syncer);
    tracing::debug!(
        repo = %resource.name,
        source_errors = tally.source,
        import_errors = tally.importer,
        sync_errors = tally.syncer,
        "Repo status recorded"
    );
    ReconcileOutcome::RepoRecorded(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::resource::StageStatus;
    use crate::observability::metrics::{Gauge, Histogram, MemorySink};
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};

    fn setup() -> (Arc<MemorySink>, ClusterState) {
        let sink = Arc::new(MemorySink::new());
        let state = ClusterState::new(sink.clone());
        (sink, state)
    }

    fn config(name: &str, tag: &str, import: u64, sync: u64) -> Result<Resource, FetchError> {
        Ok(Resource::Config(ConfigResource::new(name, tag, import, sync)))
    }

    #[test]
    fn test_found_config_records_status() {
        let (sink, state) = setup();
        let key = ResourceKey::namespace("ns-a");

        let outcome = reconcile_fetched(&state, &key, config("ns-a", "stale", 100, 0));
        assert_eq!(outcome, ReconcileOutcome::Recorded(SyncState::Pending));

        let outcome = reconcile_fetched(&state, &key, config("ns-a", "synced", 100, 110));
        assert_eq!(outcome, ReconcileOutcome::Recorded(SyncState::Synced));
        assert_eq!(sink.samples(Histogram::SyncLatency), vec![10.0]);
    }

    #[test]
    fn test_malformed_tag_recorded_as_unknown() {
        let (sink, state) = setup();
        let key = ResourceKey::cluster("cluster");

        let outcome = reconcile_fetched(&state, &key, config("cluster", "applying", 1, 0));
        assert_eq!(outcome, ReconcileOutcome::Recorded(SyncState::Unknown));
        assert_eq!(sink.gauge(Gauge::Configs(SyncState::Unknown)), 1.0);
    }

    #[test]
    fn test_not_found_deletes() {
        let (_sink, state) = setup();
        let key = ResourceKey::namespace("ns-a");
        reconcile_fetched(&state, &key, config("ns-a", "synced", 1, 2));

        let gone = || Err(FetchError::NotFound(key.clone()));
        assert_eq!(
            reconcile_fetched(&state, &key, gone()),
            ReconcileOutcome::Deleted { was_tracked: true }
        );
        assert_eq!(
            reconcile_fetched(&state, &key, gone()),
            ReconcileOutcome::Deleted { was_tracked: false }
        );
        assert!(state.is_empty());
    }

    #[test]
    fn test_transient_failure_touches_nothing() {
        let (sink, state) = setup();
        let key = ResourceKey::namespace("ns-a");
        reconcile_fetched(&state, &key, config("ns-a", "error", 5, 0));

        let outcome = reconcile_fetched(&state, &key, Err(FetchError::Timeout { millis: 2000 }));
        assert_eq!(outcome, ReconcileOutcome::Requeue);
        assert_eq!(state.state_of("namespace/ns-a"), Some(SyncState::Error));
        assert_eq!(sink.gauge(Gauge::Configs(SyncState::Error)), 1.0);
    }

    #[test]
    fn test_out_of_range_time_is_rejected() {
        let (sink, state) = setup();
        let key = ResourceKey::namespace("ns-a");
        reconcile_fetched(&state, &key, config("ns-a", "pending", 5, 0));

        let outcome = reconcile_fetched(&state, &key, config("ns-a", "synced", u64::MAX, 0));
        assert_eq!(outcome, ReconcileOutcome::Rejected);
        let outcome = reconcile_fetched(&state, &key, config("ns-a", "synced", 5, u64::MAX));
        assert_eq!(outcome, ReconcileOutcome::Rejected);

        assert_eq!(state.state_of("namespace/ns-a"), Some(SyncState::Pending));
        assert!(sink.samples(Histogram::SyncLatency).is_empty());
        assert_eq!(state.timestamps().last_import_time, UNIX_EPOCH + Duration::from_secs(5));
    }

    #[test]
    fn test_same_name_in_both_kinds_is_tracked_separately() {
        let (sink, state) = setup();
        let ns = ResourceKey::namespace("foo");
        let cluster = ResourceKey::cluster("foo");

        reconcile_fetched(&state, &ns, config("foo", "synced", 1, 2));
        reconcile_fetched(&state, &cluster, config("foo", "error", 1, 0));
        assert_eq!(state.len(), 2);
        assert_eq!(state.state_of("namespace/foo"), Some(SyncState::Synced));
        assert_eq!(state.state_of("cluster/foo"), Some(SyncState::Error));

        let outcome = reconcile_fetched(&state, &cluster, Err(FetchError::NotFound(cluster.clone())));
        assert_eq!(outcome, ReconcileOutcome::Deleted { was_tracked: true });
        assert_eq!(state.state_of("namespace/foo"), Some(SyncState::Synced));
        assert_eq!(sink.gauge(Gauge::Configs(SyncState::Synced)), 1.0);
        assert_eq!(sink.gauge(Gauge::Configs(SyncState::Error)), 0.0);
    }

    #[test]
    fn test_repo_status() {
        let (sink, state) = setup();
        let key = ResourceKey::repo("repo");
        let mut repo = RepoResource {
            name: "repo".into(),
            ..Default::default()
        };
        repo.status.source = StageStatus {
            errors: vec!["a".into(), "b".into(), "c".into()],
        };

        let outcome = reconcile_fetched(&state, &key, Ok(Resource::Repo(repo)));
        assert_eq!(outcome, ReconcileOutcome::RepoRecorded(ErrorTally::new(3, 0, 0)));
        assert_eq!(sink.gauge(Gauge::Errors(crate::model::Component::Source)), 3.0);

        // A missing repo resource keeps the last counts.
        let outcome = reconcile_fetched(&state, &key, Err(FetchError::NotFound(key.clone())));
        assert_eq!(outcome, ReconcileOutcome::Skipped);
        assert_eq!(state.errors(), ErrorTally::new(3, 0, 0));
    }

    #[test]
    fn test_kind_mismatch_is_skipped() {
        let (_sink, state) = setup();
        let key = ResourceKey::repo("repo");
        let outcome = reconcile_fetched(&state, &key, config("repo", "synced", 1, 2));
        assert_eq!(outcome, ReconcileOutcome::Skipped);
        assert!(state.is_empty());
    }
}

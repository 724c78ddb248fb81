use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::aggregator::ClusterState;
use crate::model::{ErrorTally, SyncState};

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub tracked: usize,
    pub counts: BTreeMap<&'static str, u64>,
}

#[derive(Debug, Serialize)]
pub struct ErrorSummary {
    pub errors: ErrorTally,
    pub last_import_time: f64,
    pub last_sync_time: f64,
}

pub async fn get_status(State(state): State<Arc<ClusterState>>) -> Json<SystemStatus> {
    let snapshot = state.snapshot();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        tracked: snapshot.records.len(),
        counts: snapshot.counts,
    })
}

pub async fn get_records(State(state): State<Arc<ClusterState>>) -> Json<BTreeMap<String, SyncState>> {
    Json(state.snapshot().records)
}

pub async fn get_errors(State(state): State<Arc<ClusterState>>) -> Json<ErrorSummary> {
    let snapshot = state.snapshot();
    Json(ErrorSummary {
        errors: snapshot.errors,
        last_import_time: snapshot.last_import_time,
        last_sync_time: snapshot.last_sync_time,
    })
}

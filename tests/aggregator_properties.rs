//! Property tests for the cluster state aggregator under concurrent use.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sync_monitor::observability::metrics::{Gauge, Histogram, MemorySink};
use sync_monitor::{ClusterState, SyncState};

fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

fn assert_consistent(sink: &MemorySink, state: &ClusterState) {
    let snapshot = state.snapshot();
    for s in SyncState::ALL {
        let live = snapshot.records.values().filter(|v| **v == s).count() as f64;
        assert_eq!(sink.gauge(Gauge::Configs(s)), live, "gauge for {s} drifted from map");
    }
}

#[test]
fn test_concurrent_mutators_keep_gauges_consistent() {
    let sink = Arc::new(MemorySink::new());
    let state = Arc::new(ClusterState::new(sink.clone()));
    let names: Vec<String> = (0..32).map(|i| format!("ns-{i}")).collect();
    let names = Arc::new(names);

    let mut handles = Vec::new();
    for worker in 0..8u64 {
        let state = state.clone();
        let names = names.clone();
        handles.push(thread::spawn(move || {
            let mut rng = StdRng::seed_from_u64(worker);
            let mut max_import = 0;
            let mut max_sync = 0;
            for _ in 0..2_000 {
                let name = &names[rng.gen_range(0..names.len())];
                if rng.gen_ratio(1, 6) {
                    state.delete_record(name);
                    continue;
                }
                let s = SyncState::ALL[rng.gen_range(0..SyncState::ALL.len())];
                let import = rng.gen_range(1..10_000);
                let sync = rng.gen_range(1..10_000);
                max_import = max_import.max(import);
                max_sync = max_sync.max(sync);
                state.process_status(name, s, at(import), at(sync)).unwrap();
            }
            (max_import, max_sync)
        }));
    }

    let mut max_import = 0;
    let mut max_sync = 0;
    for handle in handles {
        let (i, s) = handle.join().unwrap();
        max_import = max_import.max(i);
        max_sync = max_sync.max(s);
    }

    assert_consistent(&sink, &state);
    let ts = state.timestamps();
    assert_eq!(ts.last_import_time, at(max_import));
    assert_eq!(ts.last_sync_time, at(max_sync));
    assert_eq!(sink.gauge(Gauge::LastImportTime), max_import as f64);
    assert_eq!(sink.gauge(Gauge::LastSyncTime), max_sync as f64);
}

#[test]
fn test_watermarks_monotonic_across_calls() {
    let sink = Arc::new(MemorySink::new());
    let state = ClusterState::new(sink.clone());
    let times = [50, 20, 90, 90, 10, 300, 299];

    let mut last_import = UNIX_EPOCH;
    let mut highest = 0;
    for (i, t) in times.iter().enumerate() {
        state
            .process_status(&format!("ns-{i}"), SyncState::Pending, at(*t), at(0))
            .unwrap();
        highest = highest.max(*t);
        let now = state.timestamps().last_import_time;
        assert!(now >= last_import);
        assert_eq!(now, at(highest));
        last_import = now;
    }
}

#[test]
fn test_synced_repeats_emit_no_extra_samples() {
    let sink = Arc::new(MemorySink::new());
    let state = ClusterState::new(sink.clone());

    state.process_status("ns-a", SyncState::Pending, at(1_000), at(0)).unwrap();
    state.process_status("ns-a", SyncState::Synced, at(1_000), at(1_030)).unwrap();
    for extra in 0..5 {
        state
            .process_status("ns-a", SyncState::Synced, at(1_000), at(1_031 + extra))
            .unwrap();
    }

    assert_eq!(sink.samples(Histogram::SyncLatency), vec![30.0]);
    assert_eq!(sink.gauge(Gauge::Configs(SyncState::Synced)), 1.0);
}

#[test]
fn test_concurrent_delete_of_same_name() {
    let sink = Arc::new(MemorySink::new());
    let state = Arc::new(ClusterState::new(sink.clone()));
    state.process_status("ns-a", SyncState::Error, at(1), at(0)).unwrap();

    let removed: usize = (0..8)
        .map(|_| {
            let state = state.clone();
            thread::spawn(move || state.delete_record("ns-a"))
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| usize::from(h.join().unwrap()))
        .sum();

    assert_eq!(removed, 1);
    assert_eq!(sink.gauge(Gauge::Configs(SyncState::Error)), 0.0);
    assert!(state.is_empty());
}

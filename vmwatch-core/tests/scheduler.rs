//! Integration tests for the reconciliation scheduler.
//!
//! Time is paused, so intervals and hypervisor latency advance instantly.

mod common;

use common::MockHypervisor;
use std::sync::Arc;
use std::time::Duration;
use vmwatch_core::{InventoryStore, Reconciler, Scheduler};

#[tokio::test(start_paused = true)]
async fn test_one_cycle_per_tick() {
    let hypervisor = MockHypervisor::new();
    hypervisor.add_domain(1, "web1", 1_000);
    let store = InventoryStore::new();
    let reconciler = Arc::new(Reconciler::new(Arc::new(hypervisor.clone()), store.clone()));

    let handle = Scheduler::new(reconciler, Duration::from_secs(10)).spawn();

    // Ticks at 0s, 10s, 20s and 30s
    tokio::time::sleep(Duration::from_secs(35)).await;
    handle.abort();

    assert_eq!(hypervisor.state().connects, 4);
    assert!(store.snapshot("web1").await.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_slow_cycles_never_overlap() {
    let hypervisor = MockHypervisor::new();
    hypervisor.add_domain(1, "web1", 1_000);
    hypervisor.state().list_delay = Duration::from_secs(25);

    let reconciler = Arc::new(
        Reconciler::new(Arc::new(hypervisor.clone()), InventoryStore::new())
            .with_call_timeout(Duration::from_secs(60)),
    );

    let handle = Scheduler::new(reconciler, Duration::from_secs(10)).spawn();
    tokio::time::sleep(Duration::from_secs(100)).await;
    handle.abort();

    let state = hypervisor.state();
    assert_eq!(state.max_in_flight, 1);
    assert!(state.cycle_starts.len() >= 3, "expected several cycles, got {}", state.cycle_starts.len());

    // A late cycle delays the next one instead of running alongside it
    for pair in state.cycle_starts.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(25));
    }
}

#[tokio::test]
async fn test_zero_interval_is_clamped() {
    let hypervisor = MockHypervisor::new();
    let reconciler = Arc::new(Reconciler::new(Arc::new(hypervisor), InventoryStore::new()));
    let scheduler = Scheduler::new(reconciler, Duration::ZERO);
    assert!(scheduler.interval() > Duration::ZERO);
}

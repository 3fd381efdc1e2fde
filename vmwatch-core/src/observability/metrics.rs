//! Core metrics definitions.
//!
//! All metrics follow Prometheus naming conventions:
//! - `_total` suffix for counters
//! - `_seconds` suffix for histograms measuring duration

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Register all core metrics with descriptions.
///
/// This ensures metrics appear in `/metrics` with proper metadata.
pub fn register_core_metrics() {
    describe_counter!("vmwatch_reconcile_cycles_total", "Total reconciliation cycles completed");
    describe_counter!(
        "vmwatch_reconcile_failures_total",
        "Total reconciliation cycles aborted (by reason: connect, listing, timeout)"
    );
    describe_histogram!(
        "vmwatch_reconcile_duration_seconds",
        "Time taken by one reconciliation cycle, including hypervisor calls"
    );
    describe_counter!(
        "vmwatch_domain_failures_total",
        "Total per-domain sampling failures (by stage: lookup, info, name)"
    );
    describe_counter!("vmwatch_vm_evicted_total", "Total VM records evicted from the inventory");
    describe_gauge!("vmwatch_vm_count", "Current number of VMs in the inventory");
}

pub fn record_cycle(duration: Duration, evicted: usize, inventory_size: usize) {
    counter!("vmwatch_reconcile_cycles_total").increment(1);
    histogram!("vmwatch_reconcile_duration_seconds").record(duration.as_secs_f64());
    counter!("vmwatch_vm_evicted_total").increment(evicted as u64);
    gauge!("vmwatch_vm_count").set(inventory_size as f64);
}

pub fn record_cycle_failure(reason: &str) {
    counter!("vmwatch_reconcile_failures_total", "reason" => reason.to_string()).increment(1);
}

pub fn record_domain_failure(stage: &str) {
    counter!("vmwatch_domain_failures_total", "stage" => stage.to_string()).increment(1);
}

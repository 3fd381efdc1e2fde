//! VM record and the rate computation carried across samples.

use crate::hypervisor::{DomainId, DomainInfo, DomainState};
use tokio::time::Instant;

/// Cumulative CPU time observed at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuSample {
    pub cpu_time_ns: u64,
    pub taken_at: Instant,
}

impl CpuSample {
    /// CPU usage between `self` and a later sample, as a percentage of one
    /// host CPU.
    ///
    /// Returns `None` when no time has elapsed or the cumulative counter went
    /// backwards (domain restarted under the same name).
    pub fn rate_to(&self, later: &CpuSample) -> Option<f64> {
        let elapsed = later.taken_at.checked_duration_since(self.taken_at)?;
        if elapsed.is_zero() {
            return None;
        }
        let delta = later.cpu_time_ns.checked_sub(self.cpu_time_ns)?;
        Some(delta as f64 * 100.0 / elapsed.as_nanos() as f64)
    }
}

/// One successfully sampled domain.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainSample {
    pub domain_id: DomainId,
    pub name: String,
    pub info: DomainInfo,
    /// When `info` was read.
    pub taken_at: Instant,
}

impl DomainSample {
    fn cpu_sample(&self) -> CpuSample {
        CpuSample { cpu_time_ns: self.info.cpu_time_ns, taken_at: self.taken_at }
    }
}

/// Best-known state of one VM, keyed by name in the inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct VmRecord {
    pub name: String,
    pub domain_id: DomainId,
    pub state: DomainState,
    pub powered_on: bool,
    pub vcpu_count: u32,
    pub ram_usage_percent: f64,
    /// Only recomputed once a previous sample exists.
    pub cpu_usage_percent: f64,
    pub last_sample: Option<CpuSample>,
    /// Consecutive cycles this record was kept without a fresh sample.
    pub missed_samples: u32,
}

impl VmRecord {
    /// A record for a VM seen for the first time.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain_id: 0,
            state: DomainState::NoState,
            powered_on: false,
            vcpu_count: 0,
            ram_usage_percent: 0.0,
            cpu_usage_percent: 0.0,
            last_sample: None,
            missed_samples: 0,
        }
    }

    /// Fold a fresh sample into the record.
    pub fn apply(&mut self, sample: &DomainSample) {
        self.domain_id = sample.domain_id;
        self.state = sample.info.state();
        self.powered_on = self.state.is_powered_on();
        self.vcpu_count = sample.info.vcpu_count;
        self.ram_usage_percent = sample.info.ram_usage_percent();

        let current = sample.cpu_sample();
        if let Some(rate) = self.last_sample.and_then(|prev| prev.rate_to(&current)) {
            self.cpu_usage_percent = rate;
        }
        self.last_sample = Some(current);
        self.missed_samples = 0;
    }
}

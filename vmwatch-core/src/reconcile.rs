//! Inventory reconciliation.
//!
//! One cycle samples the hypervisor, then folds the samples into the
//! inventory in a single exclusive pass:
//!
//! 1. Connect, list active domains, and read each domain's info and name.
//!    Every call is bounded by `call_timeout`. The connection is closed as
//!    soon as sampling ends, whatever the outcome.
//! 2. If connecting or listing failed, the cycle aborts and the inventory is
//!    not touched.
//! 3. Under the store's write lock: every existing record starts out stale
//!    (mark), each sampled domain moves its record out of the stale set or
//!    creates one (merge), and whatever is still stale is dropped (sweep).
//!
//! A domain that fails to sample is never filled in with made-up values. If
//! the previous cycle knew a record with the same domain id, that record is
//! kept as-is for one more cycle; otherwise the domain is skipped. A record
//! that already missed the previous cycle is swept like any other.

use crate::error::{Result, VmwatchError};
use crate::hypervisor::{DomainId, Hypervisor, HypervisorConnection};
use crate::inventory::{DomainSample, InventoryStore, VmRecord};
use crate::observability::health::{HealthChecker, HealthStatus, HYPERVISOR_SUBSYSTEM};
use crate::observability::metrics;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Default bound for a single hypervisor call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// A domain that could not be sampled this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainFailure {
    pub domain_id: DomainId,
    /// Failed call (lookup, info, name), also when it timed out.
    pub stage: &'static str,
    pub error: String,
}

/// Everything read from the hypervisor in one cycle.
#[derive(Debug, Default)]
pub struct SampleBatch {
    /// Number of domain ids the hypervisor listed.
    pub listed: usize,
    pub samples: Vec<DomainSample>,
    pub failures: Vec<DomainFailure>,
}

/// Outcome of one completed cycle.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconcileReport {
    /// Number of domain ids the hypervisor listed
    pub listed: usize,
    /// Records created for previously unknown VMs
    pub created: usize,
    /// Existing records refreshed in place
    pub updated: usize,
    /// Records kept unchanged because their domain failed to sample
    pub retained: Vec<String>,
    /// Records dropped because their VM was no longer reported
    pub evicted: Vec<String>,
    /// Domains that could not be sampled
    pub failed: Vec<DomainFailure>,
    /// Inventory size after the cycle
    pub inventory_size: usize,
}

/// Fold a batch of samples into the inventory mapping (mark, merge, sweep).
pub fn apply_batch(records: &mut HashMap<String, VmRecord>, batch: SampleBatch) -> ReconcileReport {
    let mut report = ReconcileReport { listed: batch.listed, ..Default::default() };

    // Mark: everything known so far is stale until sampled again.
    let mut stale = std::mem::take(records);
    let mut next = HashMap::with_capacity(batch.samples.len());

    // Merge
    for sample in &batch.samples {
        // A name listed twice in one cycle folds into the record it already got.
        let mut record = match next.remove(&sample.name) {
            Some(record) => record,
            None => match stale.remove(&sample.name) {
                Some(record) => {
                    report.updated += 1;
                    record
                }
                None => {
                    report.created += 1;
                    VmRecord::new(sample.name.clone())
                }
            },
        };
        record.apply(sample);
        next.insert(record.name.clone(), record);
    }

    for failure in &batch.failures {
        // Retained at most one cycle in a row, then left to the sweep.
        let known = stale
            .iter()
            .find(|(_, record)| {
                record.domain_id == failure.domain_id && record.missed_samples == 0
            })
            .map(|(name, _)| name.clone());
        if let Some(mut record) = known.and_then(|name| stale.remove(&name)) {
            record.missed_samples += 1;
            report.retained.push(record.name.clone());
            next.insert(record.name.clone(), record);
        }
    }

    // Sweep
    report.evicted = stale.into_keys().collect();
    report.evicted.sort();
    report.retained.sort();
    report.failed = batch.failures;
    report.inventory_size = next.len();

    *records = next;
    report
}

/// The per-domain call a sampling error came from.
fn failure_stage(error: &VmwatchError) -> &'static str {
    match error {
        VmwatchError::HypervisorTimeout { operation: "lookup_by_id", .. } => "lookup",
        VmwatchError::HypervisorTimeout { operation: "get_info", .. } => "info",
        VmwatchError::HypervisorTimeout { operation: "get_name", .. } => "name",
        other => other.kind(),
    }
}

/// Performs reconciliation passes against one hypervisor.
pub struct Reconciler {
    hypervisor: Arc<dyn Hypervisor>,
    store: InventoryStore,
    call_timeout: Duration,
    health: Option<HealthChecker>,
}

impl Reconciler {
    /// Create a new reconciler writing into `store`.
    pub fn new(hypervisor: Arc<dyn Hypervisor>, store: InventoryStore) -> Self {
        Self { hypervisor, store, call_timeout: DEFAULT_CALL_TIMEOUT, health: None }
    }

    /// Bound every hypervisor call by `timeout`.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Report hypervisor reachability to `health` after each cycle.
    pub fn with_health(mut self, health: HealthChecker) -> Self {
        self.health = Some(health);
        self
    }

    /// The inventory this reconciler writes.
    pub fn store(&self) -> &InventoryStore {
        &self.store
    }

    /// Run one full reconciliation pass.
    ///
    /// On error the inventory is exactly as it was before the call.
    #[instrument(skip(self), fields(hypervisor = self.hypervisor.name()))]
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        info!("Refreshing VM inventory");
        let started = Instant::now();

        let result = self.run_cycle().await;

        match &result {
            Ok(report) => {
                metrics::record_cycle(started.elapsed(), report.evicted.len(), report.inventory_size);
                for name in &report.evicted {
                    info!(vm = %name, "VM no longer reported, evicted from inventory");
                }
                debug!(
                    listed = report.listed,
                    created = report.created,
                    updated = report.updated,
                    evicted = report.evicted.len(),
                    failed = report.failed.len(),
                    "Reconciliation complete"
                );
                if report.failed.is_empty() {
                    self.set_health(HealthStatus::Healthy, None).await;
                } else {
                    let message = format!("{} domain(s) failed to sample", report.failed.len());
                    self.set_health(HealthStatus::Degraded, Some(message)).await;
                }
            }
            Err(e) => {
                error!(error = %e, "Hypervisor error, inventory left untouched");
                metrics::record_cycle_failure(e.kind());
                self.set_health(HealthStatus::Unhealthy, Some(e.to_string())).await;
            }
        }

        result
    }

    async fn run_cycle(&self) -> Result<ReconcileReport> {
        let mut conn = self.bounded("connect", self.hypervisor.connect()).await?;

        let sampled = self.sample_domains(conn.as_ref()).await;

        if let Err(e) = self.bounded("close", conn.close()).await {
            warn!(error = %e, "Failed to close hypervisor connection");
        }

        let batch = sampled?;
        Ok(self.store.with_exclusive(|records| apply_batch(records, batch)).await)
    }

    async fn sample_domains(&self, conn: &dyn HypervisorConnection) -> Result<SampleBatch> {
        let ids = self.bounded("list_domains", conn.list_active_domain_ids()).await?;

        let mut batch = SampleBatch { listed: ids.len(), ..Default::default() };
        for id in ids {
            match self.sample_domain(conn, id).await {
                Ok(sample) => batch.samples.push(sample),
                Err(e) => {
                    let stage = failure_stage(&e);
                    warn!(domain_id = id, stage, error = %e, "Failed to sample domain");
                    metrics::record_domain_failure(stage);
                    batch.failures.push(DomainFailure {
                        domain_id: id,
                        stage,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(batch)
    }

    async fn sample_domain(
        &self,
        conn: &dyn HypervisorConnection,
        id: DomainId,
    ) -> Result<DomainSample> {
        let domain = self.bounded("lookup_by_id", conn.lookup_by_id(id)).await?;
        let info = self.bounded("get_info", domain.info()).await?;
        let taken_at = Instant::now();
        let name = self.bounded("get_name", domain.name()).await?;
        Ok(DomainSample { domain_id: id, name, info, taken_at })
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.call_timeout, call).await.map_err(|_| {
            VmwatchError::HypervisorTimeout { operation, timeout: self.call_timeout }
        })?
    }

    async fn set_health(&self, status: HealthStatus, message: Option<String>) {
        if let Some(health) = &self.health {
            health.update_subsystem(HYPERVISOR_SUBSYSTEM, status, message).await;
        }
    }
}

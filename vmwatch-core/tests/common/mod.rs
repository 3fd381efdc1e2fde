//! In-memory hypervisor shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use vmwatch_core::{
    error::{Result, VmwatchError},
    DomainHandle, DomainId, DomainInfo, Hypervisor, HypervisorConnection,
};

/// Which call fails for a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Lookup,
    Info,
    Name,
}

#[derive(Debug, Clone)]
pub struct MockDomain {
    pub name: String,
    pub info: DomainInfo,
    pub fail: Option<FailAt>,
    /// Simulated latency of the info call.
    pub info_delay: Duration,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub domains: BTreeMap<DomainId, MockDomain>,
    pub fail_connect: bool,
    pub fail_listing: bool,
    /// Simulated latency of connecting.
    pub connect_delay: Duration,
    /// Simulated latency of the listing call.
    pub list_delay: Duration,
    pub connects: usize,
    pub closes: usize,
    pub in_flight: usize,
    pub max_in_flight: usize,
    pub cycle_starts: Vec<Instant>,
}

/// Mock hypervisor (doesn't require libvirt).
#[derive(Clone, Default)]
pub struct MockHypervisor {
    state: Arc<Mutex<MockState>>,
}

impl MockHypervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }

    /// Report a running domain with the given cumulative CPU time.
    pub fn add_domain(&self, id: DomainId, name: &str, cpu_time_ns: u64) {
        self.state().domains.insert(
            id,
            MockDomain {
                name: name.to_string(),
                info: DomainInfo {
                    state_code: 1,
                    cpu_time_ns,
                    current_memory_kib: 1024 * 1024,
                    max_memory_kib: 4 * 1024 * 1024,
                    vcpu_count: 2,
                },
                fail: None,
                info_delay: Duration::ZERO,
            },
        );
    }

    pub fn set_cpu_time(&self, id: DomainId, cpu_time_ns: u64) {
        if let Some(domain) = self.state().domains.get_mut(&id) {
            domain.info.cpu_time_ns = cpu_time_ns;
        }
    }

    pub fn set_fail(&self, id: DomainId, fail: Option<FailAt>) {
        if let Some(domain) = self.state().domains.get_mut(&id) {
            domain.fail = fail;
        }
    }

    pub fn set_info_delay(&self, id: DomainId, delay: Duration) {
        if let Some(domain) = self.state().domains.get_mut(&id) {
            domain.info_delay = delay;
        }
    }

    pub fn remove_domain(&self, id: DomainId) {
        self.state().domains.remove(&id);
    }
}

#[async_trait]
impl Hypervisor for MockHypervisor {
    async fn connect(&self) -> Result<Box<dyn HypervisorConnection>> {
        let delay = self.state().connect_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if state.fail_connect {
            return Err(VmwatchError::HypervisorConnect {
                uri: "mock:///".to_string(),
                reason: "connection refused".to_string(),
            });
        }
        state.connects += 1;
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);
        state.cycle_starts.push(Instant::now());
        Ok(Box::new(MockConnection { state: self.state.clone() }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }
}

#[async_trait]
impl HypervisorConnection for MockConnection {
    async fn list_active_domain_ids(&self) -> Result<Vec<DomainId>> {
        let delay = self.state().list_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let state = self.state();
        if state.fail_listing {
            return Err(VmwatchError::DomainListing { reason: "listing failed".to_string() });
        }
        Ok(state.domains.keys().copied().collect())
    }

    async fn lookup_by_id(&self, id: DomainId) -> Result<Box<dyn DomainHandle>> {
        let state = self.state();
        match state.domains.get(&id) {
            Some(domain) if domain.fail != Some(FailAt::Lookup) => {
                Ok(Box::new(MockDomainHandle { id, domain: domain.clone() }))
            }
            _ => Err(VmwatchError::DomainLookup { domain_id: id, reason: "no such domain".into() }),
        }
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.state();
        state.closes += 1;
        state.in_flight -= 1;
        Ok(())
    }
}

struct MockDomainHandle {
    id: DomainId,
    domain: MockDomain,
}

#[async_trait]
impl DomainHandle for MockDomainHandle {
    async fn info(&self) -> Result<DomainInfo> {
        if !self.domain.info_delay.is_zero() {
            tokio::time::sleep(self.domain.info_delay).await;
        }
        if self.domain.fail == Some(FailAt::Info) {
            return Err(VmwatchError::DomainInfo { domain_id: self.id, reason: "info failed".into() });
        }
        Ok(self.domain.info)
    }

    async fn name(&self) -> Result<String> {
        if self.domain.fail == Some(FailAt::Name) {
            return Err(VmwatchError::DomainName { domain_id: self.id, reason: "name failed".into() });
        }
        Ok(self.domain.name.clone())
    }
}

//! libvirt hypervisor backend.
//!
//! libvirt calls are synchronous, so every call runs on the blocking pool.
//! The reconciler bounds each call with a timeout; a call that outlives it
//! keeps its blocking thread until libvirt returns, but no longer stalls the
//! tick loop.

use super::{DomainHandle, DomainId, DomainInfo, Hypervisor, HypervisorConnection};
use crate::error::{Result, VmwatchError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};
use virt::connect::Connect;
use virt::domain::Domain;

/// libvirt-backed hypervisor.
pub struct LibvirtHypervisor {
    uri: String,
}

impl LibvirtHypervisor {
    pub fn new(uri: String) -> Self {
        Self { uri }
    }
}

#[async_trait]
impl Hypervisor for LibvirtHypervisor {
    #[instrument(skip(self), fields(uri = %self.uri))]
    async fn connect(&self) -> Result<Box<dyn HypervisorConnection>> {
        let uri = self.uri.clone();
        let conn = tokio::task::spawn_blocking(move || Connect::open(Some(uri.as_str())))
            .await
            .map_err(VmwatchError::internal)?
            .map_err(|e| VmwatchError::HypervisorConnect {
                uri: self.uri.clone(),
                reason: e.to_string(),
            })?;

        debug!("Opened libvirt connection");
        Ok(Box::new(LibvirtConnection { conn: Arc::new(Mutex::new(Some(conn))) }))
    }

    fn name(&self) -> &str {
        "libvirt"
    }
}

/// Open libvirt connection. `None` once closed.
struct LibvirtConnection {
    conn: Arc<Mutex<Option<Connect>>>,
}

impl LibvirtConnection {
    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connect) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| VmwatchError::Internal("libvirt connection lock poisoned".into()))?;
            match guard.as_ref() {
                Some(c) => f(c),
                None => Err(VmwatchError::Internal("libvirt connection already closed".into())),
            }
        })
        .await
        .map_err(VmwatchError::internal)?
    }
}

#[async_trait]
impl HypervisorConnection for LibvirtConnection {
    async fn list_active_domain_ids(&self) -> Result<Vec<DomainId>> {
        self.with_conn(|c| {
            c.list_domains().map_err(|e| VmwatchError::DomainListing { reason: e.to_string() })
        })
        .await
    }

    async fn lookup_by_id(&self, id: DomainId) -> Result<Box<dyn DomainHandle>> {
        let domain = self
            .with_conn(move |c| {
                Domain::lookup_by_id(c, id).map_err(|e| VmwatchError::DomainLookup {
                    domain_id: id,
                    reason: e.to_string(),
                })
            })
            .await?;

        Ok(Box::new(LibvirtDomain { id, domain: Arc::new(domain) }))
    }

    async fn close(&mut self) -> Result<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| VmwatchError::Internal("libvirt connection lock poisoned".into()))?;
            if let Some(mut c) = guard.take() {
                c.close().map_err(|e| VmwatchError::Internal(e.to_string()))?;
                debug!("Closed libvirt connection");
            }
            Ok(())
        })
        .await
        .map_err(VmwatchError::internal)?
    }
}

struct LibvirtDomain {
    id: DomainId,
    domain: Arc<Domain>,
}

#[async_trait]
impl DomainHandle for LibvirtDomain {
    async fn info(&self) -> Result<DomainInfo> {
        let id = self.id;
        let domain = self.domain.clone();
        tokio::task::spawn_blocking(move || {
            let info = domain
                .get_info()
                .map_err(|e| VmwatchError::DomainInfo { domain_id: id, reason: e.to_string() })?;
            Ok(DomainInfo {
                state_code: info.state as u32,
                cpu_time_ns: info.cpu_time,
                current_memory_kib: info.memory,
                max_memory_kib: info.max_mem,
                vcpu_count: info.nr_virt_cpu,
            })
        })
        .await
        .map_err(VmwatchError::internal)?
    }

    async fn name(&self) -> Result<String> {
        let id = self.id;
        let domain = self.domain.clone();
        tokio::task::spawn_blocking(move || {
            domain
                .get_name()
                .map_err(|e| VmwatchError::DomainName { domain_id: id, reason: e.to_string() })
        })
        .await
        .map_err(VmwatchError::internal)?
    }
}

//! Hypervisor collaborator abstraction.
//!
//! The reconciler only needs a narrow, read-only view of the host:
//! connect, list active domain ids, look a domain up by id, read its name
//! and info. Every call can fail and is treated as potentially slow I/O, so
//! callers bound each one with a timeout.
//!
//! Backends:
//! - libvirt (`libvirt` feature), the reference backend
//! - anything else implementing [`Hypervisor`] (tests use an in-memory mock)

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod factory;
#[cfg(feature = "libvirt")]
pub mod libvirt;

pub use factory::HypervisorFactory;
#[cfg(feature = "libvirt")]
pub use libvirt::LibvirtHypervisor;

/// Hypervisor-assigned domain identifier. Not stable across hypervisor restarts.
pub type DomainId = u32;

/// Entry point to a hypervisor. A fresh connection is acquired every cycle.
#[async_trait]
pub trait Hypervisor: Send + Sync {
    /// Open a new connection.
    async fn connect(&self) -> Result<Box<dyn HypervisorConnection>>;

    /// Backend name (for logging).
    fn name(&self) -> &str;
}

/// An open hypervisor connection, owned by a single reconciliation cycle.
#[async_trait]
pub trait HypervisorConnection: Send + Sync {
    /// Ids of all currently active (running) domains.
    async fn list_active_domain_ids(&self) -> Result<Vec<DomainId>>;

    /// Resolve a domain handle from its id.
    async fn lookup_by_id(&self, id: DomainId) -> Result<Box<dyn DomainHandle>>;

    /// Release the connection. Called exactly once per cycle.
    async fn close(&mut self) -> Result<()>;
}

/// A single domain on an open connection.
#[async_trait]
pub trait DomainHandle: Send + Sync {
    async fn info(&self) -> Result<DomainInfo>;

    async fn name(&self) -> Result<String>;
}

/// Raw domain info as reported by the hypervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DomainInfo {
    /// Hypervisor state code (libvirt `virDomainState`).
    pub state_code: u32,
    /// Cumulative CPU time consumed by the domain, in nanoseconds.
    pub cpu_time_ns: u64,
    pub current_memory_kib: u64,
    pub max_memory_kib: u64,
    pub vcpu_count: u32,
}

impl DomainInfo {
    pub fn state(&self) -> DomainState {
        DomainState::from_code(self.state_code)
    }

    /// Current memory as a percentage of the maximum; 0 when no maximum is reported.
    pub fn ram_usage_percent(&self) -> f64 {
        if self.max_memory_kib == 0 {
            return 0.0;
        }
        self.current_memory_kib as f64 * 100.0 / self.max_memory_kib as f64
    }
}

/// Decoded domain state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainState {
    NoState,
    Running,
    Blocked,
    Paused,
    Shutdown,
    Shutoff,
    Crashed,
    PmSuspended,
    Unknown(u32),
}

impl DomainState {
    /// Map a libvirt `virDomainState` code.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::NoState,
            1 => Self::Running,
            2 => Self::Blocked,
            3 => Self::Paused,
            4 => Self::Shutdown,
            5 => Self::Shutoff,
            6 => Self::Crashed,
            7 => Self::PmSuspended,
            other => Self::Unknown(other),
        }
    }

    /// Only a running domain counts as powered on.
    pub fn is_powered_on(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoState => "nostate",
            Self::Running => "running",
            Self::Blocked => "blocked",
            Self::Paused => "paused",
            Self::Shutdown => "shutdown",
            Self::Shutoff => "shutoff",
            Self::Crashed => "crashed",
            Self::PmSuspended => "pmsuspended",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl std::fmt::Display for DomainState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown({})", code),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_codes() {
        assert_eq!(DomainState::from_code(1), DomainState::Running);
        assert_eq!(DomainState::from_code(3), DomainState::Paused);
        assert_eq!(DomainState::from_code(42), DomainState::Unknown(42));
        assert!(DomainState::Running.is_powered_on());
        assert!(!DomainState::Paused.is_powered_on());
        assert!(!DomainState::Blocked.is_powered_on());
        assert_eq!(DomainState::Unknown(9).to_string(), "unknown(9)");
    }

    #[test]
    fn test_ram_usage_percent() {
        let info = DomainInfo {
            current_memory_kib: 1024,
            max_memory_kib: 4096,
            ..Default::default()
        };
        assert_eq!(info.ram_usage_percent(), 25.0);
    }

    #[test]
    fn test_ram_usage_percent_without_max() {
        let info = DomainInfo { current_memory_kib: 1024, ..Default::default() };
        assert_eq!(info.ram_usage_percent(), 0.0);
    }
}

//! vmwatch core library
//!
//! Keeps a live, in-memory inventory of the VMs running on a hypervisor host,
//! reconciled from the hypervisor on a fixed interval.

pub mod config;
pub mod error;
pub mod hypervisor;
pub mod inventory;
pub mod observability;
pub mod paths;
pub mod reconcile;
pub mod scheduler;

// Re-export commonly used items
pub use config::Config;
pub use error::{Result, VmwatchError};
pub use hypervisor::{
    DomainHandle, DomainId, DomainInfo, DomainState, Hypervisor, HypervisorConnection,
    HypervisorFactory,
};
pub use inventory::{InventoryStore, VmRecord, VmStatus};
pub use observability::{
    health::HealthChecker, init as init_observability, shutdown as shutdown_observability,
};
pub use reconcile::{ReconcileReport, Reconciler};
pub use scheduler::Scheduler;

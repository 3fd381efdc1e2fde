//! Hypervisor factory: builds the backend compiled into this binary.

use super::Hypervisor;
use crate::config::Config;
use crate::error::Result;
#[cfg(not(feature = "libvirt"))]
use crate::error::VmwatchError;
use std::sync::Arc;
use tracing::info;

/// Factory for creating the hypervisor backend.
pub struct HypervisorFactory;

impl HypervisorFactory {
    /// Create the hypervisor backend for the configured URI.
    #[cfg(feature = "libvirt")]
    pub fn create(config: &Config) -> Result<Arc<dyn Hypervisor>> {
        info!(uri = %config.hypervisor_uri, "Using libvirt hypervisor backend");
        Ok(Arc::new(super::LibvirtHypervisor::new(config.hypervisor_uri.clone())))
    }

    /// Create the hypervisor backend for the configured URI.
    #[cfg(not(feature = "libvirt"))]
    pub fn create(config: &Config) -> Result<Arc<dyn Hypervisor>> {
        info!(uri = %config.hypervisor_uri, "No hypervisor backend compiled in");
        Err(VmwatchError::HypervisorUnavailable {
            reason: format!(
                "cannot serve {}: rebuild with the `libvirt` feature",
                config.hypervisor_uri
            ),
        })
    }
}

#[cfg(all(test, not(feature = "libvirt")))]
mod tests {
    use super::*;

    #[test]
    fn test_create_without_backend() {
        let err = HypervisorFactory::create(&Config::default()).err().unwrap();
        assert!(matches!(err, VmwatchError::HypervisorUnavailable { .. }));
    }
}

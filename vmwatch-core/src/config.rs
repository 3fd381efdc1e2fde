//! Configuration management.

use crate::error::{Result, VmwatchError};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default Prometheus `/metrics` port for vmwatchd.
pub const DEFAULT_METRICS_PORT: u16 = 41102;

/// Persistent configuration for vmwatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hypervisor connection URI (libvirt syntax).
    pub hypervisor_uri: String,
    /// Seconds between reconciliation cycles.
    pub reconcile_interval_secs: u64,
    /// Upper bound for any single hypervisor call.
    pub call_timeout_secs: u64,
    pub log_level: String,
    pub metrics_enabled: bool,
    pub metrics_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hypervisor_uri: "qemu:///system".to_string(),
            reconcile_interval_secs: 10,
            call_timeout_secs: 5,
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_port: DEFAULT_METRICS_PORT,
        }
    }
}

impl Config {
    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        paths::config_path()
    }

    /// Load configuration from the default location.
    ///
    /// Returns defaults when no file exists.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load and validate configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VmwatchError::IoError { path: path.to_path_buf(), source: e })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| VmwatchError::InvalidConfig {
            reason: format!("Failed to parse {}: {}", path.display(), e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the reconciler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.hypervisor_uri.trim().is_empty() {
            return Err(VmwatchError::InvalidConfig {
                reason: "hypervisor_uri must not be empty".to_string(),
            });
        }
        if self.reconcile_interval_secs == 0 {
            return Err(VmwatchError::InvalidConfig {
                reason: "reconcile_interval_secs must be greater than zero".to_string(),
            });
        }
        if self.call_timeout_secs == 0 {
            return Err(VmwatchError::InvalidConfig {
                reason: "call_timeout_secs must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

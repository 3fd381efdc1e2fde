//! Error types for vmwatch.
//!
//! All errors use `thiserror` for ergonomic error handling and proper error chains.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::hypervisor::DomainId;

/// Result type alias for vmwatch operations.
pub type Result<T> = std::result::Result<T, VmwatchError>;

/// Main error type for vmwatch.
#[derive(Error, Debug)]
pub enum VmwatchError {
    // Hypervisor errors that abort a whole reconciliation cycle
    #[error("Failed to connect to hypervisor at {uri}: {reason}")]
    HypervisorConnect { uri: String, reason: String },

    #[error("Failed to list active domains: {reason}")]
    DomainListing { reason: String },

    #[error("Hypervisor call '{operation}' timed out after {timeout:?}")]
    HypervisorTimeout { operation: &'static str, timeout: Duration },

    #[error("No hypervisor backend available: {reason}")]
    HypervisorUnavailable { reason: String },

    // Per-domain errors
    #[error("Failed to look up domain {domain_id}: {reason}")]
    DomainLookup { domain_id: DomainId, reason: String },

    #[error("Failed to read info for domain {domain_id}: {reason}")]
    DomainInfo { domain_id: DomainId, reason: String },

    #[error("Failed to read name of domain {domain_id}: {reason}")]
    DomainName { domain_id: DomainId, reason: String },

    // Configuration errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("I/O error at {path:?}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VmwatchError {
    /// Create an Internal error from any error type.
    pub fn internal(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Internal(err.to_string())
    }

    /// Short machine-friendly label, used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HypervisorConnect { .. } => "connect",
            Self::DomainListing { .. } => "listing",
            Self::HypervisorTimeout { .. } => "timeout",
            Self::HypervisorUnavailable { .. } => "unavailable",
            Self::DomainLookup { .. } => "lookup",
            Self::DomainInfo { .. } => "info",
            Self::DomainName { .. } => "name",
            Self::InvalidConfig { .. } => "config",
            Self::IoError { .. } => "io",
            Self::Internal(_) | Self::Other(_) => "internal",
        }
    }
}

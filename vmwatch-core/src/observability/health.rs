//! Subsystem health tracking.
//!
//! The reconciler reports the hypervisor's reachability here after every
//! cycle; the daemon registers itself at startup.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Subsystem name the reconciler reports under.
pub const HYPERVISOR_SUBSYSTEM: &str = "hypervisor";

/// Overall system health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub version: &'static str,
    pub subsystems: Vec<SubsystemHealth>,
}

/// Subsystem health status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsystemHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
}

/// Health checker that tracks subsystem status.
#[derive(Clone, Default)]
pub struct HealthChecker {
    subsystems: Arc<RwLock<Vec<SubsystemHealth>>>,
}

impl HealthChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subsystem as healthy. Registering twice is a no-op.
    pub async fn register_subsystem(&self, name: &str) {
        let mut subsystems = self.subsystems.write().await;
        if subsystems.iter().any(|s| s.name == name) {
            return;
        }
        subsystems.push(SubsystemHealth {
            name: name.to_string(),
            status: HealthStatus::Healthy,
            message: None,
        });
    }

    /// Update subsystem health status, registering it if unknown.
    pub async fn update_subsystem(
        &self,
        name: &str,
        status: HealthStatus,
        message: Option<String>,
    ) {
        let mut subsystems = self.subsystems.write().await;
        match subsystems.iter_mut().find(|s| s.name == name) {
            Some(subsystem) => {
                subsystem.status = status;
                subsystem.message = message;
            }
            None => subsystems.push(SubsystemHealth { name: name.to_string(), status, message }),
        }
    }

    /// Current status of one subsystem.
    pub async fn subsystem(&self, name: &str) -> Option<SubsystemHealth> {
        let subsystems = self.subsystems.read().await;
        subsystems.iter().find(|s| s.name == name).cloned()
    }

    /// Get overall health status.
    ///
    /// Returns:
    /// - Healthy: All subsystems healthy
    /// - Degraded: At least one subsystem degraded, none unhealthy
    /// - Unhealthy: At least one subsystem unhealthy
    pub async fn get_health(&self) -> HealthCheck {
        let subsystems = self.subsystems.read().await.clone();

        let status = if subsystems.iter().any(|s| s.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if subsystems.iter().any(|s| s.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthCheck { status, version: env!("CARGO_PKG_VERSION"), subsystems }
    }

    /// Readiness check - is every subsystem healthy?
    pub async fn is_ready(&self) -> bool {
        self.get_health().await.status == HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_rollup() {
        let checker = HealthChecker::new();
        assert!(checker.is_ready().await);

        checker.register_subsystem("daemon").await;
        checker.register_subsystem(HYPERVISOR_SUBSYSTEM).await;
        checker.register_subsystem(HYPERVISOR_SUBSYSTEM).await;

        let health = checker.get_health().await;
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.subsystems.len(), 2);

        checker
            .update_subsystem(HYPERVISOR_SUBSYSTEM, HealthStatus::Degraded, Some("1 domain".into()))
            .await;
        assert_eq!(checker.get_health().await.status, HealthStatus::Degraded);

        checker
            .update_subsystem(HYPERVISOR_SUBSYSTEM, HealthStatus::Unhealthy, Some("down".into()))
            .await;
        assert_eq!(checker.get_health().await.status, HealthStatus::Unhealthy);
        assert!(!checker.is_ready().await);
    }

    #[tokio::test]
    async fn test_update_registers_unknown_subsystem() {
        let checker = HealthChecker::new();
        checker.update_subsystem("late", HealthStatus::Degraded, None).await;

        let late = checker.subsystem("late").await.unwrap();
        assert_eq!(late.status, HealthStatus::Degraded);
    }
}

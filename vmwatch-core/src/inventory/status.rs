//! Externally visible status shape.

use super::VmRecord;
use serde::{Deserialize, Serialize};

/// Per-VM status served to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VmStatus {
    pub name: String,
    pub is_powered_on: bool,
    pub cpu_usage_percent: f64,
    pub ram_usage_percent: f64,
    pub vcpu_count: u32,
}

impl From<&VmRecord> for VmStatus {
    fn from(record: &VmRecord) -> Self {
        Self {
            name: record.name.clone(),
            is_powered_on: record.powered_on,
            cpu_usage_percent: record.cpu_usage_percent,
            ram_usage_percent: record.ram_usage_percent,
            vcpu_count: record.vcpu_count,
        }
    }
}

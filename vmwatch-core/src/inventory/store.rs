//! Inventory store: the authoritative name -> record mapping.

use super::{VmRecord, VmStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared handle to the VM inventory.
///
/// Readers share the lock. The reconciler is the only writer and holds the
/// write lock for a whole cycle's merge, so readers see either the pre-cycle
/// or the post-cycle inventory.
#[derive(Clone, Default)]
pub struct InventoryStore {
    records: Arc<RwLock<HashMap<String, VmRecord>>>,
}

impl InventoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a single record by VM name.
    pub async fn snapshot(&self, name: &str) -> Option<VmRecord> {
        let records = self.records.read().await;
        records.get(name).cloned()
    }

    /// Get every record, sorted by name.
    pub async fn read_all(&self) -> Vec<VmRecord> {
        let records = self.records.read().await;
        let mut all: Vec<VmRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Status projection of a single VM.
    pub async fn status(&self, name: &str) -> Option<VmStatus> {
        let records = self.records.read().await;
        records.get(name).map(VmStatus::from)
    }

    /// Status projection of every VM, sorted by name.
    pub async fn statuses(&self) -> Vec<VmStatus> {
        let records = self.records.read().await;
        let mut all: Vec<VmStatus> = records.values().map(VmStatus::from).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Number of VMs in the inventory.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the inventory holds no VMs.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Run `f` with exclusive access to the mapping.
    pub(crate) async fn with_exclusive<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, VmRecord>) -> T,
    ) -> T {
        let mut records = self.records.write().await;
        f(&mut records)
    }
}

//! In-memory VM inventory.
//!
//! Holds the best-known state of every VM on the host, as of the last
//! completed reconciliation cycle.

mod record;
mod status;
mod store;

pub use record::{CpuSample, DomainSample, VmRecord};
pub use status::VmStatus;
pub use store::InventoryStore;

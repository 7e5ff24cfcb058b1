//! Visits domain module.
//!
//! A visit is one trip to a location. During a visit each serviced machine
//! gets a machine restock, and each product counted in it a restock entry
//! (stock found, units discarded, units loaded). This crate also plans how
//! those entries move warehouse and slot stock. Pure domain logic.

pub mod bulk;
pub mod reconcile;
pub mod restock;
pub mod visit;

pub use bulk::{BulkMachineRestock, BulkRestockEntry, BulkVisitHeader, BulkVisitPayload};
pub use reconcile::{ReconciliationPlan, SlotChange, StockEffect};
pub use restock::{
    EntryCounts, MachineRestock, MachineRestockDraft, MachineRestockPatch, RestockEntry,
    RestockEntryDraft, RestockEntryPatch,
};
pub use visit::{Visit, VisitDraft, VisitPatch};

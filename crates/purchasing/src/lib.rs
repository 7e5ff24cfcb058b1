//! Purchasing domain module (suppliers and wholesale purchases).
//!
//! Business rules for buying stock into the warehouse, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod purchase;
pub mod supplier;

pub use purchase::{InventoryDelta, PurchaseDraft, PurchasePatch, WholesalePurchase};
pub use supplier::{Supplier, SupplierDraft, SupplierPatch, ensure_supplier_name_unique};

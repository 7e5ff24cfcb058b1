//! Fleet domain module.
//!
//! Locations, the vending machines installed at them, and machine slots (a
//! product priced and stocked in one machine). Pure domain logic.

pub mod location;
pub mod machine;
pub mod slot;

pub use location::{Location, LocationDraft, LocationPatch};
pub use machine::{Machine, MachineDraft, MachinePatch, MachineType};
pub use slot::{MachineSlot, SlotDraft, SlotPatch, ensure_slot_unique};

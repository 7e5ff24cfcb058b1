//! Products domain module.
//!
//! Catalog products (with their warehouse stock) and the historical unit-cost
//! ledger, implemented purely as deterministic domain logic (no IO, no HTTP,
//! no storage).

pub mod cost;
pub mod product;

pub use cost::{
    ProductCost, ProductCostDraft, average_cost, historical_unit_cost, latest_cost,
    latest_unit_cost,
};
pub use product::{Product, ProductDraft, ProductPatch, ProductType};

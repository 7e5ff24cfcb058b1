//! `vendops-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, and the `Money` value object shared by
//! every vending domain crate.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    DemandRecordId, LocationId, MachineId, MachineRestockId, ProductCostId, ProductId, PurchaseId,
    RestockEntryId, SlotId, SupplierId, UserId, VisitId,
};
pub use money::{Money, MoneyParseError};
pub use value_object::ValueObject;

/// Upper bound for any counted quantity (purchased units, slot counts).
pub const MAX_QUANTITY: i64 = i32::MAX as i64;

/// Validate a required, trimmed text field with a maximum length.
///
/// Returns the trimmed value.
pub fn require_text(field: &str, value: &str, max_len: usize) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    if trimmed.chars().count() > max_len {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate an optional text field with a maximum length (empty stays empty).
pub fn optional_text(field: &str, value: &str, max_len: usize) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.chars().count() > max_len {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(trimmed.to_string())
}

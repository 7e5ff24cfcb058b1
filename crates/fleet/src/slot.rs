//! Machine slots: the price and live stock of one product in one machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vendops_core::{
    DomainError, DomainResult, Entity, MAX_QUANTITY, MachineId, Money, ProductId, SlotId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSlot {
    pub id: SlotId,
    pub machine_id: MachineId,
    pub product_id: ProductId,
    pub price: Money,
    pub slot: u32,
    /// Units currently in the machine; `None` until first counted.
    pub current_stock: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for MachineSlot {
    type Id = SlotId;

    fn id(&self) -> SlotId {
        self.id
    }
}

impl MachineSlot {
    /// Margin of the selling price over the product's average cost, in percent.
    ///
    /// Zero when the price is zero or the product has no cost history.
    pub fn profit_margin(&self, average_cost: Money) -> f64 {
        if self.price.is_zero() || average_cost.is_zero() {
            return 0.0;
        }
        self.price.margin_percent(average_cost)
    }

    pub fn apply(&mut self, patch: SlotPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(machine) = patch.machine {
            next.machine_id = machine;
        }
        if let Some(product) = patch.product {
            next.product_id = product;
        }
        if let Some(price) = patch.price {
            next.price = validate_price(price)?;
        }
        if let Some(slot) = patch.slot {
            next.slot = slot;
        }
        if let Some(stock) = patch.current_stock {
            next.current_stock = Some(validate_stock(stock)?);
        }
        next.updated_at = now;
        *self = next;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDraft {
    pub machine: MachineId,
    pub product: ProductId,
    pub price: Money,
    pub slot: u32,
    #[serde(default)]
    pub current_stock: Option<i64>,
}

impl SlotDraft {
    pub fn into_slot(self, id: SlotId, now: DateTime<Utc>) -> DomainResult<MachineSlot> {
        Ok(MachineSlot {
            id,
            machine_id: self.machine,
            product_id: self.product,
            price: validate_price(self.price)?,
            slot: self.slot,
            current_stock: self.current_stock.map(validate_stock).transpose()?,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPatch {
    #[serde(default)]
    pub machine: Option<MachineId>,
    #[serde(default)]
    pub product: Option<ProductId>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub slot: Option<u32>,
    #[serde(default)]
    pub current_stock: Option<i64>,
}

impl From<SlotDraft> for SlotPatch {
    fn from(d: SlotDraft) -> Self {
        Self {
            machine: Some(d.machine),
            product: Some(d.product),
            price: Some(d.price),
            slot: Some(d.slot),
            current_stock: d.current_stock,
        }
    }
}

fn validate_price(price: Money) -> DomainResult<Money> {
    if price.is_negative() {
        return Err(DomainError::field("price", "Price cannot be negative"));
    }
    Ok(price)
}

fn validate_stock(stock: i64) -> DomainResult<i64> {
    if !(0..=MAX_QUANTITY).contains(&stock) {
        return Err(DomainError::field(
            "current_stock",
            format!("Current stock must be between 0 and {MAX_QUANTITY}"),
        ));
    }
    Ok(stock)
}

/// Enforce `(machine, product)` and `(machine, slot)` uniqueness.
pub fn ensure_slot_unique<'a, I>(candidate: &MachineSlot, others: I) -> DomainResult<()>
where
    I: IntoIterator<Item = &'a MachineSlot>,
{
    for other in others {
        if other.id == candidate.id || other.machine_id != candidate.machine_id {
            continue;
        }
        if other.product_id == candidate.product_id {
            return Err(DomainError::conflict(
                "this product already has a slot in this machine",
            ));
        }
        if other.slot == candidate.slot {
            return Err(DomainError::conflict(format!(
                "slot {} is already used in this machine",
                candidate.slot
            )));
        }
    }
    Ok(())
}

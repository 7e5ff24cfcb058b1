//! Wholesale purchases: stock bought into the warehouse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vendops_core::{
    DomainError, DomainResult, Entity, MAX_QUANTITY, Money, ProductCostId, ProductId, PurchaseId,
    SupplierId,
};
use vendops_products::ProductCost;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WholesalePurchase {
    pub id: PurchaseId,
    pub product_id: ProductId,
    pub supplier_id: Option<SupplierId>,
    pub quantity: i64,
    pub total_cost: Money,
    pub purchased_at: DateTime<Utc>,
    pub notes: String,
    /// Set once the purchased quantity has been added to warehouse stock.
    pub inventory_updated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for WholesalePurchase {
    type Id = PurchaseId;

    fn id(&self) -> PurchaseId {
        self.id
    }
}

/// Signed change to one product's warehouse stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryDelta {
    pub product_id: ProductId,
    pub delta: i64,
}

impl WholesalePurchase {
    /// `total_cost / quantity`, rounded to cents.
    pub fn unit_cost(&self) -> Money {
        Money::ratio_rounded(self.total_cost, self.quantity)
    }

    /// Cost ledger entry mirroring this purchase.
    pub fn cost_record(&self, id: ProductCostId, now: DateTime<Utc>) -> ProductCost {
        ProductCost {
            id,
            product_id: self.product_id,
            purchase_id: Some(self.id),
            date: self.purchased_at,
            quantity: self.quantity,
            unit_cost: self.unit_cost(),
            total_cost: self.total_cost,
            created_at: now,
        }
    }

    pub fn stock_added(&self) -> InventoryDelta {
        InventoryDelta {
            product_id: self.product_id,
            delta: self.quantity,
        }
    }

    pub fn stock_removed(&self) -> InventoryDelta {
        InventoryDelta {
            product_id: self.product_id,
            delta: -self.quantity,
        }
    }

    /// Warehouse changes needed to go from `self` to `updated`.
    pub fn inventory_changes(&self, updated: &WholesalePurchase) -> Vec<InventoryDelta> {
        if self.product_id == updated.product_id {
            let delta = updated.quantity - self.quantity;
            if delta == 0 {
                return Vec::new();
            }
            return vec![InventoryDelta {
                product_id: self.product_id,
                delta,
            }];
        }
        vec![self.stock_removed(), updated.stock_added()]
    }

    pub fn apply(&mut self, patch: PurchasePatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(product) = patch.product {
            next.product_id = product;
        }
        if let Some(supplier) = patch.supplier {
            next.supplier_id = Some(supplier);
        }
        if let Some(quantity) = patch.quantity {
            next.quantity = quantity;
        }
        if let Some(total) = resolve_total(patch.total_cost, patch.cost_per_unit, next.quantity)? {
            next.total_cost = total;
        }
        if let Some(at) = patch.purchased_at {
            next.purchased_at = at;
        }
        if let Some(notes) = patch.notes {
            next.notes = notes.trim().to_string();
        }
        validate(next.quantity, next.total_cost)?;
        next.updated_at = now;
        *self = next;
        Ok(())
    }
}

/// Input for recording a purchase. Carries either `total_cost` or `cost_per_unit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseDraft {
    pub product: ProductId,
    #[serde(default)]
    pub supplier: Option<SupplierId>,
    pub quantity: i64,
    #[serde(default)]
    pub total_cost: Option<Money>,
    #[serde(default)]
    pub cost_per_unit: Option<Money>,
    #[serde(default)]
    pub purchased_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
}

impl PurchaseDraft {
    pub fn with_total(product: ProductId, quantity: i64, total_cost: Money) -> Self {
        Self {
            product,
            supplier: None,
            quantity,
            total_cost: Some(total_cost),
            cost_per_unit: None,
            purchased_at: None,
            notes: String::new(),
        }
    }

    pub fn into_purchase(self, id: PurchaseId, now: DateTime<Utc>) -> DomainResult<WholesalePurchase> {
        let total_cost = resolve_total(self.total_cost, self.cost_per_unit, self.quantity)?.ok_or_else(
            || DomainError::field("cost_per_unit", "Either total_cost or cost_per_unit must be provided."),
        )?;
        validate(self.quantity, total_cost)?;
        Ok(WholesalePurchase {
            id,
            product_id: self.product,
            supplier_id: self.supplier,
            quantity: self.quantity,
            total_cost,
            purchased_at: self.purchased_at.unwrap_or(now),
            notes: self.notes.trim().to_string(),
            inventory_updated: false,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurchasePatch {
    pub product: Option<ProductId>,
    pub supplier: Option<SupplierId>,
    pub quantity: Option<i64>,
    pub total_cost: Option<Money>,
    pub cost_per_unit: Option<Money>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl From<PurchaseDraft> for PurchasePatch {
    fn from(d: PurchaseDraft) -> Self {
        Self {
            product: Some(d.product),
            supplier: d.supplier,
            quantity: Some(d.quantity),
            total_cost: d.total_cost,
            cost_per_unit: d.cost_per_unit,
            purchased_at: d.purchased_at,
            notes: Some(d.notes),
        }
    }
}

/// An explicit total wins over a per-unit cost.
fn resolve_total(
    total: Option<Money>,
    per_unit: Option<Money>,
    quantity: i64,
) -> DomainResult<Option<Money>> {
    match (total, per_unit) {
        (Some(total), _) => Ok(Some(total)),
        (None, Some(unit)) => {
            validate_quantity(quantity)?;
            unit.checked_times(quantity).map(Some).ok_or_else(|| {
                DomainError::field("total_cost", "Ensure that there are no more than 10 digits in total.")
            })
        }
        (None, None) => Ok(None),
    }
}

fn validate_quantity(quantity: i64) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::field("quantity", "Quantity must be greater than 0"));
    }
    if quantity > MAX_QUANTITY {
        return Err(DomainError::field(
            "quantity",
            format!("Quantity must be at most {MAX_QUANTITY}"),
        ));
    }
    Ok(())
}

fn validate(quantity: i64, total_cost: Money) -> DomainResult<()> {
    validate_quantity(quantity)?;
    if total_cost.is_negative() {
        return Err(DomainError::field("total_cost", "Total cost cannot be negative"));
    }
    Ok(())
}

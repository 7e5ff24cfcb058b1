//! Locations, machines, products, machine items and the product cost ledger.

use serde::Serialize;

use vendops_analytics::{LatestCost, latest_costs};
use vendops_core::{LocationId, MachineId, Money, ProductCostId, ProductId, SlotId};
use vendops_fleet::{
    Location, LocationDraft, LocationPatch, Machine, MachineDraft, MachinePatch, MachineSlot,
    SlotDraft, SlotPatch, ensure_slot_unique,
};
use vendops_products::{
    Product, ProductCost, ProductCostDraft, ProductDraft, ProductPatch, ProductType, average_cost,
};
use vendops_purchasing::WholesalePurchase;

use crate::error::{ServiceError, ServiceResult};
use crate::store::{Tables, Tx};

use super::{Services, cascade, ensure_ref};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineView {
    #[serde(flatten)]
    pub machine: Machine,
    pub location_name: String,
    pub label: String,
}

impl MachineView {
    fn of(tables: &Tables, machine: &Machine) -> Self {
        let location_name = tables
            .locations
            .get(&machine.location_id)
            .map(|l| l.name.clone())
            .unwrap_or_default();
        Self {
            label: machine.label(&location_name),
            machine: machine.clone(),
            location_name,
        }
    }
}

/// A machine item: one product's slot, price and stock in one machine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotView {
    #[serde(flatten)]
    pub slot: MachineSlot,
    pub product_name: String,
    pub machine_info: String,
    pub average_cost: Money,
    pub profit_margin: f64,
}

impl SlotView {
    fn of(tables: &Tables, slot: &MachineSlot) -> Self {
        let average_cost = product_average_cost(tables, slot.product_id);
        Self {
            product_name: tables
                .products
                .get(&slot.product_id)
                .map(|p| p.name.clone())
                .unwrap_or_default(),
            machine_info: tables.snapshot().machine_label(slot.machine_id),
            profit_margin: slot.profit_margin(average_cost),
            average_cost,
            slot: slot.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostView {
    #[serde(flatten)]
    pub cost: ProductCost,
    pub product_name: String,
}

/// Weighted average purchase cost of a product.
pub fn product_average_cost(tables: &Tables, product: ProductId) -> Money {
    average_cost(
        tables
            .purchases
            .values()
            .filter(|p| p.product_id == product)
            .map(|p| (p.quantity, p.total_cost)),
    )
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineFilter {
    pub location: Option<LocationId>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub product_type: Option<ProductType>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotFilter {
    pub machine: Option<MachineId>,
    pub product: Option<ProductId>,
    pub slot: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CostFilter {
    pub product: Option<ProductId>,
}

fn machine_order_key(tables: &Tables, m: &Machine) -> (String, &'static str, String) {
    let location = tables
        .locations
        .get(&m.location_id)
        .map(|l| l.name.to_lowercase())
        .unwrap_or_default();
    (location, m.machine_type.as_str(), m.model.clone().unwrap_or_default())
}

fn check_slot(tx: &Tx, slot: &MachineSlot) -> ServiceResult<()> {
    ensure_ref::<Machine>(tx, "machine", slot.machine_id)?;
    ensure_ref::<Product>(tx, "product", slot.product_id)?;
    ensure_slot_unique(slot, tx.tables().slots.values())?;
    Ok(())
}

impl Services {
    // ---- locations

    pub async fn create_location(&self, draft: LocationDraft) -> ServiceResult<Location> {
        self.mutate(|tx| {
            let location = draft.into_location(LocationId::new(), tx.now())?;
            tx.put(location.clone())?;
            Ok(location)
        })
        .await
    }

    pub async fn list_locations(&self) -> Vec<Location> {
        let tables = self.store.read().await;
        let mut out: Vec<Location> = tables.locations.values().cloned().collect();
        out.sort_by_key(|l| l.name.to_lowercase());
        out
    }

    pub async fn get_location(&self, id: LocationId) -> ServiceResult<Location> {
        let tables = self.store.read().await;
        tables
            .get::<Location>(id)
            .cloned()
            .ok_or(ServiceError::NotFound("location"))
    }

    pub async fn update_location(&self, id: LocationId, patch: LocationPatch) -> ServiceResult<Location> {
        self.mutate(|tx| {
            let now = tx.now();
            tx.update::<Location, _>(id, |l| Ok(l.apply(patch, now)?))
        })
        .await
    }

    /// Deletes the location with its machines and visits.
    pub async fn delete_location(&self, id: LocationId) -> ServiceResult<()> {
        self.mutate(|tx| {
            tx.require::<Location>(id)?;
            cascade::location(tx, id);
            Ok(())
        })
        .await?;
        tracing::info!(location = %id, "location deleted");
        Ok(())
    }

    // ---- machines

    pub async fn create_machine(&self, draft: MachineDraft) -> ServiceResult<MachineView> {
        self.mutate(|tx| {
            ensure_ref::<Location>(tx, "location", draft.location)?;
            let machine = draft.into_machine(MachineId::new(), tx.now())?;
            tx.put(machine.clone())?;
            Ok(MachineView::of(tx.tables(), &machine))
        })
        .await
    }

    /// Ordered by location name, machine type and model.
    pub async fn list_machines(&self, filter: &MachineFilter) -> Vec<MachineView> {
        let tables = self.store.read().await;
        let mut machines: Vec<&Machine> = tables
            .machines
            .values()
            .filter(|m| filter.location.is_none_or(|l| l == m.location_id))
            .filter(|m| match filter.search.as_deref() {
                Some(term) => {
                    let location = tables.snapshot().location_name(m.location_id);
                    m.matches_search(term, &location)
                }
                None => true,
            })
            .collect();
        machines.sort_by_cached_key(|m| machine_order_key(&tables, m));
        machines.into_iter().map(|m| MachineView::of(&tables, m)).collect()
    }

    pub async fn get_machine(&self, id: MachineId) -> ServiceResult<MachineView> {
        let tables = self.store.read().await;
        let machine = tables
            .get::<Machine>(id)
            .ok_or(ServiceError::NotFound("machine"))?;
        Ok(MachineView::of(&tables, machine))
    }

    pub async fn update_machine(&self, id: MachineId, patch: MachinePatch) -> ServiceResult<MachineView> {
        self.mutate(|tx| {
            if let Some(location) = patch.location {
                ensure_ref::<Location>(tx, "location", location)?;
            }
            let now = tx.now();
            let machine = tx.update::<Machine, _>(id, |m| Ok(m.apply(patch, now)?))?;
            Ok(MachineView::of(tx.tables(), &machine))
        })
        .await
    }

    /// Deletes the machine with its slots, restocks and demand records.
    pub async fn delete_machine(&self, id: MachineId) -> ServiceResult<()> {
        self.mutate(|tx| {
            tx.require::<Machine>(id)?;
            cascade::machine(tx, id);
            Ok(())
        })
        .await
    }

    // ---- products

    pub async fn create_product(&self, draft: ProductDraft) -> ServiceResult<Product> {
        self.mutate(|tx| {
            let product = draft.into_product(ProductId::new(), tx.now())?;
            tx.put(product.clone())?;
            Ok(product)
        })
        .await
    }

    pub async fn list_products(&self, filter: &ProductFilter) -> Vec<Product> {
        let tables = self.store.read().await;
        let mut out: Vec<Product> = tables
            .products
            .values()
            .filter(|p| filter.product_type.is_none_or(|t| t == p.product_type))
            .filter(|p| filter.search.as_deref().is_none_or(|s| p.matches_search(s)))
            .cloned()
            .collect();
        out.sort_by_key(|p| p.name.to_lowercase());
        out
    }

    pub async fn get_product(&self, id: ProductId) -> ServiceResult<Product> {
        let tables = self.store.read().await;
        tables
            .get::<Product>(id)
            .cloned()
            .ok_or(ServiceError::NotFound("product"))
    }

    pub async fn update_product(&self, id: ProductId, patch: ProductPatch) -> ServiceResult<Product> {
        self.mutate(|tx| {
            let now = tx.now();
            tx.update::<Product, _>(id, |p| Ok(p.apply(patch, now)?))
        })
        .await
    }

    /// Deletes the product with its slots, purchases, costs, restock entries and demand records.
    pub async fn delete_product(&self, id: ProductId) -> ServiceResult<()> {
        self.mutate(|tx| {
            tx.require::<Product>(id)?;
            cascade::product(tx, id);
            Ok(())
        })
        .await
    }

    // ---- machine items

    pub async fn create_slot(&self, draft: SlotDraft) -> ServiceResult<SlotView> {
        self.mutate(|tx| {
            let slot = draft.into_slot(SlotId::new(), tx.now())?;
            check_slot(tx, &slot)?;
            tx.put(slot.clone())?;
            Ok(SlotView::of(tx.tables(), &slot))
        })
        .await
    }

    /// Ordered by location name, machine type and slot number.
    pub async fn list_slots(&self, filter: &SlotFilter) -> Vec<SlotView> {
        let tables = self.store.read().await;
        let mut slots: Vec<&MachineSlot> = tables
            .slots
            .values()
            .filter(|s| filter.machine.is_none_or(|m| m == s.machine_id))
            .filter(|s| filter.product.is_none_or(|p| p == s.product_id))
            .filter(|s| filter.slot.is_none_or(|n| n == s.slot))
            .collect();
        slots.sort_by_cached_key(|s| {
            let (location, machine_type) = match tables.machines.get(&s.machine_id) {
                Some(m) => {
                    let (location, machine_type, _) = machine_order_key(&tables, m);
                    (location, machine_type)
                }
                None => (String::new(), ""),
            };
            (location, machine_type, s.slot)
        });
        slots.into_iter().map(|s| SlotView::of(&tables, s)).collect()
    }

    pub async fn get_slot(&self, id: SlotId) -> ServiceResult<SlotView> {
        let tables = self.store.read().await;
        let slot = tables
            .get::<MachineSlot>(id)
            .ok_or(ServiceError::NotFound("machine item"))?;
        Ok(SlotView::of(&tables, slot))
    }

    pub async fn update_slot(&self, id: SlotId, patch: SlotPatch) -> ServiceResult<SlotView> {
        self.mutate(|tx| {
            let mut slot = tx.require::<MachineSlot>(id)?.clone();
            slot.apply(patch, tx.now())?;
            check_slot(tx, &slot)?;
            tx.put(slot.clone())?;
            Ok(SlotView::of(tx.tables(), &slot))
        })
        .await
    }

    pub async fn delete_slot(&self, id: SlotId) -> ServiceResult<()> {
        self.mutate(|tx| {
            tx.remove::<MachineSlot>(id)
                .ok_or(ServiceError::NotFound("machine item"))?;
            Ok(())
        })
        .await
    }

    // ---- product costs

    pub async fn create_cost(&self, draft: ProductCostDraft) -> ServiceResult<CostView> {
        self.mutate(|tx| {
            ensure_ref::<Product>(tx, "product", draft.product)?;
            if let Some(purchase) = draft.purchase {
                ensure_ref::<WholesalePurchase>(tx, "purchase", purchase)?;
            }
            let cost = draft.into_cost(ProductCostId::new(), tx.now())?;
            tx.put(cost.clone())?;
            Ok(cost_view(tx.tables(), cost))
        })
        .await
    }

    /// Newest first.
    pub async fn list_costs(&self, filter: &CostFilter) -> Vec<CostView> {
        let tables = self.store.read().await;
        let mut costs: Vec<&ProductCost> = tables
            .costs
            .values()
            .filter(|c| filter.product.is_none_or(|p| p == c.product_id))
            .collect();
        costs.sort_by(|a, b| (b.date, b.created_at).cmp(&(a.date, a.created_at)));
        costs
            .into_iter()
            .map(|c| cost_view(&tables, c.clone()))
            .collect()
    }

    pub async fn get_cost(&self, id: ProductCostId) -> ServiceResult<CostView> {
        let tables = self.store.read().await;
        let cost = tables
            .get::<ProductCost>(id)
            .cloned()
            .ok_or(ServiceError::NotFound("product cost"))?;
        Ok(cost_view(&tables, cost))
    }

    pub async fn delete_cost(&self, id: ProductCostId) -> ServiceResult<()> {
        self.mutate(|tx| {
            tx.remove::<ProductCost>(id)
                .ok_or(ServiceError::NotFound("product cost"))?;
            Ok(())
        })
        .await
    }

    /// Latest unit cost per product.
    pub async fn latest_costs(&self) -> Vec<LatestCost> {
        let tables = self.store.read().await;
        latest_costs(&tables.snapshot())
    }
}

fn cost_view(tables: &Tables, cost: ProductCost) -> CostView {
    CostView {
        product_name: tables
            .products
            .get(&cost.product_id)
            .map(|p| p.name.clone())
            .unwrap_or_default(),
        cost,
    }
}

//! Read-only view over the store's tables.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use vendops_core::{
    DemandRecordId, LocationId, MachineId, MachineRestockId, Money, ProductCostId, ProductId,
    RestockEntryId, SlotId, VisitId,
};
use vendops_fleet::{Location, Machine, MachineSlot};
use vendops_products::{Product, ProductCost, historical_unit_cost};
use vendops_visits::{EntryCounts, MachineRestock, RestockEntry, Visit};

use crate::demand::DemandRecord;

/// Borrowed tables an analytics computation runs against.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub locations: &'a BTreeMap<LocationId, Location>,
    pub machines: &'a BTreeMap<MachineId, Machine>,
    pub products: &'a BTreeMap<ProductId, Product>,
    pub slots: &'a BTreeMap<SlotId, MachineSlot>,
    pub visits: &'a BTreeMap<VisitId, Visit>,
    pub restocks: &'a BTreeMap<MachineRestockId, MachineRestock>,
    pub entries: &'a BTreeMap<RestockEntryId, RestockEntry>,
    pub costs: &'a BTreeMap<ProductCostId, ProductCost>,
    pub demand: &'a BTreeMap<DemandRecordId, DemandRecord>,
}

/// A restock entry joined with its machine restock and visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub entry_id: RestockEntryId,
    pub visit_id: VisitId,
    pub visit_date: DateTime<Utc>,
    pub location_id: LocationId,
    pub machine_id: MachineId,
    pub product_id: ProductId,
    pub counts: EntryCounts,
}

impl<'a> Snapshot<'a> {
    /// All restock entries in chronological order (visit date, visit, entry).
    ///
    /// Entries whose restock or visit is missing are skipped.
    pub fn observations(&self) -> Vec<Observation> {
        let mut out: Vec<Observation> = self
            .entries
            .values()
            .filter_map(|entry| {
                let restock = self.restocks.get(&entry.machine_restock_id)?;
                let visit = self.visits.get(&restock.visit_id)?;
                Some(Observation {
                    entry_id: entry.id,
                    visit_id: visit.id,
                    visit_date: visit.visit_date,
                    location_id: visit.location_id,
                    machine_id: restock.machine_id,
                    product_id: entry.product_id,
                    counts: entry.counts(),
                })
            })
            .collect();
        out.sort_by_key(|o| (o.visit_date, o.visit_id, o.entry_id));
        out
    }

    pub fn location_name(&self, id: LocationId) -> String {
        self.locations
            .get(&id)
            .map(|l| l.name.clone())
            .unwrap_or_default()
    }

    pub fn product_name(&self, id: ProductId) -> String {
        self.products
            .get(&id)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    /// `"{type} {model}"` of a machine.
    pub fn machine_name(&self, id: MachineId) -> String {
        self.machines
            .get(&id)
            .map(|m| m.short_label())
            .unwrap_or_default()
    }

    /// `"{name} - {type} at {location}"` of a machine.
    pub fn machine_label(&self, id: MachineId) -> String {
        self.machines
            .get(&id)
            .map(|m| m.label(&self.location_name(m.location_id)))
            .unwrap_or_default()
    }

    pub fn machine_location(&self, id: MachineId) -> Option<LocationId> {
        self.machines.get(&id).map(|m| m.location_id)
    }

    pub fn slot_for(&self, machine: MachineId, product: ProductId) -> Option<&'a MachineSlot> {
        self.slots
            .values()
            .find(|s| s.machine_id == machine && s.product_id == product)
    }

    /// Selling price of `product` in `machine`, zero without a slot.
    pub fn price_of(&self, machine: MachineId, product: ProductId) -> Money {
        self.slot_for(machine, product)
            .map(|s| s.price)
            .unwrap_or(Money::ZERO)
    }

    pub fn unit_cost_at(&self, product: ProductId, at: DateTime<Utc>) -> Money {
        historical_unit_cost(self.costs.values().filter(|c| c.product_id == product), at)
    }
}

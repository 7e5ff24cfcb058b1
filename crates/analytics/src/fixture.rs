//! Owned tables for building test snapshots.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use vendops_core::{
    DemandRecordId, LocationId, MachineId, MachineRestockId, ProductCostId, ProductId,
    RestockEntryId, SlotId, VisitId,
};
use vendops_fleet::{Location, LocationDraft, Machine, MachineDraft, MachineSlot, MachineType, SlotDraft};
use vendops_products::{Product, ProductCost, ProductCostDraft, ProductDraft, ProductType};
use vendops_visits::{EntryCounts, MachineRestock, RestockEntry, Visit, VisitDraft};

use crate::demand::{DemandRecord, derive_demand};
use crate::snapshot::Snapshot;

#[derive(Debug, Default)]
pub(crate) struct Fixture {
    pub locations: BTreeMap<LocationId, Location>,
    pub machines: BTreeMap<MachineId, Machine>,
    pub products: BTreeMap<ProductId, Product>,
    pub slots: BTreeMap<SlotId, MachineSlot>,
    pub visits: BTreeMap<VisitId, Visit>,
    pub restocks: BTreeMap<MachineRestockId, MachineRestock>,
    pub entries: BTreeMap<RestockEntryId, RestockEntry>,
    pub costs: BTreeMap<ProductCostId, ProductCost>,
    pub demand: BTreeMap<DemandRecordId, DemandRecord>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            locations: &self.locations,
            machines: &self.machines,
            products: &self.products,
            slots: &self.slots,
            visits: &self.visits,
            restocks: &self.restocks,
            entries: &self.entries,
            costs: &self.costs,
            demand: &self.demand,
        }
    }

    pub fn location(&mut self, name: &str) -> LocationId {
        let loc = LocationDraft::new(name, "")
            .into_location(LocationId::new(), Utc::now())
            .unwrap();
        let id = loc.id;
        self.locations.insert(id, loc);
        id
    }

    pub fn machine(&mut self, location: LocationId, model: &str) -> MachineId {
        let m = MachineDraft {
            name: format!("Machine {model}"),
            location,
            machine_type: MachineType::Combo,
            model: Some(model.to_string()),
        }
        .into_machine(MachineId::new(), Utc::now())
        .unwrap();
        let id = m.id;
        self.machines.insert(id, m);
        id
    }

    pub fn product(&mut self, name: &str) -> ProductId {
        let p = ProductDraft::new(name, ProductType::Soda)
            .into_product(ProductId::new(), Utc::now())
            .unwrap();
        let id = p.id;
        self.products.insert(id, p);
        id
    }

    pub fn slot(&mut self, machine: MachineId, product: ProductId, n: u32, price: &str, stock: Option<i64>) -> SlotId {
        let s = SlotDraft {
            machine,
            product,
            price: price.parse().unwrap(),
            slot: n,
            current_stock: stock,
        }
        .into_slot(SlotId::new(), Utc::now())
        .unwrap();
        let id = s.id;
        self.slots.insert(id, s);
        id
    }

    pub fn cost(&mut self, product: ProductId, date: DateTime<Utc>, unit: &str) {
        let c = ProductCostDraft {
            product,
            purchase: None,
            date: Some(date),
            quantity: 1,
            unit_cost: unit.parse().unwrap(),
            total_cost: None,
        }
        .into_cost(ProductCostId::new(), date)
        .unwrap();
        self.costs.insert(c.id, c);
    }

    /// One visit with one machine restock holding one entry.
    pub fn visit_entry(
        &mut self,
        location: LocationId,
        machine: MachineId,
        product: ProductId,
        date: DateTime<Utc>,
        counts: EntryCounts,
    ) -> VisitId {
        let visit = VisitDraft::new(location, date)
            .into_visit(VisitId::new(), date)
            .unwrap();
        let restock = MachineRestock::new(visit.id, machine, None, date);
        let entry = RestockEntry::new(restock.id, product, counts, date).unwrap();
        let id = visit.id;
        self.visits.insert(visit.id, visit);
        self.restocks.insert(restock.id, restock);
        self.entries.insert(entry.id, entry);
        id
    }

    pub fn rebuild_demand(&mut self, now: DateTime<Utc>) {
        let records = derive_demand(&self.snapshot(), None, now);
        self.demand = records.into_iter().map(|r| (r.id, r)).collect();
    }
}

//! The in-memory tables and the record kinds stored in them.

use std::collections::BTreeMap;
use std::fmt::Display;

use serde::Serialize;
use serde::de::DeserializeOwned;

use vendops_analytics::{DemandRecord, Snapshot};
use vendops_core::{
    DemandRecordId, Entity, LocationId, MachineId, MachineRestockId, ProductCostId, ProductId, PurchaseId,
    RestockEntryId, SlotId, SupplierId, VisitId,
};
use vendops_fleet::{Location, Machine, MachineSlot};
use vendops_products::{Product, ProductCost};
use vendops_purchasing::{Supplier, WholesalePurchase};
use vendops_visits::{MachineRestock, RestockEntry, Visit};

use crate::error::{ServiceError, ServiceResult};

/// Every persisted table, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub locations: BTreeMap<LocationId, Location>,
    pub machines: BTreeMap<MachineId, Machine>,
    pub products: BTreeMap<ProductId, Product>,
    pub slots: BTreeMap<SlotId, MachineSlot>,
    pub costs: BTreeMap<ProductCostId, ProductCost>,
    pub suppliers: BTreeMap<SupplierId, Supplier>,
    pub purchases: BTreeMap<PurchaseId, WholesalePurchase>,
    pub visits: BTreeMap<VisitId, Visit>,
    pub restocks: BTreeMap<MachineRestockId, MachineRestock>,
    pub entries: BTreeMap<RestockEntryId, RestockEntry>,
    pub demand: BTreeMap<DemandRecordId, DemandRecord>,
}

impl Tables {
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

    pub fn get<R: Record>(&self, key: R::Key) -> Option<&R> {
        R::table(self).get(&key)
    }

    /// Insert a stored document of `kind` while loading from a journal.
    pub fn restore(&mut self, kind: &str, data: serde_json::Value) -> ServiceResult<()> {
        fn put<R: Record>(tables: &mut Tables, data: serde_json::Value) -> ServiceResult<()> {
            let record: R = serde_json::from_value(data)?;
            R::table_mut(tables).insert(record.key(), record);
            Ok(())
        }

        match kind {
            Location::KIND => put::<Location>(self, data),
            Machine::KIND => put::<Machine>(self, data),
            Product::KIND => put::<Product>(self, data),
            MachineSlot::KIND => put::<MachineSlot>(self, data),
            ProductCost::KIND => put::<ProductCost>(self, data),
            Supplier::KIND => put::<Supplier>(self, data),
            WholesalePurchase::KIND => put::<WholesalePurchase>(self, data),
            Visit::KIND => put::<Visit>(self, data),
            MachineRestock::KIND => put::<MachineRestock>(self, data),
            RestockEntry::KIND => put::<RestockEntry>(self, data),
            DemandRecord::KIND => put::<DemandRecord>(self, data),
            other => Err(ServiceError::persistence(format!("unknown record kind '{other}'"))),
        }
    }

    /// Number of records across all tables.
    pub fn len(&self) -> usize {
        self.locations.len()
            + self.machines.len()
            + self.products.len()
            + self.slots.len()
            + self.costs.len()
            + self.suppliers.len()
            + self.purchases.len()
            + self.visits.len()
            + self.restocks.len()
            + self.entries.len()
            + self.demand.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A document type with its own table.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Key: Copy + Ord + Display;

    /// Journal kind, also the resource name in not-found errors.
    const KIND: &'static str;

    fn key(&self) -> Self::Key;
    fn table(tables: &Tables) -> &BTreeMap<Self::Key, Self>;
    fn table_mut(tables: &mut Tables) -> &mut BTreeMap<Self::Key, Self>;
}

macro_rules! record {
    ($ty:ty, $key:ty, $kind:literal, $field:ident) => {
        impl Record for $ty {
            type Key = $key;
            const KIND: &'static str = $kind;

            fn key(&self) -> $key {
                Entity::id(self)
            }

            fn table(tables: &Tables) -> &BTreeMap<$key, Self> {
                &tables.$field
            }

            fn table_mut(tables: &mut Tables) -> &mut BTreeMap<$key, Self> {
                &mut tables.$field
            }
        }
    };
}

record!(Location, LocationId, "location", locations);
record!(Machine, MachineId, "machine", machines);
record!(Product, ProductId, "product", products);
record!(MachineSlot, SlotId, "machine item", slots);
record!(ProductCost, ProductCostId, "product cost", costs);
record!(Supplier, SupplierId, "supplier", suppliers);
record!(WholesalePurchase, PurchaseId, "purchase", purchases);
record!(Visit, VisitId, "visit", visits);
record!(MachineRestock, MachineRestockId, "machine restock", restocks);
record!(RestockEntry, RestockEntryId, "restock entry", entries);
record!(DemandRecord, DemandRecordId, "demand record", demand);

//! Dependent-record removal when a parent record is deleted.
//!
//! Cascades remove records only; they never revert stock.

use std::collections::BTreeSet;

use vendops_analytics::DemandRecord;
use vendops_core::{LocationId, MachineId, MachineRestockId, ProductId, VisitId};
use vendops_fleet::{Location, Machine, MachineSlot};
use vendops_products::{Product, ProductCost};
use vendops_purchasing::WholesalePurchase;
use vendops_visits::{MachineRestock, RestockEntry, Visit};

use crate::store::Tx;

/// Remove restocks matching `pred` together with their entries.
pub(crate) fn remove_restocks<P>(tx: &mut Tx, pred: P) -> Vec<MachineRestock>
where
    P: Fn(&MachineRestock) -> bool,
{
    let removed = tx.remove_where::<MachineRestock, _>(pred);
    let ids: BTreeSet<MachineRestockId> = removed.iter().map(|r| r.id).collect();
    tx.remove_where::<RestockEntry, _>(|e| ids.contains(&e.machine_restock_id));
    removed
}

pub(crate) fn machine(tx: &mut Tx, id: MachineId) {
    tx.remove_where::<MachineSlot, _>(|s| s.machine_id == id);
    remove_restocks(tx, |r| r.machine_id == id);
    tx.remove_where::<DemandRecord, _>(|d| d.machine_id == id);
    tx.remove::<Machine>(id);
}

pub(crate) fn visit(tx: &mut Tx, id: VisitId) {
    remove_restocks(tx, |r| r.visit_id == id);
    tx.remove_where::<DemandRecord, _>(|d| d.current_visit_id == id || d.previous_visit_id == id);
    tx.remove::<Visit>(id);
}

pub(crate) fn location(tx: &mut Tx, id: LocationId) {
    let machines: Vec<MachineId> = tx
        .tables()
        .machines
        .values()
        .filter(|m| m.location_id == id)
        .map(|m| m.id)
        .collect();
    for m in machines {
        machine(tx, m);
    }
    let visits: Vec<VisitId> = tx
        .tables()
        .visits
        .values()
        .filter(|v| v.location_id == id)
        .map(|v| v.id)
        .collect();
    for v in visits {
        visit(tx, v);
    }
    tx.remove::<Location>(id);
}

pub(crate) fn product(tx: &mut Tx, id: ProductId) {
    tx.remove_where::<MachineSlot, _>(|s| s.product_id == id);
    tx.remove_where::<WholesalePurchase, _>(|p| p.product_id == id);
    tx.remove_where::<ProductCost, _>(|c| c.product_id == id);
    tx.remove_where::<RestockEntry, _>(|e| e.product_id == id);
    tx.remove_where::<DemandRecord, _>(|d| d.product_id == id);
    tx.remove::<Product>(id);
}

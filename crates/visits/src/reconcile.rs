//! Stock reconciliation planning.
//!
//! Restock entries move stock two ways: units loaded leave the warehouse
//! (`Product::inventory_quantity`) and the machine slot's `current_stock`
//! changes. This module only computes the changes; infra applies them.

use std::collections::BTreeMap;

use vendops_core::{MachineId, ProductId};

use crate::restock::{EntryCounts, RestockEntry};

/// How a slot's `current_stock` changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotChange {
    /// Overwrite with an observed count.
    Set(i64),
    /// Shift a known count. An uncounted slot (`None`) stays uncounted.
    Adjust(i64),
}

impl SlotChange {
    pub fn apply(self, current: Option<i64>) -> Option<i64> {
        match self {
            SlotChange::Set(v) => Some(v),
            SlotChange::Adjust(d) => current.map(|c| c.saturating_add(d)),
        }
    }

    /// Compose `self` followed by `next`.
    pub fn then(self, next: SlotChange) -> SlotChange {
        match (self, next) {
            (_, SlotChange::Set(v)) => SlotChange::Set(v),
            (SlotChange::Set(v), SlotChange::Adjust(d)) => SlotChange::Set(v.saturating_add(d)),
            (SlotChange::Adjust(a), SlotChange::Adjust(b)) => SlotChange::Adjust(a.saturating_add(b)),
        }
    }
}

/// Stock movement caused by one entry operation in one machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockEffect {
    pub machine_id: MachineId,
    pub product_id: ProductId,
    pub warehouse_delta: i64,
    pub slot: SlotChange,
}

impl StockEffect {
    /// Entry recorded: loaded units leave the warehouse, slot shows what is now inside.
    pub fn recorded(machine_id: MachineId, product_id: ProductId, counts: EntryCounts) -> Self {
        Self {
            machine_id,
            product_id,
            warehouse_delta: -counts.restocked,
            slot: SlotChange::Set(counts.stock_after()),
        }
    }

    /// Entry removed: loaded units go back, the slot loses the net load.
    pub fn reverted(machine_id: MachineId, entry: &RestockEntry) -> Self {
        Self {
            machine_id,
            product_id: entry.product_id,
            warehouse_delta: entry.restocked,
            slot: SlotChange::Adjust(-(entry.restocked - entry.discarded)),
        }
    }

    /// Entry edited in place.
    ///
    /// When the product or machine changed, the old entry is reverted and the
    /// new one recorded.
    pub fn changed(
        old_machine: MachineId,
        old: &RestockEntry,
        new_machine: MachineId,
        new: &RestockEntry,
    ) -> Vec<Self> {
        if old_machine != new_machine || old.product_id != new.product_id {
            return vec![
                Self::reverted(old_machine, old),
                Self::recorded(new_machine, new.product_id, new.counts()),
            ];
        }
        vec![Self {
            machine_id: new_machine,
            product_id: new.product_id,
            warehouse_delta: old.restocked - new.restocked,
            slot: SlotChange::Adjust(
                (new.restocked - old.restocked) - (new.discarded - old.discarded),
            ),
        }]
    }
}

/// Net stock changes of a batch of entry operations.
///
/// Warehouse deltas are summed per product; slot changes are composed per
/// `(machine, product)` in the order they were pushed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    warehouse: BTreeMap<ProductId, i64>,
    slots: BTreeMap<(MachineId, ProductId), SlotChange>,
}

impl ReconciliationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, effect: StockEffect) {
        *self.warehouse.entry(effect.product_id).or_insert(0) += effect.warehouse_delta;
        let key = (effect.machine_id, effect.product_id);
        let next = match self.slots.get(&key) {
            Some(prev) => prev.then(effect.slot),
            None => effect.slot,
        };
        self.slots.insert(key, next);
    }

    pub fn extend<I: IntoIterator<Item = StockEffect>>(&mut self, effects: I) {
        for effect in effects {
            self.push(effect);
        }
    }

    /// Non-zero warehouse deltas per product.
    pub fn warehouse_deltas(&self) -> impl Iterator<Item = (ProductId, i64)> + '_ {
        self.warehouse
            .iter()
            .filter(|(_, d)| **d != 0)
            .map(|(p, d)| (*p, *d))
    }

    pub fn slot_changes(&self) -> impl Iterator<Item = (MachineId, ProductId, SlotChange)> + '_ {
        self.slots.iter().map(|((m, p), c)| (*m, *p, *c))
    }

    pub fn is_empty(&self) -> bool {
        self.warehouse_deltas().next().is_none() && self.slots.is_empty()
    }
}

//! Visits, machine restocks and restock entries.
//!
//! Every entry operation becomes a `ReconciliationPlan` that moves warehouse
//! and slot stock, and the demand records of the touched `(machine, product)`
//! pairs are rebuilt in the same transaction.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use vendops_core::{
    DomainError, LocationId, MachineId, MachineRestockId, ProductId, RestockEntryId, UserId,
    VisitId,
};
use vendops_fleet::{Location, Machine};
use vendops_products::Product;
use vendops_visits::{
    BulkVisitPayload, MachineRestock, MachineRestockDraft, MachineRestockPatch,
    ReconciliationPlan, RestockEntry, RestockEntryDraft, RestockEntryPatch, StockEffect, Visit,
    VisitDraft, VisitPatch,
};

use crate::error::{ServiceError, ServiceResult};
use crate::store::{Tables, Tx};

use super::{Services, apply_plan, cascade, demand, ensure_ref};

type Pairs = BTreeSet<(MachineId, ProductId)>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitView {
    #[serde(flatten)]
    pub visit: Visit,
    pub location_name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestockView {
    #[serde(flatten)]
    pub restock: MachineRestock,
    pub machine_info: String,
    pub visit_info: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryView {
    #[serde(flatten)]
    pub entry: RestockEntry,
    pub stock_after: i64,
    pub product_name: String,
    pub machine_info: String,
    pub visit_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestockDetail {
    #[serde(flatten)]
    pub restock: RestockView,
    pub restock_entries: Vec<EntryView>,
}

/// A visit with everything recorded during it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitDetail {
    #[serde(flatten)]
    pub visit: VisitView,
    pub machine_restocks: Vec<RestockDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitFilter {
    pub location: Option<LocationId>,
    pub user: Option<UserId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestockFilter {
    pub visit: Option<VisitId>,
    pub machine: Option<MachineId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub machine_restock: Option<MachineRestockId>,
    pub product: Option<ProductId>,
}

fn visit_view(tables: &Tables, visit: &Visit) -> VisitView {
    let location_name = tables.snapshot().location_name(visit.location_id);
    VisitView {
        description: visit.describe(&location_name),
        visit: visit.clone(),
        location_name,
    }
}

fn visit_info(tables: &Tables, visit: VisitId) -> String {
    tables
        .visits
        .get(&visit)
        .map(|v| v.describe(&tables.snapshot().location_name(v.location_id)))
        .unwrap_or_default()
}

fn restock_view(tables: &Tables, restock: &MachineRestock) -> RestockView {
    RestockView {
        machine_info: tables.snapshot().machine_label(restock.machine_id),
        visit_info: visit_info(tables, restock.visit_id),
        restock: restock.clone(),
    }
}

fn entry_view(tables: &Tables, entry: &RestockEntry) -> EntryView {
    let restock = tables.restocks.get(&entry.machine_restock_id);
    EntryView {
        stock_after: entry.stock_after(),
        product_name: tables.snapshot().product_name(entry.product_id),
        machine_info: restock
            .map(|r| tables.snapshot().machine_label(r.machine_id))
            .unwrap_or_default(),
        visit_date: restock
            .and_then(|r| tables.visits.get(&r.visit_id))
            .map(|v| v.visit_date),
        entry: entry.clone(),
    }
}

fn visit_detail(tables: &Tables, visit: &Visit) -> VisitDetail {
    let mut restocks: Vec<RestockView> = tables
        .restocks
        .values()
        .filter(|r| r.visit_id == visit.id)
        .map(|r| restock_view(tables, r))
        .collect();
    restocks.sort_by(|a, b| a.machine_info.cmp(&b.machine_info));
    let machine_restocks = restocks
        .into_iter()
        .map(|restock| {
            let mut entries: Vec<EntryView> = tables
                .entries
                .values()
                .filter(|e| e.machine_restock_id == restock.restock.id)
                .map(|e| entry_view(tables, e))
                .collect();
            entries.sort_by_key(|e| e.product_name.to_lowercase());
            RestockDetail {
                restock,
                restock_entries: entries,
            }
        })
        .collect();
    VisitDetail {
        visit: visit_view(tables, visit),
        machine_restocks,
    }
}

fn machine_of(tx: &Tx, restock: MachineRestockId) -> ServiceResult<MachineId> {
    Ok(tx.require::<MachineRestock>(restock)?.machine_id)
}

/// Revert effects of every entry recorded under restocks matching `pred`.
fn reverts_where<P>(tables: &Tables, pred: P) -> Vec<StockEffect>
where
    P: Fn(&MachineRestock) -> bool,
{
    tables
        .restocks
        .values()
        .filter(|r| pred(r))
        .flat_map(|r| {
            tables
                .entries
                .values()
                .filter(move |e| e.machine_restock_id == r.id)
                .map(move |e| StockEffect::reverted(r.machine_id, e))
        })
        .collect()
}

fn ensure_restock_unique(tx: &Tx, restock: &MachineRestock) -> ServiceResult<()> {
    let taken = tx.tables().restocks.values().any(|r| {
        r.id != restock.id && r.visit_id == restock.visit_id && r.machine_id == restock.machine_id
    });
    if taken {
        return Err(DomainError::conflict("This machine already has a restock in this visit.").into());
    }
    Ok(())
}

/// A restock's machine has to stand at its visit's location.
fn ensure_machine_at_visit(tx: &Tx, machine: MachineId, visit: &Visit) -> ServiceResult<()> {
    let machine = tx.require::<Machine>(machine)?;
    if machine.location_id != visit.location_id {
        return Err(DomainError::validation(format!(
            "Machine {} is not at the visit's location",
            machine.short_label()
        ))
        .into());
    }
    Ok(())
}

/// Insert the payload's restocks and entries under `visit`, planning their stock effects.
fn record_bulk(
    tx: &mut Tx,
    visit: &Visit,
    payload: &BulkVisitPayload,
    plan: &mut ReconciliationPlan,
) -> ServiceResult<Pairs> {
    payload.validate_restocks()?;
    let now = tx.now();
    let mut pairs = Pairs::new();
    for bulk in payload.effective_restocks() {
        ensure_ref::<Machine>(tx, "machine", bulk.machine)?;
        ensure_machine_at_visit(tx, bulk.machine, visit)?;
        let restock = MachineRestock::new(visit.id, bulk.machine, bulk.notes.clone(), now);
        for item in &bulk.restock_entries {
            ensure_ref::<Product>(tx, "product", item.product)?;
            let entry = RestockEntry::new(restock.id, item.product, item.counts, now)?;
            plan.push(StockEffect::recorded(bulk.machine, item.product, item.counts));
            pairs.insert((bulk.machine, item.product));
            tx.put(entry)?;
        }
        tx.put(restock)?;
    }
    Ok(pairs)
}

fn entry_count(detail: &VisitDetail) -> usize {
    detail
        .machine_restocks
        .iter()
        .map(|r| r.restock_entries.len())
        .sum()
}

impl Services {
    // ---- visits

    pub async fn create_visit(&self, draft: VisitDraft) -> ServiceResult<VisitView> {
        self.mutate(|tx| {
            ensure_ref::<Location>(tx, "location", draft.location)?;
            let visit = draft.into_visit(VisitId::new(), tx.now())?;
            tx.put(visit.clone())?;
            Ok(visit_view(tx.tables(), &visit))
        })
        .await
    }

    /// Most recent first.
    pub async fn list_visits(&self, filter: &VisitFilter) -> Vec<VisitView> {
        let tables = self.store.read().await;
        let mut visits: Vec<&Visit> = tables
            .visits
            .values()
            .filter(|v| filter.location.is_none_or(|l| l == v.location_id))
            .filter(|v| filter.user.is_none_or(|u| Some(u) == v.user_id))
            .collect();
        visits.sort_by(|a, b| b.visit_date.cmp(&a.visit_date));
        visits.into_iter().map(|v| visit_view(&tables, v)).collect()
    }

    pub async fn get_visit(&self, id: VisitId) -> ServiceResult<VisitDetail> {
        let tables = self.store.read().await;
        let visit = tables.get::<Visit>(id).ok_or(ServiceError::NotFound("visit"))?;
        Ok(visit_detail(&tables, visit))
    }

    /// A date change reorders demand intervals, so the visit's pairs are rebuilt.
    ///
    /// The location can only move while every restocked machine stands there.
    pub async fn update_visit(&self, id: VisitId, patch: VisitPatch) -> ServiceResult<VisitView> {
        self.mutate(|tx| {
            let mut visit = tx.require::<Visit>(id)?.clone();
            if let Some(location) = patch.location {
                ensure_ref::<Location>(tx, "location", location)?;
            }
            let moved = patch.location.is_some_and(|l| l != visit.location_id);
            visit.apply(patch, tx.now())?;
            if moved {
                let machines: Vec<MachineId> = tx
                    .tables()
                    .restocks
                    .values()
                    .filter(|r| r.visit_id == id)
                    .map(|r| r.machine_id)
                    .collect();
                for machine in machines {
                    ensure_machine_at_visit(tx, machine, &visit)?;
                }
            }
            tx.put(visit.clone())?;
            let pairs = demand::pairs_in_visit(tx, id);
            demand::rebuild(tx, &pairs)?;
            Ok(visit_view(tx.tables(), &visit))
        })
        .await
    }

    /// Reverts every entry of the visit, then removes it with its restocks.
    pub async fn delete_visit(&self, id: VisitId) -> ServiceResult<()> {
        let reverted = self
            .mutate(|tx| {
                tx.require::<Visit>(id)?;
                let pairs = demand::pairs_in_visit(tx, id);
                let mut plan = ReconciliationPlan::new();
                plan.extend(reverts_where(tx.tables(), |r| r.visit_id == id));
                apply_plan(tx, &plan)?;
                cascade::visit(tx, id);
                demand::rebuild(tx, &pairs)?;
                Ok(pairs.len())
            })
            .await?;
        tracing::info!(visit = %id, pairs = reverted, "visit deleted and stock reverted");
        Ok(())
    }

    /// Visit, restocks and entries in one transaction.
    pub async fn bulk_save(&self, payload: BulkVisitPayload) -> ServiceResult<VisitDetail> {
        let detail = self
            .mutate(|tx| {
                let draft = payload.visit_draft()?;
                ensure_ref::<Location>(tx, "location", draft.location)?;
                let visit = draft.into_visit(VisitId::new(), tx.now())?;
                tx.put(visit.clone())?;
                let mut plan = ReconciliationPlan::new();
                let pairs = record_bulk(tx, &visit, &payload, &mut plan)?;
                apply_plan(tx, &plan)?;
                demand::rebuild(tx, &pairs)?;
                Ok(visit_detail(tx.tables(), &visit))
            })
            .await?;
        tracing::info!(
            visit = %detail.visit.visit.id,
            restocks = detail.machine_restocks.len(),
            entries = entry_count(&detail),
            "bulk visit saved"
        );
        Ok(detail)
    }

    /// Replace a visit's restocks: old entries are reverted, the payload recorded.
    pub async fn bulk_update(&self, id: VisitId, payload: BulkVisitPayload) -> ServiceResult<VisitDetail> {
        let detail = self
            .mutate(|tx| {
                let mut visit = tx.require::<Visit>(id)?.clone();
                let patch = payload.visit_patch();
                if let Some(location) = patch.location {
                    ensure_ref::<Location>(tx, "location", location)?;
                }
                visit.apply(patch, tx.now())?;
                tx.put(visit.clone())?;

                let mut pairs = demand::pairs_in_visit(tx, id);
                let mut plan = ReconciliationPlan::new();
                plan.extend(reverts_where(tx.tables(), |r| r.visit_id == id));
                cascade::remove_restocks(tx, |r| r.visit_id == id);

                pairs.extend(record_bulk(tx, &visit, &payload, &mut plan)?);
                apply_plan(tx, &plan)?;
                demand::rebuild(tx, &pairs)?;
                Ok(visit_detail(tx.tables(), &visit))
            })
            .await?;
        tracing::info!(
            visit = %id,
            restocks = detail.machine_restocks.len(),
            entries = entry_count(&detail),
            "bulk visit updated"
        );
        Ok(detail)
    }

    // ---- machine restocks

    pub async fn create_restock(&self, draft: MachineRestockDraft) -> ServiceResult<RestockView> {
        self.mutate(|tx| {
            ensure_ref::<Visit>(tx, "visit", draft.visit)?;
            ensure_ref::<Machine>(tx, "machine", draft.machine)?;
            let visit = tx.require::<Visit>(draft.visit)?.clone();
            ensure_machine_at_visit(tx, draft.machine, &visit)?;
            let restock = MachineRestock::new(draft.visit, draft.machine, draft.notes, tx.now());
            ensure_restock_unique(tx, &restock)?;
            tx.put(restock.clone())?;
            Ok(restock_view(tx.tables(), &restock))
        })
        .await
    }

    pub async fn list_restocks(&self, filter: &RestockFilter) -> Vec<RestockView> {
        let tables = self.store.read().await;
        let mut restocks: Vec<&MachineRestock> = tables
            .restocks
            .values()
            .filter(|r| filter.visit.is_none_or(|v| v == r.visit_id))
            .filter(|r| filter.machine.is_none_or(|m| m == r.machine_id))
            .collect();
        restocks.sort_by_key(|r| {
            std::cmp::Reverse(tables.visits.get(&r.visit_id).map(|v| v.visit_date))
        });
        restocks
            .into_iter()
            .map(|r| restock_view(&tables, r))
            .collect()
    }

    pub async fn get_restock(&self, id: MachineRestockId) -> ServiceResult<RestockView> {
        let tables = self.store.read().await;
        let restock = tables
            .get::<MachineRestock>(id)
            .ok_or(ServiceError::NotFound("machine restock"))?;
        Ok(restock_view(&tables, restock))
    }

    /// Moving a restock to another machine moves its entries' slot effects with it.
    pub async fn update_restock(
        &self,
        id: MachineRestockId,
        patch: MachineRestockPatch,
    ) -> ServiceResult<RestockView> {
        self.mutate(|tx| {
            let old = tx.require::<MachineRestock>(id)?.clone();
            if let Some(visit) = patch.visit {
                ensure_ref::<Visit>(tx, "visit", visit)?;
            }
            if let Some(machine) = patch.machine {
                ensure_ref::<Machine>(tx, "machine", machine)?;
            }
            let mut updated = old.clone();
            updated.apply(patch, tx.now());
            if updated.machine_id != old.machine_id || updated.visit_id != old.visit_id {
                let visit = tx.require::<Visit>(updated.visit_id)?.clone();
                ensure_machine_at_visit(tx, updated.machine_id, &visit)?;
            }
            ensure_restock_unique(tx, &updated)?;

            let entries: Vec<RestockEntry> = tx
                .tables()
                .entries
                .values()
                .filter(|e| e.machine_restock_id == id)
                .cloned()
                .collect();
            let mut plan = ReconciliationPlan::new();
            let mut pairs = Pairs::new();
            for entry in &entries {
                pairs.insert((old.machine_id, entry.product_id));
                pairs.insert((updated.machine_id, entry.product_id));
                if old.machine_id != updated.machine_id {
                    plan.extend(StockEffect::changed(old.machine_id, entry, updated.machine_id, entry));
                }
            }
            apply_plan(tx, &plan)?;
            tx.put(updated.clone())?;
            demand::rebuild(tx, &pairs)?;
            Ok(restock_view(tx.tables(), &updated))
        })
        .await
    }

    /// Reverts the restock's entries before removing them.
    pub async fn delete_restock(&self, id: MachineRestockId) -> ServiceResult<()> {
        self.mutate(|tx| {
            let restock = tx.require::<MachineRestock>(id)?.clone();
            let mut plan = ReconciliationPlan::new();
            plan.extend(reverts_where(tx.tables(), |r| r.id == id));
            apply_plan(tx, &plan)?;
            let pairs: Pairs = tx
                .tables()
                .entries
                .values()
                .filter(|e| e.machine_restock_id == id)
                .map(|e| (restock.machine_id, e.product_id))
                .collect();
            cascade::remove_restocks(tx, |r| r.id == id);
            demand::rebuild(tx, &pairs)?;
            Ok(())
        })
        .await
    }

    // ---- restock entries

    pub async fn create_entry(&self, draft: RestockEntryDraft) -> ServiceResult<EntryView> {
        let view = self
            .mutate(|tx| {
                ensure_ref::<MachineRestock>(tx, "machine_restock", draft.machine_restock)?;
                ensure_ref::<Product>(tx, "product", draft.product)?;
                let machine = machine_of(tx, draft.machine_restock)?;
                let entry = RestockEntry::new(draft.machine_restock, draft.product, draft.counts, tx.now())?;

                let mut plan = ReconciliationPlan::new();
                plan.push(StockEffect::recorded(machine, entry.product_id, entry.counts()));
                apply_plan(tx, &plan)?;
                tx.put(entry.clone())?;
                demand::rebuild(tx, &Pairs::from([(machine, entry.product_id)]))?;
                Ok(entry_view(tx.tables(), &entry))
            })
            .await?;
        tracing::debug!(entry = %view.entry.id, restocked = view.entry.restocked, "restock entry recorded");
        Ok(view)
    }

    pub async fn list_entries(&self, filter: &EntryFilter) -> Vec<EntryView> {
        let tables = self.store.read().await;
        let mut entries: Vec<EntryView> = tables
            .entries
            .values()
            .filter(|e| filter.machine_restock.is_none_or(|r| r == e.machine_restock_id))
            .filter(|e| filter.product.is_none_or(|p| p == e.product_id))
            .map(|e| entry_view(&tables, e))
            .collect();
        entries.sort_by(|a, b| {
            b.visit_date
                .cmp(&a.visit_date)
                .then_with(|| a.product_name.to_lowercase().cmp(&b.product_name.to_lowercase()))
        });
        entries
    }

    pub async fn get_entry(&self, id: RestockEntryId) -> ServiceResult<EntryView> {
        let tables = self.store.read().await;
        let entry = tables
            .get::<RestockEntry>(id)
            .ok_or(ServiceError::NotFound("restock entry"))?;
        Ok(entry_view(&tables, entry))
    }

    pub async fn update_entry(&self, id: RestockEntryId, patch: RestockEntryPatch) -> ServiceResult<EntryView> {
        self.mutate(|tx| {
            let old = tx.require::<RestockEntry>(id)?.clone();
            if let Some(restock) = patch.machine_restock {
                ensure_ref::<MachineRestock>(tx, "machine_restock", restock)?;
            }
            if let Some(product) = patch.product {
                ensure_ref::<Product>(tx, "product", product)?;
            }
            let mut updated = old.clone();
            updated.apply(patch, tx.now())?;

            let old_machine = machine_of(tx, old.machine_restock_id)?;
            let new_machine = machine_of(tx, updated.machine_restock_id)?;
            let mut plan = ReconciliationPlan::new();
            plan.extend(StockEffect::changed(old_machine, &old, new_machine, &updated));
            apply_plan(tx, &plan)?;
            tx.put(updated.clone())?;
            demand::rebuild(
                tx,
                &Pairs::from([(old_machine, old.product_id), (new_machine, updated.product_id)]),
            )?;
            Ok(entry_view(tx.tables(), &updated))
        })
        .await
    }

    pub async fn delete_entry(&self, id: RestockEntryId) -> ServiceResult<()> {
        self.mutate(|tx| {
            let entry = tx.require::<RestockEntry>(id)?.clone();
            let machine = machine_of(tx, entry.machine_restock_id)?;
            let mut plan = ReconciliationPlan::new();
            plan.push(StockEffect::reverted(machine, &entry));
            apply_plan(tx, &plan)?;
            tx.remove::<RestockEntry>(id);
            demand::rebuild(tx, &Pairs::from([(machine, entry.product_id)]))?;
            Ok(())
        })
        .await
    }
}

//! Application services: every operation of the HTTP API, one transaction each.
//!
//! `Services` is split by area:
//! - `catalog`: locations, machines, products, machine items (slots), product costs
//! - `purchasing`: suppliers and wholesale purchases
//! - `visits`: visits, machine restocks, restock entries, bulk save
//! - `reports`: cached analytics views, demand tracking, cache admin

use std::sync::Arc;

use vendops_core::{DomainError, DomainResult, MachineId, ProductId};
use vendops_visits::ReconciliationPlan;
use vendops_fleet::MachineSlot;
use vendops_products::Product;

use crate::cache::AnalyticsCache;
use crate::config::AppConfig;
use crate::error::ServiceResult;
use crate::store::{Record, SqliteJournal, Store, Tx};

pub mod catalog;
mod cascade;
mod demand;
pub mod purchasing;
pub mod reports;
pub mod visits;

#[derive(Debug)]
pub struct Services {
    store: Store,
    cache: AnalyticsCache,
    config: AppConfig,
}

impl Services {
    /// Services over a store that lives only in this process.
    pub fn in_memory(config: AppConfig) -> Self {
        Self {
            cache: AnalyticsCache::from_config(&config),
            store: Store::in_memory(),
            config,
        }
    }

    /// Services backed by `config.database_url` when set, in memory otherwise.
    pub async fn open(config: AppConfig) -> ServiceResult<Self> {
        let store = match &config.database_url {
            Some(url) => {
                let journal = SqliteJournal::connect(url).await?;
                tracing::info!(%url, "using sqlite journal");
                Store::open(Arc::new(journal)).await?
            }
            None => {
                tracing::info!("no database configured; state is kept in memory");
                Store::in_memory()
            }
        };
        Ok(Self {
            cache: AnalyticsCache::from_config(&config),
            store,
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn cache(&self) -> &AnalyticsCache {
        &self.cache
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// A write whose result can change analytics: drops cached views on success.
    async fn mutate<T, F>(&self, f: F) -> ServiceResult<T>
    where
        F: FnOnce(&mut Tx) -> ServiceResult<T>,
    {
        let out = self.store.write(f).await?;
        self.cache.invalidate_analytics();
        Ok(out)
    }
}

/// A referenced record from a request body must exist (400, not 404).
pub(crate) fn ensure_ref<R: Record>(tx: &Tx, field: &'static str, key: R::Key) -> DomainResult<()> {
    if tx.get::<R>(key).is_none() {
        return Err(DomainError::field(
            field,
            format!("Invalid pk \"{key}\" - object does not exist."),
        ));
    }
    Ok(())
}

/// Change a product's warehouse stock; it may never go below zero.
pub(crate) fn adjust_inventory(tx: &mut Tx, product_id: ProductId, delta: i64) -> ServiceResult<()> {
    if delta == 0 {
        return Ok(());
    }
    let now = tx.now();
    tx.update::<Product, _>(product_id, |p| {
        let Some(next) = p.inventory_quantity.checked_add(delta) else {
            return Err(DomainError::invariant(format!(
                "Warehouse stock for {} would overflow: {} on hand, {} added",
                p.name, p.inventory_quantity, delta
            ))
            .into());
        };
        if next < 0 {
            return Err(DomainError::invariant(format!(
                "Insufficient warehouse stock for {}: {} available, {} required",
                p.name, p.inventory_quantity, -delta
            ))
            .into());
        }
        p.inventory_quantity = next;
        p.updated_at = now;
        Ok(())
    })?;
    tracing::debug!(product = %product_id, delta, "warehouse inventory adjusted");
    Ok(())
}

pub(crate) fn slot_of(tx: &Tx, machine: MachineId, product: ProductId) -> Option<MachineSlot> {
    tx.tables()
        .slots
        .values()
        .find(|s| s.machine_id == machine && s.product_id == product)
        .cloned()
}

/// Apply the net warehouse and slot changes of a plan.
pub(crate) fn apply_plan(tx: &mut Tx, plan: &ReconciliationPlan) -> ServiceResult<()> {
    let deltas: Vec<(ProductId, i64)> = plan.warehouse_deltas().collect();
    for (product, delta) in deltas {
        adjust_inventory(tx, product, delta)?;
    }
    let now = tx.now();
    let changes: Vec<_> = plan.slot_changes().collect();
    for (machine, product, change) in changes {
        let Some(mut slot) = slot_of(tx, machine, product) else {
            continue;
        };
        slot.current_stock = change.apply(slot.current_stock);
        slot.updated_at = now;
        tx.put(slot)?;
    }
    Ok(())
}

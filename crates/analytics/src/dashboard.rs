use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use vendops_core::{LocationId, MachineId, Money, ProductId};

use crate::demand::DemandQuery;
use crate::period::Period;
use crate::revenue::totals;
use crate::snapshot::Snapshot;

const RECENT_RESTOCK_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardQuery {
    pub location: Option<LocationId>,
    pub period: Period,
    pub low_stock_threshold: i64,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowStockItem {
    pub product_id: ProductId,
    pub product: String,
    pub machine_id: MachineId,
    pub machine: String,
    pub location: String,
    pub slot: u32,
    pub current_stock: i64,
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub locations: usize,
    pub machines: usize,
    pub products: usize,
    pub low_stock_items: Vec<LowStockItem>,
    pub low_stock_count: usize,
    pub recent_restocks: usize,
    pub revenue_total: f64,
    pub profit_total: f64,
    pub profit_margin: f64,
    pub period: Period,
}

pub fn dashboard(snapshot: &Snapshot<'_>, query: &DashboardQuery) -> Dashboard {
    let in_scope = |location: LocationId| query.location.is_none_or(|l| l == location);

    let locations = snapshot.locations.keys().filter(|id| in_scope(**id)).count();
    let machines = snapshot
        .machines
        .values()
        .filter(|m| in_scope(m.location_id))
        .count();

    let mut low_stock_items: Vec<LowStockItem> = snapshot
        .slots
        .values()
        .filter_map(|slot| {
            let stock = slot.current_stock?;
            if stock >= query.low_stock_threshold {
                return None;
            }
            let machine = snapshot.machines.get(&slot.machine_id)?;
            if !in_scope(machine.location_id) {
                return None;
            }
            Some(LowStockItem {
                product_id: slot.product_id,
                product: snapshot.product_name(slot.product_id),
                machine_id: machine.id,
                machine: machine.short_label(),
                location: snapshot.location_name(machine.location_id),
                slot: slot.slot,
                current_stock: stock,
                price: slot.price,
            })
        })
        .collect();
    low_stock_items.sort_by(|a, b| {
        a.current_stock
            .cmp(&b.current_stock)
            .then_with(|| a.product.cmp(&b.product))
    });

    let recent_cutoff = query.now - Duration::days(RECENT_RESTOCK_DAYS);
    let recent_restocks = snapshot
        .observations()
        .iter()
        .filter(|o| o.visit_date >= recent_cutoff && in_scope(o.location_id))
        .count();

    let t = totals(
        snapshot,
        &DemandQuery {
            product: None,
            machine: None,
            location: query.location,
            period: query.period,
        },
        query.period,
    );

    Dashboard {
        locations,
        machines,
        products: snapshot.products.len(),
        low_stock_count: low_stock_items.len(),
        low_stock_items,
        recent_restocks,
        revenue_total: t.revenue.as_f64(),
        profit_total: t.profit().as_f64(),
        profit_margin: t.margin(),
        period: query.period,
    }
}

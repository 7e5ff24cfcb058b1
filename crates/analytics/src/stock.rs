//! Stock reports: time series, current stock, restock summary, coverage.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use vendops_core::{LocationId, MachineId, Money, ProductId, VisitId};

use crate::period::Period;
use crate::round2;
use crate::snapshot::Snapshot;

/// One restock entry as a point of the stock time series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockLevelPoint {
    pub date: DateTime<Utc>,
    pub product_id: ProductId,
    pub product: String,
    pub machine_id: MachineId,
    pub machine: String,
    pub location: String,
    pub stock_before: i64,
    pub discarded: i64,
    pub restocked: i64,
    pub stock_after: i64,
}

pub fn stock_levels(
    snapshot: &Snapshot<'_>,
    product: Option<ProductId>,
    machine: Option<MachineId>,
) -> Vec<StockLevelPoint> {
    snapshot
        .observations()
        .into_iter()
        .filter(|o| product.is_none_or(|p| p == o.product_id))
        .filter(|o| machine.is_none_or(|m| m == o.machine_id))
        .map(|o| StockLevelPoint {
            date: o.visit_date,
            product_id: o.product_id,
            product: snapshot.product_name(o.product_id),
            machine_id: o.machine_id,
            machine: snapshot.machine_name(o.machine_id),
            location: snapshot.location_name(o.location_id),
            stock_before: o.counts.stock_before,
            discarded: o.counts.discarded,
            restocked: o.counts.restocked,
            stock_after: o.counts.stock_after(),
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockQuery {
    pub location: Option<LocationId>,
    pub product: Option<ProductId>,
    pub machine: Option<MachineId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineStockRow {
    pub machine_id: MachineId,
    pub machine: String,
    pub location_id: LocationId,
    pub location: String,
    pub product_id: ProductId,
    pub product: String,
    pub slot: u32,
    pub current_stock: Option<i64>,
    pub price: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductStockSummary {
    pub product_id: ProductId,
    pub product: String,
    pub machine_stock: i64,
    pub warehouse_stock: i64,
    pub slot_count: usize,
    pub total_stock: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentStock {
    pub machine_details: Vec<MachineStockRow>,
    pub product_summary: Vec<ProductStockSummary>,
    pub generated_at: DateTime<Utc>,
}

/// Slot stock per machine plus per-product totals (machines + warehouse).
///
/// Without a location or machine filter every catalog product is summarised,
/// including products that only sit in the warehouse.
pub fn current_stock(snapshot: &Snapshot<'_>, query: &StockQuery, now: DateTime<Utc>) -> CurrentStock {
    let mut machine_details: Vec<MachineStockRow> = snapshot
        .slots
        .values()
        .filter(|s| query.product.is_none_or(|p| p == s.product_id))
        .filter(|s| query.machine.is_none_or(|m| m == s.machine_id))
        .filter_map(|s| {
            let machine = snapshot.machines.get(&s.machine_id)?;
            if query.location.is_some_and(|l| l != machine.location_id) {
                return None;
            }
            Some(MachineStockRow {
                machine_id: machine.id,
                machine: machine.short_label(),
                location_id: machine.location_id,
                location: snapshot.location_name(machine.location_id),
                product_id: s.product_id,
                product: snapshot.product_name(s.product_id),
                slot: s.slot,
                current_stock: s.current_stock,
                price: s.price,
            })
        })
        .collect();
    machine_details.sort_by(|a, b| {
        (&a.location, &a.machine, a.slot).cmp(&(&b.location, &b.machine, b.slot))
    });

    let mut per_product: BTreeMap<ProductId, (i64, usize)> = BTreeMap::new();
    for row in &machine_details {
        let e = per_product.entry(row.product_id).or_default();
        e.0 += row.current_stock.unwrap_or(0);
        e.1 += 1;
    }
    if query.location.is_none() && query.machine.is_none() {
        for id in snapshot.products.keys() {
            if query.product.is_none_or(|p| p == *id) {
                per_product.entry(*id).or_default();
            }
        }
    }

    let mut product_summary: Vec<ProductStockSummary> = per_product
        .into_iter()
        .map(|(product_id, (machine_stock, slot_count))| {
            let warehouse_stock = snapshot
                .products
                .get(&product_id)
                .map(|p| p.inventory_quantity)
                .unwrap_or(0);
            ProductStockSummary {
                product_id,
                product: snapshot.product_name(product_id),
                machine_stock,
                warehouse_stock,
                slot_count,
                total_stock: machine_stock + warehouse_stock,
            }
        })
        .collect();
    product_summary.sort_by(|a, b| a.product.cmp(&b.product));

    CurrentStock {
        machine_details,
        product_summary,
        generated_at: now,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestockSummaryQuery {
    pub location: Option<LocationId>,
    pub product: Option<ProductId>,
    pub period: Period,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestockDetail {
    pub visit_id: VisitId,
    pub visit_date: DateTime<Utc>,
    pub location: String,
    pub machine_id: MachineId,
    pub machine: String,
    pub product_id: ProductId,
    pub product: String,
    pub stock_before: i64,
    pub discarded: i64,
    pub restocked: i64,
    pub stock_after: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRestockSummary {
    pub product_id: ProductId,
    pub product: String,
    pub total_restocked: i64,
    pub total_discarded: i64,
    pub visit_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestockSummary {
    pub restock_details: Vec<RestockDetail>,
    pub product_summary: Vec<ProductRestockSummary>,
    pub total_products: usize,
    pub total_restocks: usize,
    pub total_units_restocked: i64,
    pub period: Period,
}

pub fn restock_summary(snapshot: &Snapshot<'_>, query: &RestockSummaryQuery) -> RestockSummary {
    let mut restock_details: Vec<RestockDetail> = snapshot
        .observations()
        .into_iter()
        .filter(|o| query.period.contains(o.visit_date))
        .filter(|o| query.location.is_none_or(|l| l == o.location_id))
        .filter(|o| query.product.is_none_or(|p| p == o.product_id))
        .map(|o| RestockDetail {
            visit_id: o.visit_id,
            visit_date: o.visit_date,
            location: snapshot.location_name(o.location_id),
            machine_id: o.machine_id,
            machine: snapshot.machine_name(o.machine_id),
            product_id: o.product_id,
            product: snapshot.product_name(o.product_id),
            stock_before: o.counts.stock_before,
            discarded: o.counts.discarded,
            restocked: o.counts.restocked,
            stock_after: o.counts.stock_after(),
        })
        .collect();
    restock_details.reverse();

    let mut per_product: BTreeMap<ProductId, (i64, i64, BTreeSet<VisitId>)> = BTreeMap::new();
    for d in &restock_details {
        let e = per_product.entry(d.product_id).or_default();
        e.0 += d.restocked;
        e.1 += d.discarded;
        e.2.insert(d.visit_id);
    }
    let mut product_summary: Vec<ProductRestockSummary> = per_product
        .into_iter()
        .map(|(product_id, (restocked, discarded, visits))| ProductRestockSummary {
            product_id,
            product: snapshot.product_name(product_id),
            total_restocked: restocked,
            total_discarded: discarded,
            visit_count: visits.len(),
        })
        .collect();
    product_summary.sort_by(|a, b| {
        b.total_restocked
            .cmp(&a.total_restocked)
            .then_with(|| a.product.cmp(&b.product))
    });

    RestockSummary {
        total_products: product_summary.len(),
        total_restocks: restock_details.len(),
        total_units_restocked: restock_details.iter().map(|d| d.restocked).sum(),
        restock_details,
        product_summary,
        period: query.period,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    Critical,
    Low,
    Ok,
    NoData,
}

impl CoverageStatus {
    /// Below one week is critical, below two weeks low.
    pub fn classify(has_history: bool, weeks_remaining: Option<f64>) -> Self {
        if !has_history {
            return CoverageStatus::NoData;
        }
        match weeks_remaining {
            Some(w) if w < 1.0 => CoverageStatus::Critical,
            Some(w) if w < 2.0 => CoverageStatus::Low,
            _ => CoverageStatus::Ok,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageQuery {
    pub location: Option<LocationId>,
    pub product: Option<ProductId>,
    pub analysis_period: Period,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineEstimate {
    pub machine_id: MachineId,
    pub machine: String,
    pub location: String,
    pub product_id: ProductId,
    pub product: String,
    pub slot: u32,
    pub current_stock: i64,
    pub daily_consumption: f64,
    pub weekly_consumption: f64,
    pub weeks_remaining: Option<f64>,
    pub days_remaining: Option<f64>,
    pub status: CoverageStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductCoverage {
    pub product_id: ProductId,
    pub product: String,
    pub machine_stock: i64,
    pub warehouse_stock: i64,
    pub total_stock: i64,
    pub weekly_consumption: f64,
    pub weeks_remaining: Option<f64>,
    pub status: CoverageStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryStats {
    pub total: usize,
    pub critical: usize,
    pub low: usize,
    pub ok: usize,
    pub no_data: usize,
}

impl SummaryStats {
    fn count(&mut self, status: CoverageStatus) {
        self.total += 1;
        match status {
            CoverageStatus::Critical => self.critical += 1,
            CoverageStatus::Low => self.low += 1,
            CoverageStatus::Ok => self.ok += 1,
            CoverageStatus::NoData => self.no_data += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockCoverage {
    pub machine_estimates: Vec<MachineEstimate>,
    pub product_summary: Vec<ProductCoverage>,
    pub summary_stats: SummaryStats,
    pub analysis_period: Period,
}

fn weeks_remaining(stock: i64, weekly: f64) -> Option<f64> {
    (weekly > 0.0).then(|| round2(stock as f64 / weekly))
}

/// How long current stock lasts at the consumption rate seen in the window.
///
/// `daily = Σ consumption / Σ days` over intervals ending in the window.
pub fn stock_coverage(snapshot: &Snapshot<'_>, query: &CoverageQuery) -> StockCoverage {
    let mut consumption: BTreeMap<(MachineId, ProductId), (i64, i64)> = BTreeMap::new();
    for r in snapshot
        .demand
        .values()
        .filter(|r| query.analysis_period.contains(r.current_visit_date))
    {
        let e = consumption.entry((r.machine_id, r.product_id)).or_default();
        e.0 += r.total_consumption;
        e.1 += r.days_between_visits;
    }

    let mut machine_estimates = Vec::new();
    for slot in snapshot.slots.values() {
        if query.product.is_some_and(|p| p != slot.product_id) {
            continue;
        }
        let Some(machine) = snapshot.machines.get(&slot.machine_id) else {
            continue;
        };
        if query.location.is_some_and(|l| l != machine.location_id) {
            continue;
        }
        let history = consumption.get(&(slot.machine_id, slot.product_id));
        let daily = match history {
            Some((units, days)) if *days > 0 => *units as f64 / *days as f64,
            _ => 0.0,
        };
        let weekly = daily * 7.0;
        let stock = slot.current_stock.unwrap_or(0);
        let weeks = weeks_remaining(stock, weekly);
        machine_estimates.push(MachineEstimate {
            machine_id: machine.id,
            machine: machine.short_label(),
            location: snapshot.location_name(machine.location_id),
            product_id: slot.product_id,
            product: snapshot.product_name(slot.product_id),
            slot: slot.slot,
            current_stock: stock,
            daily_consumption: round2(daily),
            weekly_consumption: round2(weekly),
            weeks_remaining: weeks,
            days_remaining: (daily > 0.0).then(|| round2(stock as f64 / daily)),
            status: CoverageStatus::classify(history.is_some(), weeks),
        });
    }
    machine_estimates.sort_by(|a, b| {
        a.status
            .cmp(&b.status)
            .then_with(|| (&a.location, &a.machine, a.slot).cmp(&(&b.location, &b.machine, b.slot)))
    });

    let mut per_product: BTreeMap<ProductId, (i64, f64, bool)> = BTreeMap::new();
    for est in &machine_estimates {
        let e = per_product.entry(est.product_id).or_insert((0, 0.0, false));
        e.0 += est.current_stock;
        e.1 += est.weekly_consumption;
        e.2 |= est.status != CoverageStatus::NoData;
    }
    let mut product_summary: Vec<ProductCoverage> = per_product
        .into_iter()
        .map(|(product_id, (machine_stock, weekly, has_history))| {
            let warehouse_stock = snapshot
                .products
                .get(&product_id)
                .map(|p| p.inventory_quantity)
                .unwrap_or(0);
            let total = machine_stock + warehouse_stock;
            let weeks = weeks_remaining(total, weekly);
            ProductCoverage {
                product_id,
                product: snapshot.product_name(product_id),
                machine_stock,
                warehouse_stock,
                total_stock: total,
                weekly_consumption: round2(weekly),
                weeks_remaining: weeks,
                status: CoverageStatus::classify(has_history, weeks),
            }
        })
        .collect();
    product_summary.sort_by(|a, b| a.status.cmp(&b.status).then_with(|| a.product.cmp(&b.product)));

    let mut summary_stats = SummaryStats::default();
    for est in &machine_estimates {
        summary_stats.count(est.status);
    }

    StockCoverage {
        machine_estimates,
        product_summary,
        summary_stats,
        analysis_period: query.analysis_period,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::Fixture;
    use chrono::TimeZone;
    use vendops_visits::EntryCounts;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, day, 9, 0, 0).unwrap()
    }

    #[test]
    fn classify_thresholds() {
        assert_eq!(CoverageStatus::classify(false, None), CoverageStatus::NoData);
        assert_eq!(CoverageStatus::classify(true, Some(0.5)), CoverageStatus::Critical);
        assert_eq!(CoverageStatus::classify(true, Some(1.5)), CoverageStatus::Low);
        assert_eq!(CoverageStatus::classify(true, Some(2.0)), CoverageStatus::Ok);
        assert_eq!(CoverageStatus::classify(true, None), CoverageStatus::Ok);
    }

    #[test]
    fn coverage_from_consumption_rate() {
        let mut fx = Fixture::new();
        let loc = fx.location("HQ");
        let m = fx.machine(loc, "AMS");
        let cola = fx.product("Cola");
        let chips = fx.product("Chips");
        fx.slot(m, cola, 1, "1.50", Some(7));
        fx.slot(m, chips, 2, "1.00", Some(3));
        fx.products.get_mut(&cola).unwrap().inventory_quantity = 21;

        // cola: 14 units in 7 days -> 2/day, 14/week
        fx.visit_entry(loc, m, cola, at(1), EntryCounts::new(0, 0, 20).unwrap());
        fx.visit_entry(loc, m, cola, at(8), EntryCounts::new(6, 0, 1).unwrap());
        fx.rebuild_demand(at(9));

        let report = stock_coverage(
            &fx.snapshot(),
            &CoverageQuery {
                location: None,
                product: None,
                analysis_period: Period::last_days(at(9), 30).unwrap(),
            },
        );

        let cola_est = report
            .machine_estimates
            .iter()
            .find(|e| e.product_id == cola)
            .unwrap();
        assert_eq!(cola_est.daily_consumption, 2.0);
        assert_eq!(cola_est.weekly_consumption, 14.0);
        assert_eq!(cola_est.weeks_remaining, Some(0.5));
        assert_eq!(cola_est.days_remaining, Some(3.5));
        assert_eq!(cola_est.status, CoverageStatus::Critical);

        let chips_est = report
            .machine_estimates
            .iter()
            .find(|e| e.product_id == chips)
            .unwrap();
        assert_eq!(chips_est.status, CoverageStatus::NoData);
        assert_eq!(chips_est.weeks_remaining, None);

        let cola_sum = report
            .product_summary
            .iter()
            .find(|p| p.product_id == cola)
            .unwrap();
        assert_eq!(cola_sum.total_stock, 28);
        assert_eq!(cola_sum.weeks_remaining, Some(2.0));
        assert_eq!(cola_sum.status, CoverageStatus::Ok);

        assert_eq!(report.summary_stats.total, 2);
        assert_eq!(report.summary_stats.critical, 1);
        assert_eq!(report.summary_stats.no_data, 1);
    }

    #[test]
    fn current_stock_sums_machines_and_warehouse() {
        let mut fx = Fixture::new();
        let hq = fx.location("HQ");
        let depot = fx.location("Depot");
        let m1 = fx.machine(hq, "A");
        let m2 = fx.machine(depot, "B");
        let cola = fx.product("Cola");
        let water = fx.product("Water");
        fx.slot(m1, cola, 1, "1.50", Some(4));
        fx.slot(m2, cola, 1, "1.50", None);
        fx.products.get_mut(&cola).unwrap().inventory_quantity = 10;
        fx.products.get_mut(&water).unwrap().inventory_quantity = 5;

        let all = current_stock(&fx.snapshot(), &StockQuery::default(), at(1));
        assert_eq!(all.machine_details.len(), 2);
        let cola_sum = all.product_summary.iter().find(|p| p.product_id == cola).unwrap();
        assert_eq!(cola_sum.machine_stock, 4);
        assert_eq!(cola_sum.slot_count, 2);
        assert_eq!(cola_sum.total_stock, 14);
        assert!(all.product_summary.iter().any(|p| p.product_id == water && p.total_stock == 5));

        let at_hq = current_stock(
            &fx.snapshot(),
            &StockQuery {
                location: Some(hq),
                ..Default::default()
            },
            at(1),
        );
        assert_eq!(at_hq.machine_details.len(), 1);
        assert_eq!(at_hq.product_summary.len(), 1);
    }

    #[test]
    fn restock_summary_counts_visits() {
        let mut fx = Fixture::new();
        let loc = fx.location("HQ");
        let m = fx.machine(loc, "AMS");
        let cola = fx.product("Cola");
        fx.visit_entry(loc, m, cola, at(1), EntryCounts::new(0, 0, 10).unwrap());
        fx.visit_entry(loc, m, cola, at(5), EntryCounts::new(4, 1, 6).unwrap());
        fx.visit_entry(loc, m, cola, at(20), EntryCounts::new(4, 0, 6).unwrap());

        let report = restock_summary(
            &fx.snapshot(),
            &RestockSummaryQuery {
                location: None,
                product: None,
                period: Period::between(at(1), at(6)).unwrap(),
            },
        );
        assert_eq!(report.total_restocks, 2);
        assert_eq!(report.total_units_restocked, 16);
        assert_eq!(report.total_products, 1);
        assert_eq!(report.product_summary[0].visit_count, 2);
        assert_eq!(report.product_summary[0].total_discarded, 1);
        // newest first
        assert_eq!(report.restock_details[0].visit_date, at(5));
    }

    #[test]
    fn stock_levels_in_date_order() {
        let mut fx = Fixture::new();
        let loc = fx.location("HQ");
        let m = fx.machine(loc, "AMS");
        let cola = fx.product("Cola");
        fx.visit_entry(loc, m, cola, at(9), EntryCounts::new(4, 1, 6).unwrap());
        fx.visit_entry(loc, m, cola, at(2), EntryCounts::new(0, 0, 10).unwrap());

        let points = stock_levels(&fx.snapshot(), Some(cola), None);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, at(2));
        assert_eq!(points[1].stock_after, 9);
        assert!(stock_levels(&fx.snapshot(), None, Some(MachineId::new())).is_empty());
    }
}

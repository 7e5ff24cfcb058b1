//! Estimated revenue and profit from demand intervals.
//!
//! Each interval's units sold are valued at the machine's current slot price
//! (revenue) and at the product's unit cost in effect at the interval's end
//! (cost).

use std::collections::BTreeMap;

use serde::Serialize;

use vendops_core::{LocationId, MachineId, Money, ProductId};

use crate::demand::DemandQuery;
use crate::period::Period;
use crate::snapshot::Snapshot;
use crate::{percent_change, round2};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevenueQuery {
    pub product: Option<ProductId>,
    pub machine: Option<MachineId>,
    pub location: Option<LocationId>,
    pub period: Period,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountBreakdown {
    pub id: String,
    pub name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoneySection {
    pub total: f64,
    pub change: Option<f64>,
    pub by_product: Vec<AmountBreakdown>,
    pub by_machine: Vec<AmountBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarginSection {
    /// Profit over revenue, percent.
    pub total: f64,
    /// Difference in percentage points against the preceding period.
    pub change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueProfit {
    pub revenue: MoneySection,
    pub profit: MoneySection,
    pub margin: MarginSection,
    pub period: Period,
}

#[derive(Debug, Default)]
pub(crate) struct Totals {
    pub revenue: Money,
    pub cost: Money,
    pub revenue_by_product: BTreeMap<ProductId, Money>,
    pub profit_by_product: BTreeMap<ProductId, Money>,
    pub revenue_by_machine: BTreeMap<MachineId, Money>,
    pub profit_by_machine: BTreeMap<MachineId, Money>,
}

impl Totals {
    pub fn profit(&self) -> Money {
        self.revenue - self.cost
    }

    pub fn margin(&self) -> f64 {
        if self.revenue.is_zero() {
            return 0.0;
        }
        round2(self.profit().as_f64() / self.revenue.as_f64() * 100.0)
    }
}

pub(crate) fn totals(snapshot: &Snapshot<'_>, query: &DemandQuery, period: Period) -> Totals {
    let mut t = Totals::default();
    for record in query.records_in(snapshot, period) {
        let units = record.total_consumption;
        let revenue = snapshot.price_of(record.machine_id, record.product_id).times(units);
        let cost = snapshot
            .unit_cost_at(record.product_id, record.current_visit_date)
            .times(units);
        let profit = revenue - cost;

        t.revenue += revenue;
        t.cost += cost;
        *t.revenue_by_product.entry(record.product_id).or_default() += revenue;
        *t.profit_by_product.entry(record.product_id).or_default() += profit;
        *t.revenue_by_machine.entry(record.machine_id).or_default() += revenue;
        *t.profit_by_machine.entry(record.machine_id).or_default() += profit;
    }
    t
}

fn breakdown<K: Copy + ToString>(
    amounts: &BTreeMap<K, Money>,
    name: impl Fn(K) -> String,
) -> Vec<AmountBreakdown> {
    let mut rows: Vec<AmountBreakdown> = amounts
        .iter()
        .map(|(k, v)| AmountBreakdown {
            id: k.to_string(),
            name: name(*k),
            amount: v.as_f64(),
        })
        .collect();
    rows.sort_by(|a, b| b.amount.total_cmp(&a.amount).then_with(|| a.name.cmp(&b.name)));
    rows
}

pub fn revenue_profit(snapshot: &Snapshot<'_>, query: &RevenueQuery) -> RevenueProfit {
    let demand_query = DemandQuery {
        product: query.product,
        machine: query.machine,
        location: query.location,
        period: query.period,
    };
    let current = totals(snapshot, &demand_query, query.period);
    let previous = totals(snapshot, &demand_query, query.period.previous());

    let product_name = |p: ProductId| snapshot.product_name(p);
    let machine_name = |m: MachineId| snapshot.machine_name(m);

    RevenueProfit {
        revenue: MoneySection {
            total: current.revenue.as_f64(),
            change: percent_change(current.revenue.as_f64(), previous.revenue.as_f64()),
            by_product: breakdown(&current.revenue_by_product, product_name),
            by_machine: breakdown(&current.revenue_by_machine, machine_name),
        },
        profit: MoneySection {
            total: current.profit().as_f64(),
            change: percent_change(current.profit().as_f64(), previous.profit().as_f64()),
            by_product: breakdown(&current.profit_by_product, product_name),
            by_machine: breakdown(&current.profit_by_machine, machine_name),
        },
        margin: MarginSection {
            total: current.margin(),
            change: (!previous.revenue.is_zero()).then(|| round2(current.margin() - previous.margin())),
        },
        period: query.period,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::Fixture;
    use chrono::{DateTime, TimeZone, Utc};
    use vendops_visits::EntryCounts;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, day, 9, 0, 0).unwrap()
    }

    #[test]
    fn values_units_at_price_and_historical_cost() {
        let mut fx = Fixture::new();
        let loc = fx.location("HQ");
        let m = fx.machine(loc, "AMS");
        let cola = fx.product("Cola");
        fx.slot(m, cola, 1, "1.50", Some(4));
        fx.cost(cola, at(1), "0.40");
        fx.cost(cola, at(20), "0.90");

        fx.visit_entry(loc, m, cola, at(2), EntryCounts::new(0, 0, 10).unwrap());
        fx.visit_entry(loc, m, cola, at(9), EntryCounts::new(4, 0, 6).unwrap());
        fx.rebuild_demand(at(10));

        let query = RevenueQuery {
            product: None,
            machine: None,
            location: None,
            period: Period::last_days(at(10), 7).unwrap(),
        };
        let report = revenue_profit(&fx.snapshot(), &query);

        // 6 units sold: revenue 9.00, cost 6 x 0.40 (the 0.90 cost is later)
        assert_eq!(report.revenue.total, 9.0);
        assert_eq!(report.profit.total, 6.6);
        assert_eq!(report.margin.total, 73.33);
        assert_eq!(report.revenue.change, None);
        assert_eq!(report.margin.change, None);
        assert_eq!(report.revenue.by_product[0].name, "Cola");
        assert_eq!(report.revenue.by_machine[0].name, "Combo AMS");
    }

    #[test]
    fn empty_store_is_all_zero() {
        let fx = Fixture::new();
        let query = RevenueQuery {
            product: None,
            machine: None,
            location: None,
            period: Period::last_days(at(10), 30).unwrap(),
        };
        let report = revenue_profit(&fx.snapshot(), &query);
        assert_eq!(report.revenue.total, 0.0);
        assert_eq!(report.profit.total, 0.0);
        assert_eq!(report.margin.total, 0.0);
        assert!(report.revenue.by_product.is_empty());
    }
}

//! Demand between consecutive visits.
//!
//! For one machine and product, consecutive restock entries (prev, curr)
//! give one interval:
//!
//! - `days = date(curr) - date(prev)` in calendar days; `days <= 0` is skipped;
//! - `previous_stock_after = prev.stock_before - prev.discarded + prev.restocked`;
//! - `consumption = max(0, previous_stock_after - curr.stock_before)`;
//! - `daily_demand = consumption / days`, rounded to cents.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use vendops_core::{DemandRecordId, Entity, LocationId, MachineId, ProductId, VisitId};

use crate::period::Period;
use crate::snapshot::{Observation, Snapshot};
use crate::{percent_change, round2};

/// Derived demand for one (machine, product, current visit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandRecord {
    pub id: DemandRecordId,
    pub machine_id: MachineId,
    pub product_id: ProductId,
    pub previous_visit_id: VisitId,
    pub current_visit_id: VisitId,
    pub previous_visit_date: DateTime<Utc>,
    pub current_visit_date: DateTime<Utc>,
    pub previous_stock_after_restock: i64,
    pub current_stock_before_restock: i64,
    pub days_between_visits: i64,
    pub total_consumption: i64,
    pub daily_demand: f64,
    pub calculated_at: DateTime<Utc>,
}

impl Entity for DemandRecord {
    type Id = DemandRecordId;

    fn id(&self) -> DemandRecordId {
        self.id
    }
}

/// Intervals for one (machine, product) from its chronologically ordered observations.
pub fn derive_pair(observations: &[Observation], now: DateTime<Utc>) -> Vec<DemandRecord> {
    observations
        .windows(2)
        .filter_map(|w| {
            let (prev, curr) = (&w[0], &w[1]);
            let days = (curr.visit_date.date_naive() - prev.visit_date.date_naive()).num_days();
            if days <= 0 {
                return None;
            }
            let previous_after = prev.counts.stock_after();
            let consumption = (previous_after - curr.counts.stock_before).max(0);
            Some(DemandRecord {
                id: DemandRecordId::new(),
                machine_id: curr.machine_id,
                product_id: curr.product_id,
                previous_visit_id: prev.visit_id,
                current_visit_id: curr.visit_id,
                previous_visit_date: prev.visit_date,
                current_visit_date: curr.visit_date,
                previous_stock_after_restock: previous_after,
                current_stock_before_restock: curr.counts.stock_before,
                days_between_visits: days,
                total_consumption: consumption,
                daily_demand: round2(consumption as f64 / days as f64),
                calculated_at: now,
            })
        })
        .collect()
}

/// Demand records for every (machine, product) in the snapshot, or only the
/// given pairs when `only` is set.
pub fn derive_demand(
    snapshot: &Snapshot<'_>,
    only: Option<&[(MachineId, ProductId)]>,
    now: DateTime<Utc>,
) -> Vec<DemandRecord> {
    let mut grouped: BTreeMap<(MachineId, ProductId), Vec<Observation>> = BTreeMap::new();
    for obs in snapshot.observations() {
        let key = (obs.machine_id, obs.product_id);
        if only.is_some_and(|pairs| !pairs.contains(&key)) {
            continue;
        }
        grouped.entry(key).or_default().push(obs);
    }
    grouped
        .values()
        .flat_map(|obs| derive_pair(obs, now))
        .collect()
}

/// Mean daily demand of records whose current visit is within the last `days` days.
pub fn average_demand<'a, I>(records: I, now: DateTime<Utc>, days: i64) -> f64
where
    I: IntoIterator<Item = &'a DemandRecord>,
{
    let cutoff = Duration::try_days(days)
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let (sum, count) = records
        .into_iter()
        .filter(|r| r.current_visit_date >= cutoff)
        .fold((0.0, 0usize), |(s, c), r| (s + r.daily_demand, c + 1));
    if count == 0 {
        return 0.0;
    }
    round2(sum / count as f64)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemandQuery {
    pub product: Option<ProductId>,
    pub machine: Option<MachineId>,
    pub location: Option<LocationId>,
    pub period: Period,
}

impl DemandQuery {
    pub(crate) fn matches(&self, snapshot: &Snapshot<'_>, record: &DemandRecord) -> bool {
        self.product.is_none_or(|p| p == record.product_id)
            && self.machine.is_none_or(|m| m == record.machine_id)
            && self
                .location
                .is_none_or(|l| snapshot.machine_location(record.machine_id) == Some(l))
    }

    pub(crate) fn records_in<'a>(
        &'a self,
        snapshot: &'a Snapshot<'a>,
        period: Period,
    ) -> impl Iterator<Item = &'a DemandRecord> + 'a {
        snapshot
            .demand
            .values()
            .filter(move |r| period.contains(r.current_visit_date) && self.matches(snapshot, r))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitCount {
    pub location: String,
    pub machine_id: MachineId,
    pub machine: String,
    pub product_id: ProductId,
    pub product: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub days_between: i64,
    pub units_sold: i64,
    pub daily_demand: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDemand {
    pub product_id: ProductId,
    pub product: String,
    pub units_sold: i64,
    pub days_observed: i64,
    pub average_daily_demand: f64,
    /// Percent change of units sold against the preceding period.
    pub trend: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandAnalysis {
    pub unit_counts: Vec<UnitCount>,
    pub products: Vec<ProductDemand>,
    pub period: Period,
}

pub fn demand_analysis(snapshot: &Snapshot<'_>, query: &DemandQuery) -> DemandAnalysis {
    let mut records: Vec<&DemandRecord> = query.records_in(snapshot, query.period).collect();
    records.sort_by_key(|r| (r.current_visit_date, r.machine_id, r.product_id));

    let unit_counts = records
        .iter()
        .map(|r| UnitCount {
            location: snapshot
                .machine_location(r.machine_id)
                .map(|l| snapshot.location_name(l))
                .unwrap_or_default(),
            machine_id: r.machine_id,
            machine: snapshot.machine_name(r.machine_id),
            product_id: r.product_id,
            product: snapshot.product_name(r.product_id),
            start_date: r.previous_visit_date,
            end_date: r.current_visit_date,
            days_between: r.days_between_visits,
            units_sold: r.total_consumption,
            daily_demand: r.daily_demand,
        })
        .collect();

    let mut previous_units: BTreeMap<ProductId, i64> = BTreeMap::new();
    for r in query.records_in(snapshot, query.period.previous()) {
        *previous_units.entry(r.product_id).or_default() += r.total_consumption;
    }

    let mut per_product: BTreeMap<ProductId, (i64, i64)> = BTreeMap::new();
    for r in &records {
        let slot = per_product.entry(r.product_id).or_default();
        slot.0 += r.total_consumption;
        slot.1 += r.days_between_visits;
    }

    let mut products: Vec<ProductDemand> = per_product
        .into_iter()
        .map(|(product_id, (units, days))| {
            let previous = previous_units.get(&product_id).copied().unwrap_or(0);
            ProductDemand {
                product_id,
                product: snapshot.product_name(product_id),
                units_sold: units,
                days_observed: days,
                average_daily_demand: if days > 0 {
                    round2(units as f64 / days as f64)
                } else {
                    0.0
                },
                trend: percent_change(units as f64, previous as f64),
            }
        })
        .collect();
    products.sort_by(|a, b| b.units_sold.cmp(&a.units_sold).then_with(|| a.product.cmp(&b.product)));

    DemandAnalysis {
        unit_counts,
        products,
        period: query.period,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::Fixture;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use vendops_visits::EntryCounts;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, day, hour, 0, 0).unwrap()
    }

    fn obs(day: u32, hour: u32, before: i64, discarded: i64, restocked: i64) -> Observation {
        Observation {
            entry_id: Default::default(),
            visit_id: Default::default(),
            visit_date: at(day, hour),
            location_id: Default::default(),
            machine_id: Default::default(),
            product_id: Default::default(),
            counts: EntryCounts::new(before, discarded, restocked).unwrap(),
        }
    }

    #[test]
    fn consumption_between_two_visits() {
        // after first visit: 5 - 1 + 10 = 14; found 8 a week later.
        let records = derive_pair(&[obs(1, 9, 5, 1, 10), obs(8, 9, 8, 0, 6)], at(9, 0));
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.previous_stock_after_restock, 14);
        assert_eq!(r.current_stock_before_restock, 8);
        assert_eq!(r.days_between_visits, 7);
        assert_eq!(r.total_consumption, 6);
        assert_eq!(r.daily_demand, 0.86);
    }

    #[test]
    fn uses_calendar_days() {
        // 23:00 -> 01:00 next day counts as one day.
        let records = derive_pair(&[obs(1, 23, 10, 0, 0), obs(2, 1, 4, 0, 0)], at(3, 0));
        assert_eq!(records[0].days_between_visits, 1);
        assert_eq!(records[0].daily_demand, 6.0);
    }

    #[test]
    fn same_day_pairs_are_skipped() {
        let records = derive_pair(&[obs(1, 8, 10, 0, 0), obs(1, 17, 4, 0, 0)], at(3, 0));
        assert!(records.is_empty());
    }

    #[test]
    fn negative_consumption_clamped() {
        let records = derive_pair(&[obs(1, 9, 2, 0, 3), obs(4, 9, 9, 0, 0)], at(5, 0));
        assert_eq!(records[0].total_consumption, 0);
        assert_eq!(records[0].daily_demand, 0.0);
    }

    #[test]
    fn average_demand_window() {
        let mut recs = derive_pair(
            &[obs(1, 9, 10, 0, 0), obs(3, 9, 6, 0, 10), obs(5, 9, 14, 0, 0)],
            at(6, 0),
        );
        assert_eq!(recs.len(), 2);
        assert_eq!(average_demand(&recs, at(6, 0), 30), 1.5);
        // only the interval ending on the 5th is within 2 days
        assert_eq!(average_demand(&recs, at(6, 0), 2), 1.0);
        recs.clear();
        assert_eq!(average_demand(&recs, at(6, 0), 30), 0.0);
    }

    #[test]
    fn analysis_reports_units_and_trend() {
        let mut fx = Fixture::new();
        let loc = fx.location("HQ");
        let m = fx.machine(loc, "AMS");
        let p = fx.product("Cola");
        fx.slot(m, p, 1, "1.50", Some(10));
        // previous period: days 1 -> 8 consumes 4; current: 8 -> 15 consumes 6
        fx.visit_entry(loc, m, p, at(1, 9), EntryCounts::new(0, 0, 10).unwrap());
        fx.visit_entry(loc, m, p, at(8, 9), EntryCounts::new(6, 0, 4).unwrap());
        fx.visit_entry(loc, m, p, at(15, 9), EntryCounts::new(4, 0, 6).unwrap());
        fx.rebuild_demand(at(16, 0));

        let query = DemandQuery {
            product: None,
            machine: None,
            location: None,
            period: Period::last_days(at(16, 0), 7).unwrap(),
        };
        let analysis = demand_analysis(&fx.snapshot(), &query);
        assert_eq!(analysis.unit_counts.len(), 1);
        assert_eq!(analysis.unit_counts[0].units_sold, 6);
        assert_eq!(analysis.unit_counts[0].location, "HQ");
        assert_eq!(analysis.products[0].units_sold, 6);
        assert_eq!(analysis.products[0].trend, Some(50.0));
    }

    proptest! {
        #[test]
        fn demand_is_never_negative(
            counts in proptest::collection::vec((0i64..50, 0i64..50, 0i64..50), 2..12),
        ) {
            let observations: Vec<Observation> = counts
                .iter()
                .enumerate()
                .map(|(i, (b, d, r))| obs(1 + i as u32 * 2, 9, *b, (*d).min(*b), *r))
                .collect();
            for record in derive_pair(&observations, at(30, 0)) {
                prop_assert!(record.total_consumption >= 0);
                prop_assert!(record.daily_demand >= 0.0);
                prop_assert!(record.days_between_visits > 0);
            }
        }
    }
}

//! Read views over stored demand records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use vendops_core::{MachineId, ProductId};

use crate::demand::DemandRecord;
use crate::round2;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemandFilter {
    pub machine: Option<MachineId>,
    pub product: Option<ProductId>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl DemandFilter {
    fn matches(&self, r: &DemandRecord) -> bool {
        self.machine.is_none_or(|m| m == r.machine_id)
            && self.product.is_none_or(|p| p == r.product_id)
            && self.start_date.is_none_or(|s| r.current_visit_date >= s)
            && self.end_date.is_none_or(|e| r.current_visit_date <= e)
    }
}

/// Matching records, newest current visit first.
pub fn filter_records<'a>(snapshot: &Snapshot<'a>, filter: &DemandFilter) -> Vec<&'a DemandRecord> {
    let mut out: Vec<&'a DemandRecord> = snapshot
        .demand
        .values()
        .filter(|r| filter.matches(r))
        .collect();
    out.sort_by(|a, b| b.current_visit_date.cmp(&a.current_visit_date));
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandSummaryRow {
    pub machine_id: MachineId,
    pub machine_name: String,
    pub product_id: ProductId,
    pub product_name: String,
    pub average_daily_demand: f64,
    pub total_records: usize,
    pub last_calculated: DateTime<Utc>,
}

/// Records grouped by (machine, product), most recently observed first.
pub fn demand_summary(snapshot: &Snapshot<'_>, filter: &DemandFilter) -> Vec<DemandSummaryRow> {
    let mut groups: BTreeMap<(MachineId, ProductId), Vec<&DemandRecord>> = BTreeMap::new();
    for r in filter_records(snapshot, filter) {
        groups.entry((r.machine_id, r.product_id)).or_default().push(r);
    }
    let mut rows: Vec<DemandSummaryRow> = groups
        .into_iter()
        .filter_map(|((machine_id, product_id), records)| {
            let last = records.iter().map(|r| r.current_visit_date).max()?;
            Some(DemandSummaryRow {
                machine_id,
                machine_name: snapshot.machine_label(machine_id),
                product_id,
                product_name: snapshot.product_name(product_id),
                average_daily_demand: mean_demand(&records),
                total_records: records.len(),
                last_calculated: last,
            })
        })
        .collect();
    rows.sort_by(|a, b| b.last_calculated.cmp(&a.last_calculated));
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordPoint {
    pub visit_date: DateTime<Utc>,
    pub daily_demand: f64,
    pub total_consumption: i64,
    pub days_between_visits: i64,
}

impl From<&DemandRecord> for RecordPoint {
    fn from(r: &DemandRecord) -> Self {
        Self {
            visit_date: r.current_visit_date,
            daily_demand: r.daily_demand,
            total_consumption: r.total_consumption,
            days_between_visits: r.days_between_visits,
        }
    }
}

/// Demand of one product within a machine (or one machine for a product).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineDemand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<MachineId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_name: Option<String>,
    pub records: Vec<RecordPoint>,
    pub average_demand: f64,
    pub total_records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineDemandReport {
    pub machine_id: MachineId,
    pub machine_name: String,
    pub product_demands: Vec<MachineDemand>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDemandReport {
    pub product_id: ProductId,
    pub product_name: String,
    pub machine_demands: Vec<MachineDemand>,
}

fn mean_demand(records: &[&DemandRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    round2(records.iter().map(|r| r.daily_demand).sum::<f64>() / records.len() as f64)
}

/// Per-product demand inside one machine. Caller checks the machine exists.
pub fn demand_by_machine(snapshot: &Snapshot<'_>, machine: MachineId) -> MachineDemandReport {
    let filter = DemandFilter {
        machine: Some(machine),
        ..Default::default()
    };
    let mut groups: BTreeMap<ProductId, Vec<&DemandRecord>> = BTreeMap::new();
    for r in filter_records(snapshot, &filter) {
        groups.entry(r.product_id).or_default().push(r);
    }
    let mut product_demands: Vec<MachineDemand> = groups
        .into_iter()
        .map(|(product_id, records)| MachineDemand {
            product_id: Some(product_id),
            product_name: Some(snapshot.product_name(product_id)),
            machine_id: None,
            machine_name: None,
            average_demand: mean_demand(&records),
            total_records: records.len(),
            records: records.into_iter().map(RecordPoint::from).collect(),
        })
        .collect();
    product_demands.sort_by(|a, b| a.product_name.cmp(&b.product_name));
    MachineDemandReport {
        machine_id: machine,
        machine_name: snapshot.machine_label(machine),
        product_demands,
    }
}

/// Per-machine demand of one product. Caller checks the product exists.
pub fn demand_by_product(snapshot: &Snapshot<'_>, product: ProductId) -> ProductDemandReport {
    let filter = DemandFilter {
        product: Some(product),
        ..Default::default()
    };
    let mut groups: BTreeMap<MachineId, Vec<&DemandRecord>> = BTreeMap::new();
    for r in filter_records(snapshot, &filter) {
        groups.entry(r.machine_id).or_default().push(r);
    }
    let mut machine_demands: Vec<MachineDemand> = groups
        .into_iter()
        .map(|(machine_id, records)| MachineDemand {
            product_id: None,
            product_name: None,
            machine_id: Some(machine_id),
            machine_name: Some(snapshot.machine_label(machine_id)),
            average_demand: mean_demand(&records),
            total_records: records.len(),
            records: records.into_iter().map(RecordPoint::from).collect(),
        })
        .collect();
    machine_demands.sort_by(|a, b| a.machine_name.cmp(&b.machine_name));
    ProductDemandReport {
        product_id: product,
        product_name: snapshot.product_name(product),
        machine_demands,
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

    fn seeded() -> (Fixture, MachineId, ProductId, ProductId) {
        let mut fx = Fixture::new();
        let loc = fx.location("HQ");
        let m = fx.machine(loc, "AMS");
        let cola = fx.product("Cola");
        let chips = fx.product("Chips");
        fx.visit_entry(loc, m, cola, at(1), EntryCounts::new(0, 0, 10).unwrap());
        fx.visit_entry(loc, m, cola, at(3), EntryCounts::new(6, 0, 4).unwrap());
        fx.visit_entry(loc, m, cola, at(5), EntryCounts::new(8, 0, 2).unwrap());
        fx.visit_entry(loc, m, chips, at(1), EntryCounts::new(0, 0, 6).unwrap());
        fx.visit_entry(loc, m, chips, at(7), EntryCounts::new(0, 0, 6).unwrap());
        fx.rebuild_demand(at(8));
        (fx, m, cola, chips)
    }

    #[test]
    fn filter_newest_first_with_date_bounds() {
        let (fx, _, cola, _) = seeded();
        let all = filter_records(&fx.snapshot(), &DemandFilter::default());
        assert_eq!(all.len(), 3);
        assert!(all[0].current_visit_date >= all[1].current_visit_date);

        let recent_cola = filter_records(
            &fx.snapshot(),
            &DemandFilter {
                product: Some(cola),
                start_date: Some(at(4)),
                ..Default::default()
            },
        );
        assert_eq!(recent_cola.len(), 1);
        assert_eq!(recent_cola[0].total_consumption, 2);
    }

    #[test]
    fn summary_groups_pairs() {
        let (fx, _, cola, chips) = seeded();
        let rows = demand_summary(&fx.snapshot(), &DemandFilter::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].product_id, chips);
        let cola_row = rows.iter().find(|r| r.product_id == cola).unwrap();
        // 4 / 2 days = 2.0, 2 / 2 days = 1.0
        assert_eq!(cola_row.average_daily_demand, 1.5);
        assert_eq!(cola_row.total_records, 2);
        assert_eq!(cola_row.machine_name, "Machine AMS - Combo at HQ");
    }

    #[test]
    fn by_machine_and_by_product() {
        let (fx, m, cola, _) = seeded();
        let report = demand_by_machine(&fx.snapshot(), m);
        assert_eq!(report.product_demands.len(), 2);
        assert_eq!(report.product_demands[0].product_name.as_deref(), Some("Chips"));

        let report = demand_by_product(&fx.snapshot(), cola);
        assert_eq!(report.machine_demands.len(), 1);
        assert_eq!(report.machine_demands[0].total_records, 2);
        assert_eq!(report.machine_demands[0].average_demand, 1.5);
    }
}

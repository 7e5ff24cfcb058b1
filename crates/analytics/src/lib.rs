//! `vendops-analytics`: deterministic analytics over store snapshots.
//!
//! Everything here is a pure function of a [`Snapshot`]: demand between
//! visits, stock coverage, estimated revenue/profit and the inventory
//! reports. Callers (infra) take the snapshot under a read lock and cache the
//! serialized results.

pub mod costs;
pub mod dashboard;
pub mod demand;
pub mod period;
pub mod revenue;
pub mod snapshot;
pub mod stock;
pub mod tracking;

#[cfg(test)]
mod fixture;

pub use costs::{LatestCost, latest_costs};
pub use dashboard::{Dashboard, DashboardQuery, LowStockItem, dashboard};
pub use demand::{
    DemandAnalysis, DemandQuery, DemandRecord, ProductDemand, UnitCount, average_demand,
    demand_analysis, derive_demand, derive_pair,
};
pub use period::{MAX_PERIOD_DAYS, Period, PeriodParams, parse_date_param};
pub use revenue::{AmountBreakdown, MarginSection, MoneySection, RevenueProfit, RevenueQuery, revenue_profit};
pub use snapshot::{Observation, Snapshot};
pub use stock::{
    CoverageQuery, CoverageStatus, CurrentStock, MachineEstimate, MachineStockRow,
    ProductCoverage, ProductRestockSummary, ProductStockSummary, RestockDetail, RestockSummary,
    RestockSummaryQuery, StockCoverage, StockLevelPoint, StockQuery, SummaryStats, current_stock,
    restock_summary, stock_coverage, stock_levels,
};
pub use tracking::{
    DemandFilter, DemandSummaryRow, MachineDemand, MachineDemandReport, ProductDemandReport,
    RecordPoint, demand_by_machine, demand_by_product, demand_summary, filter_records,
};

/// Round to two decimal places (half away from zero).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percent change from `previous` to `current`; `None` when there is no baseline.
///
/// Measured against `|previous|`, so a rise from a loss stays positive.
pub fn percent_change(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    Some(round2((current - previous) / previous.abs() * 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_change_keeps_direction() {
        assert_eq!(percent_change(150.0, 100.0), Some(50.0));
        assert_eq!(percent_change(50.0, 100.0), Some(-50.0));
        assert_eq!(percent_change(50.0, -100.0), Some(150.0));
        assert_eq!(percent_change(-150.0, -100.0), Some(-50.0));
        assert_eq!(percent_change(10.0, 0.0), None);
    }
}

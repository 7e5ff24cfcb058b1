//! Analytics views (cached), demand tracking and cache administration.

use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use vendops_analytics::{
    CoverageQuery, DashboardQuery, DemandFilter, DemandQuery, DemandRecord, DemandSummaryRow,
    MAX_PERIOD_DAYS, MachineDemandReport, Period, PeriodParams, ProductDemandReport, RestockSummaryQuery,
    RevenueQuery, StockQuery, current_stock, dashboard, demand_analysis, demand_by_machine,
    demand_by_product, demand_summary, filter_records, restock_summary, revenue_profit,
    stock_coverage, stock_levels,
};
use vendops_core::{DomainError, LocationId, MachineId, ProductId};
use vendops_fleet::{Location, Machine};
use vendops_products::Product;

use crate::cache::{CacheStats, KEY_PREFIX, cache_key};
use crate::error::{ServiceError, ServiceResult};

use super::Services;

pub const DASHBOARD_DAYS: i64 = 30;
pub const DEMAND_DAYS: i64 = 30;
pub const RESTOCK_SUMMARY_DAYS: i64 = 7;
pub const COVERAGE_DAYS: i64 = 30;
pub const WARMUP_DAYS: [i64; 3] = [7, 30, 90];

/// Record filters shared by the analytics views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportScope {
    pub location: Option<LocationId>,
    pub product: Option<ProductId>,
    pub machine: Option<MachineId>,
}

impl ReportScope {
    pub fn location(location: Option<LocationId>) -> Self {
        Self {
            location,
            ..Self::default()
        }
    }

    fn key_params(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("location", self.location.map(|v| v.to_string())),
            ("product", self.product.map(|v| v.to_string())),
            ("machine", self.machine.map(|v| v.to_string())),
        ]
    }
}

/// Key parameters of a period: the raw dates when given, else the resolved day count.
fn period_key_params(params: &PeriodParams, default_days: i64) -> Vec<(&'static str, Option<String>)> {
    let explicit = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    let start = explicit(&params.start_date);
    let end = explicit(&params.end_date);
    let days = if start.is_none() && end.is_none() {
        Some(params.days.unwrap_or(default_days))
    } else {
        params.days
    };
    vec![
        ("days", days.map(|d| d.to_string())),
        ("start_date", start),
        ("end_date", end),
    ]
}

fn days_params(days: i64) -> PeriodParams {
    PeriodParams {
        days: Some(days),
        ..PeriodParams::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarmupReport {
    pub total_operations: usize,
    pub successful_operations: usize,
    pub locations: usize,
    pub days: Vec<i64>,
    pub elapsed_ms: u64,
}

fn view_key(
    view: &str,
    mut params: Vec<(&'static str, Option<String>)>,
    extra: Vec<(&'static str, Option<String>)>,
) -> String {
    params.extend(extra);
    cache_key(view, &params)
}

impl Services {
    pub async fn dashboard(&self, location: Option<LocationId>, period: &PeriodParams) -> ServiceResult<Value> {
        let key = view_key(
            "dashboard",
            ReportScope::location(location).key_params(),
            period_key_params(period, DASHBOARD_DAYS),
        );
        let tables = self.store.read().await;
        self.cache.get_or_compute(key, || {
            let now = chrono::Utc::now();
            let query = DashboardQuery {
                location,
                period: Period::from_params(period, DASHBOARD_DAYS, now)?,
                low_stock_threshold: self.config.low_stock_threshold,
                now,
            };
            Ok(dashboard(&tables.snapshot(), &query))
        })
    }

    pub async fn demand_report(&self, scope: ReportScope, period: &PeriodParams) -> ServiceResult<Value> {
        let key = view_key("demand", scope.key_params(), period_key_params(period, DEMAND_DAYS));
        let tables = self.store.read().await;
        self.cache.get_or_compute(key, || {
            let query = DemandQuery {
                product: scope.product,
                machine: scope.machine,
                location: scope.location,
                period: Period::from_params(period, DEMAND_DAYS, chrono::Utc::now())?,
            };
            Ok(demand_analysis(&tables.snapshot(), &query))
        })
    }

    pub async fn revenue_report(&self, scope: ReportScope, period: &PeriodParams) -> ServiceResult<Value> {
        let key = view_key("revenue-profit", scope.key_params(), period_key_params(period, DEMAND_DAYS));
        let tables = self.store.read().await;
        self.cache.get_or_compute(key, || {
            let query = RevenueQuery {
                product: scope.product,
                machine: scope.machine,
                location: scope.location,
                period: Period::from_params(period, DEMAND_DAYS, chrono::Utc::now())?,
            };
            Ok(revenue_profit(&tables.snapshot(), &query))
        })
    }

    pub async fn stock_levels_report(&self, product: Option<ProductId>, machine: Option<MachineId>) -> ServiceResult<Value> {
        let scope = ReportScope {
            location: None,
            product,
            machine,
        };
        let key = view_key("stock-levels", scope.key_params(), Vec::new());
        let tables = self.store.read().await;
        self.cache
            .get_or_compute(key, || Ok(stock_levels(&tables.snapshot(), product, machine)))
    }

    pub async fn current_stock_report(&self, scope: ReportScope) -> ServiceResult<Value> {
        let key = view_key("current-stock", scope.key_params(), Vec::new());
        let tables = self.store.read().await;
        self.cache.get_or_compute(key, || {
            let query = StockQuery {
                location: scope.location,
                product: scope.product,
                machine: scope.machine,
            };
            Ok(current_stock(&tables.snapshot(), &query, chrono::Utc::now()))
        })
    }

    pub async fn restock_summary_report(
        &self,
        location: Option<LocationId>,
        product: Option<ProductId>,
        period: &PeriodParams,
    ) -> ServiceResult<Value> {
        let scope = ReportScope {
            location,
            product,
            machine: None,
        };
        let key = view_key(
            "restock-summary",
            scope.key_params(),
            period_key_params(period, RESTOCK_SUMMARY_DAYS),
        );
        let tables = self.store.read().await;
        self.cache.get_or_compute(key, || {
            let query = RestockSummaryQuery {
                location,
                product,
                period: Period::from_params(period, RESTOCK_SUMMARY_DAYS, chrono::Utc::now())?,
            };
            Ok(restock_summary(&tables.snapshot(), &query))
        })
    }

    pub async fn stock_coverage_report(
        &self,
        location: Option<LocationId>,
        product: Option<ProductId>,
        analysis_days: Option<i64>,
    ) -> ServiceResult<Value> {
        let days = analysis_days.unwrap_or(COVERAGE_DAYS);
        if !(1..=MAX_PERIOD_DAYS).contains(&days) {
            return Err(DomainError::field(
                "analysis_days",
                format!("analysis_days must be between 1 and {MAX_PERIOD_DAYS}"),
            )
            .into());
        }
        let scope = ReportScope {
            location,
            product,
            machine: None,
        };
        let key = view_key(
            "stock-coverage",
            scope.key_params(),
            vec![("analysis_days", Some(days.to_string()))],
        );
        let tables = self.store.read().await;
        self.cache.get_or_compute(key, || {
            let query = CoverageQuery {
                location,
                product,
                analysis_period: Period::last_days(chrono::Utc::now(), days)?,
            };
            Ok(stock_coverage(&tables.snapshot(), &query))
        })
    }

    // ---- demand tracking

    /// Stored demand records, most recent visit first.
    pub async fn demand_records(&self, filter: &DemandFilter) -> Vec<DemandRecord> {
        let tables = self.store.read().await;
        filter_records(&tables.snapshot(), filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn demand_summary(&self, filter: &DemandFilter) -> Vec<DemandSummaryRow> {
        let tables = self.store.read().await;
        demand_summary(&tables.snapshot(), filter)
    }

    pub async fn demand_by_machine(&self, machine: MachineId) -> ServiceResult<MachineDemandReport> {
        let tables = self.store.read().await;
        tables
            .get::<Machine>(machine)
            .ok_or(ServiceError::NotFound("machine"))?;
        Ok(demand_by_machine(&tables.snapshot(), machine))
    }

    pub async fn demand_by_product(&self, product: ProductId) -> ServiceResult<ProductDemandReport> {
        let tables = self.store.read().await;
        tables
            .get::<Product>(product)
            .ok_or(ServiceError::NotFound("product"))?;
        Ok(demand_by_product(&tables.snapshot(), product))
    }

    // ---- cache admin

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop entries containing `pattern`, or every analytics entry.
    pub fn clear_cache(&self, pattern: Option<&str>) -> usize {
        let pattern = pattern.filter(|p| !p.is_empty()).unwrap_or(KEY_PREFIX);
        let cleared = self.cache.clear(pattern);
        tracing::info!(pattern, cleared, "analytics cache cleared");
        cleared
    }

    /// Precompute the common views for `locations` (all when `None`) plus the
    /// unfiltered scope, for each day range.
    pub async fn warmup(&self, locations: Option<Vec<LocationId>>, days: Option<Vec<i64>>) -> WarmupReport {
        let started = Instant::now();
        let days = days
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| WARMUP_DAYS.to_vec());
        let requested = match locations {
            Some(ids) => ids,
            None => self.list_locations().await.into_iter().map(|l: Location| l.id).collect(),
        };
        let mut scopes: Vec<Option<LocationId>> = vec![None];
        for id in requested {
            if !scopes.contains(&Some(id)) {
                scopes.push(Some(id));
            }
        }

        let mut total = 0;
        let mut successful = 0;
        let mut tally = |result: ServiceResult<Value>| {
            total += 1;
            match result {
                Ok(_) => successful += 1,
                Err(err) => tracing::warn!(error = %err, "warmup view failed"),
            }
        };
        for location in &scopes {
            let scope = ReportScope::location(*location);
            tally(self.current_stock_report(scope).await);
            for d in &days {
                let period = days_params(*d);
                tally(self.dashboard(*location, &period).await);
                tally(self.demand_report(scope, &period).await);
                tally(self.revenue_report(scope, &period).await);
                tally(self.restock_summary_report(*location, None, &period).await);
                tally(self.stock_coverage_report(*location, None, Some(*d)).await);
            }
        }

        let report = WarmupReport {
            total_operations: total,
            successful_operations: successful,
            locations: scopes.len(),
            days,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        tracing::info!(
            total = report.total_operations,
            successful = report.successful_operations,
            elapsed_ms = report.elapsed_ms,
            "analytics cache warmed"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use vendops_core::DomainError;
    use vendops_fleet::LocationDraft;
    use vendops_products::{ProductDraft, ProductType};

    fn services() -> Services {
        Services::in_memory(AppConfig::in_memory())
    }

    #[test]
    fn period_keys_resolve_default_days() {
        let implicit = period_key_params(&PeriodParams::default(), 30);
        let explicit = period_key_params(&days_params(30), 30);
        assert_eq!(cache_key("demand", &implicit), cache_key("demand", &explicit));

        let dated = period_key_params(
            &PeriodParams {
                days: None,
                start_date: Some("2025-01-01".into()),
                end_date: Some(" 2025-01-31 ".into()),
            },
            30,
        );
        assert_eq!(
            cache_key("demand", &dated),
            "analytics_demand_end_date=2025-01-31&start_date=2025-01-01"
        );
    }

    #[tokio::test]
    async fn empty_dashboard_is_cached_and_invalidated_by_writes() {
        let svc = services();
        let first = svc.dashboard(None, &PeriodParams::default()).await.unwrap();
        assert_eq!(first["locations"], 0);
        assert_eq!(first["low_stock_count"], 0);
        assert_eq!(svc.cache_stats().total_entries, 1);

        svc.dashboard(None, &days_params(30)).await.unwrap();
        assert_eq!(svc.cache_stats().hits, 1);

        svc.create_product(ProductDraft::new("Cola", ProductType::Soda))
            .await
            .unwrap();
        assert_eq!(svc.cache_stats().total_entries, 0);
        let fresh = svc.dashboard(None, &PeriodParams::default()).await.unwrap();
        assert_eq!(fresh["products"], 1);
    }

    #[tokio::test]
    async fn malformed_dates_are_field_errors_and_not_cached() {
        let svc = services();
        let err = svc
            .demand_report(
                ReportScope::default(),
                &PeriodParams {
                    days: None,
                    start_date: Some("01/02/2025".into()),
                    end_date: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::Field { field: "start_date", .. })
        ));
        assert_eq!(svc.cache_stats().total_entries, 0);
    }

    #[tokio::test]
    async fn out_of_range_day_counts_are_field_errors() {
        let svc = services();
        let huge = days_params(1_000_000_000_000);
        let err = svc.dashboard(None, &huge).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Field { field: "days", .. })));
        let err = svc
            .revenue_report(ReportScope::default(), &huge)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Field { field: "days", .. })));
        let err = svc
            .restock_summary_report(None, None, &days_params(i64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Field { field: "days", .. })));
        let err = svc
            .stock_coverage_report(None, None, Some(1_000_000_000_000))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::Field { field: "analysis_days", .. })
        ));
        assert_eq!(svc.cache_stats().total_entries, 0);
    }

    #[tokio::test]
    async fn demand_tracking_requires_existing_targets() {
        let svc = services();
        assert!(matches!(
            svc.demand_by_machine(MachineId::new()).await,
            Err(ServiceError::NotFound("machine"))
        ));
        let cola = svc
            .create_product(ProductDraft::new("Cola", ProductType::Soda))
            .await
            .unwrap();
        let report = svc.demand_by_product(cola.id).await.unwrap();
        assert_eq!(report.product_id, cola.id);
        assert!(svc.demand_records(&DemandFilter::default()).await.is_empty());
    }

    #[tokio::test]
    async fn warmup_covers_every_location_and_range() {
        let svc = services();
        let hq = svc
            .create_location(LocationDraft::new("HQ", ""))
            .await
            .unwrap();
        let report = svc.warmup(None, Some(vec![7, 30])).await;
        assert_eq!(report.locations, 2);
        // per location: current stock once, five views per day range
        assert_eq!(report.total_operations, 2 * (1 + 5 * 2));
        assert_eq!(report.successful_operations, report.total_operations);
        assert!(svc.cache_stats().total_entries > 0);

        let again = svc.warmup(Some(vec![hq.id, hq.id]), None).await;
        assert_eq!(again.locations, 2);
        assert_eq!(again.days, WARMUP_DAYS.to_vec());

        assert!(svc.clear_cache(Some("dashboard")) > 0);
        assert_eq!(svc.cache_stats().entries_by_view.get("dashboard"), None);
        svc.clear_cache(None);
        assert_eq!(svc.cache_stats().total_entries, 0);
    }
}

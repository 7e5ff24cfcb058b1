use std::sync::Arc;

use axum::{Router, extract::Extension, routing::get};

use vendops_infra::Services;

use crate::app::dto::{self, AnalyticsQuery, CoverageParams, QueryParams};
use crate::app::errors::ApiResult;

pub fn router() -> Router {
    Router::new()
        .route("/current-stock", get(current_stock))
        .route("/restock-summary", get(restock_summary))
        .route("/stock-coverage", get(stock_coverage))
}

pub async fn current_stock(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<AnalyticsQuery>,
) -> ApiResult {
    Ok(dto::ok(services.current_stock_report(q.scope()).await?))
}

pub async fn restock_summary(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<AnalyticsQuery>,
) -> ApiResult {
    let report = services
        .restock_summary_report(q.location, q.product, &q.period())
        .await?;
    Ok(dto::ok(report))
}

pub async fn stock_coverage(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<CoverageParams>,
) -> ApiResult {
    let report = services
        .stock_coverage_report(q.location, q.product, q.analysis_days)
        .await?;
    Ok(dto::ok(report))
}

use std::sync::Arc;

use axum::{Router, extract::Extension, routing::get};

use vendops_infra::Services;

use crate::app::dto::{self, AnalyticsQuery, QueryParams, StockLevelsQuery};
use crate::app::errors::ApiResult;

pub fn router() -> Router {
    Router::new()
        .route("/stock-levels", get(stock_levels))
        .route("/demand", get(demand))
        .route("/revenue-profit", get(revenue_profit))
}

pub async fn stock_levels(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<StockLevelsQuery>,
) -> ApiResult {
    Ok(dto::ok(services.stock_levels_report(q.product, q.machine).await?))
}

pub async fn demand(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<AnalyticsQuery>,
) -> ApiResult {
    Ok(dto::ok(services.demand_report(q.scope(), &q.period()).await?))
}

pub async fn revenue_profit(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<AnalyticsQuery>,
) -> ApiResult {
    Ok(dto::ok(services.revenue_report(q.scope(), &q.period()).await?))
}

/// Mounted at `/dashboard`; only `location` narrows the scope.
pub async fn dashboard(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<AnalyticsQuery>,
) -> ApiResult {
    Ok(dto::ok(services.dashboard(q.location, &q.period()).await?))
}

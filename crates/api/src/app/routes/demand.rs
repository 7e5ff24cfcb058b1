//! Read-only access to the stored demand records.

use std::sync::Arc;

use axum::{Router, extract::Extension, routing::get};

use vendops_infra::Services;

use crate::app::dto::{self, DemandTrackingQuery, QueryParams};
use crate::app::errors::{ApiError, ApiResult};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_records))
        .route("/summary", get(summary))
        .route("/by-machine", get(by_machine))
        .route("/by-product", get(by_product))
}

pub async fn list_records(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<DemandTrackingQuery>,
) -> ApiResult {
    let filter = q.filter()?;
    Ok(dto::items(services.demand_records(&filter).await))
}

pub async fn summary(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<DemandTrackingQuery>,
) -> ApiResult {
    let filter = q.filter()?;
    Ok(dto::items(services.demand_summary(&filter).await))
}

pub async fn by_machine(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<DemandTrackingQuery>,
) -> ApiResult {
    let machine = q.machine_id.ok_or_else(|| {
        ApiError::bad_request("validation_error", "machine_id parameter is required")
    })?;
    Ok(dto::ok(services.demand_by_machine(machine).await?))
}

pub async fn by_product(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<DemandTrackingQuery>,
) -> ApiResult {
    let product = q.product_id.ok_or_else(|| {
        ApiError::bad_request("validation_error", "product_id parameter is required")
    })?;
    Ok(dto::ok(services.demand_by_product(product).await?))
}

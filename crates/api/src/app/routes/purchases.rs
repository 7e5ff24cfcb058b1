use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    routing::get,
};

use vendops_core::PurchaseId;
use vendops_infra::Services;
use vendops_purchasing::{PurchaseDraft, PurchasePatch};

use crate::app::dto::{self, JsonBody, PurchaseQuery, QueryParams};
use crate::app::errors::ApiResult;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_purchases).post(create_purchase))
        .route(
            "/:id",
            get(get_purchase)
                .put(update_purchase)
                .patch(update_purchase)
                .delete(delete_purchase),
        )
}

pub async fn list_purchases(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<PurchaseQuery>,
) -> ApiResult {
    Ok(dto::items(services.list_purchases(&q.into()).await))
}

/// Adds the quantity to warehouse stock and records the unit cost.
pub async fn create_purchase(
    Extension(services): Extension<Arc<Services>>,
    JsonBody(body): JsonBody<PurchaseDraft>,
) -> ApiResult {
    Ok(dto::created(services.create_purchase(body).await?))
}

pub async fn get_purchase(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: PurchaseId = dto::parse_id(&id)?;
    Ok(dto::ok(services.get_purchase(id).await?))
}

pub async fn update_purchase(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<PurchasePatch>,
) -> ApiResult {
    let id: PurchaseId = dto::parse_id(&id)?;
    Ok(dto::ok(services.update_purchase(id, body).await?))
}

pub async fn delete_purchase(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: PurchaseId = dto::parse_id(&id)?;
    services.delete_purchase(id).await?;
    Ok(dto::no_content())
}

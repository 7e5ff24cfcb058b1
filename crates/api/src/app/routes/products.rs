use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    routing::get,
};

use vendops_core::{ProductCostId, ProductId};
use vendops_infra::Services;
use vendops_products::{ProductCostDraft, ProductDraft, ProductPatch};

use crate::app::dto::{self, CostQuery, JsonBody, ProductQuery, QueryParams};
use crate::app::errors::ApiResult;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product)
                .put(update_product)
                .patch(update_product)
                .delete(delete_product),
        )
}

/// `/product-costs`: the cost ledger.
pub fn costs_router() -> Router {
    Router::new()
        .route("/", get(list_costs).post(create_cost))
        .route("/latest", get(latest_costs))
        .route("/:id", get(get_cost).delete(delete_cost))
}

pub async fn list_products(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<ProductQuery>,
) -> ApiResult {
    Ok(dto::items(services.list_products(&q.into()).await))
}

pub async fn create_product(
    Extension(services): Extension<Arc<Services>>,
    JsonBody(body): JsonBody<ProductDraft>,
) -> ApiResult {
    Ok(dto::created(services.create_product(body).await?))
}

pub async fn get_product(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: ProductId = dto::parse_id(&id)?;
    Ok(dto::ok(services.get_product(id).await?))
}

pub async fn update_product(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<ProductPatch>,
) -> ApiResult {
    let id: ProductId = dto::parse_id(&id)?;
    Ok(dto::ok(services.update_product(id, body).await?))
}

pub async fn delete_product(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: ProductId = dto::parse_id(&id)?;
    services.delete_product(id).await?;
    Ok(dto::no_content())
}

pub async fn list_costs(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<CostQuery>,
) -> ApiResult {
    Ok(dto::items(services.list_costs(&q.into()).await))
}

pub async fn create_cost(
    Extension(services): Extension<Arc<Services>>,
    JsonBody(body): JsonBody<ProductCostDraft>,
) -> ApiResult {
    Ok(dto::created(services.create_cost(body).await?))
}

pub async fn latest_costs(Extension(services): Extension<Arc<Services>>) -> ApiResult {
    Ok(dto::items(services.latest_costs().await))
}

pub async fn get_cost(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: ProductCostId = dto::parse_id(&id)?;
    Ok(dto::ok(services.get_cost(id).await?))
}

pub async fn delete_cost(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: ProductCostId = dto::parse_id(&id)?;
    services.delete_cost(id).await?;
    Ok(dto::no_content())
}

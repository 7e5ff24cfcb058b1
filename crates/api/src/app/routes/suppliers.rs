use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    routing::{get, post},
};

use vendops_core::SupplierId;
use vendops_infra::Services;
use vendops_purchasing::{SupplierDraft, SupplierPatch};

use crate::app::dto::{self, JsonBody, QueryParams, SupplierQuery};
use crate::app::errors::ApiResult;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route("/active", get(active_suppliers))
        .route(
            "/:id",
            get(get_supplier)
                .put(update_supplier)
                .patch(update_supplier)
                .delete(delete_supplier),
        )
        .route("/:id/toggle-active", post(toggle_active))
}

pub async fn list_suppliers(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<SupplierQuery>,
) -> ApiResult {
    Ok(dto::items(services.list_suppliers(&q.into()).await))
}

/// Active suppliers only, for pickers.
pub async fn active_suppliers(Extension(services): Extension<Arc<Services>>) -> ApiResult {
    Ok(dto::items(services.active_suppliers().await))
}

pub async fn create_supplier(
    Extension(services): Extension<Arc<Services>>,
    JsonBody(body): JsonBody<SupplierDraft>,
) -> ApiResult {
    Ok(dto::created(services.create_supplier(body).await?))
}

pub async fn get_supplier(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: SupplierId = dto::parse_id(&id)?;
    Ok(dto::ok(services.get_supplier(id).await?))
}

pub async fn update_supplier(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<SupplierPatch>,
) -> ApiResult {
    let id: SupplierId = dto::parse_id(&id)?;
    Ok(dto::ok(services.update_supplier(id, body).await?))
}

pub async fn delete_supplier(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: SupplierId = dto::parse_id(&id)?;
    services.delete_supplier(id).await?;
    Ok(dto::no_content())
}

pub async fn toggle_active(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: SupplierId = dto::parse_id(&id)?;
    Ok(dto::ok(services.toggle_supplier_active(id).await?))
}

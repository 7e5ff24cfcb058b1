use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    routing::get,
};

use vendops_core::{MachineId, SlotId};
use vendops_fleet::{MachineDraft, MachinePatch, SlotDraft, SlotPatch};
use vendops_infra::Services;

use crate::app::dto::{self, JsonBody, MachineQuery, QueryParams, SlotQuery};
use crate::app::errors::ApiResult;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_machines).post(create_machine))
        .route(
            "/:id",
            get(get_machine)
                .put(update_machine)
                .patch(update_machine)
                .delete(delete_machine),
        )
}

/// `/machine-items`: product slots inside machines.
pub fn items_router() -> Router {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route(
            "/:id",
            get(get_item).put(update_item).patch(update_item).delete(delete_item),
        )
}

pub async fn list_machines(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<MachineQuery>,
) -> ApiResult {
    Ok(dto::items(services.list_machines(&q.into()).await))
}

pub async fn create_machine(
    Extension(services): Extension<Arc<Services>>,
    JsonBody(body): JsonBody<MachineDraft>,
) -> ApiResult {
    Ok(dto::created(services.create_machine(body).await?))
}

pub async fn get_machine(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: MachineId = dto::parse_id(&id)?;
    Ok(dto::ok(services.get_machine(id).await?))
}

pub async fn update_machine(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<MachinePatch>,
) -> ApiResult {
    let id: MachineId = dto::parse_id(&id)?;
    Ok(dto::ok(services.update_machine(id, body).await?))
}

pub async fn delete_machine(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: MachineId = dto::parse_id(&id)?;
    services.delete_machine(id).await?;
    Ok(dto::no_content())
}

pub async fn list_items(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<SlotQuery>,
) -> ApiResult {
    Ok(dto::items(services.list_slots(&q.into()).await))
}

pub async fn create_item(
    Extension(services): Extension<Arc<Services>>,
    JsonBody(body): JsonBody<SlotDraft>,
) -> ApiResult {
    Ok(dto::created(services.create_slot(body).await?))
}

pub async fn get_item(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: SlotId = dto::parse_id(&id)?;
    Ok(dto::ok(services.get_slot(id).await?))
}

pub async fn update_item(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<SlotPatch>,
) -> ApiResult {
    let id: SlotId = dto::parse_id(&id)?;
    Ok(dto::ok(services.update_slot(id, body).await?))
}

pub async fn delete_item(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: SlotId = dto::parse_id(&id)?;
    services.delete_slot(id).await?;
    Ok(dto::no_content())
}

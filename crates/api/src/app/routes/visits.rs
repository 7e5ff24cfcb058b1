use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    routing::{get, post, put},
};

use vendops_core::{MachineRestockId, RestockEntryId, VisitId};
use vendops_infra::Services;
use vendops_visits::{
    BulkVisitPayload, MachineRestockDraft, MachineRestockPatch, RestockEntryDraft,
    RestockEntryPatch, VisitDraft, VisitPatch,
};

use crate::app::dto::{self, EntryQuery, JsonBody, QueryParams, RestockQuery, VisitQuery};
use crate::app::errors::ApiResult;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_visits).post(create_visit))
        .route("/bulk", post(bulk_save))
        .route(
            "/:id",
            get(get_visit)
                .put(update_visit)
                .patch(update_visit)
                .delete(delete_visit),
        )
        .route("/:id/bulk", put(bulk_update))
}

pub fn restocks_router() -> Router {
    Router::new()
        .route("/", get(list_restocks).post(create_restock))
        .route(
            "/:id",
            get(get_restock)
                .put(update_restock)
                .patch(update_restock)
                .delete(delete_restock),
        )
}

pub fn entries_router() -> Router {
    Router::new()
        .route("/", get(list_entries).post(create_entry))
        .route(
            "/:id",
            get(get_entry).put(update_entry).patch(update_entry).delete(delete_entry),
        )
}

// ---- visits

pub async fn list_visits(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<VisitQuery>,
) -> ApiResult {
    Ok(dto::items(services.list_visits(&q.into()).await))
}

pub async fn create_visit(
    Extension(services): Extension<Arc<Services>>,
    JsonBody(body): JsonBody<VisitDraft>,
) -> ApiResult {
    Ok(dto::created(services.create_visit(body).await?))
}

/// The visit with its restocks and entries.
pub async fn get_visit(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: VisitId = dto::parse_id(&id)?;
    Ok(dto::ok(services.get_visit(id).await?))
}

pub async fn update_visit(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<VisitPatch>,
) -> ApiResult {
    let id: VisitId = dto::parse_id(&id)?;
    Ok(dto::ok(services.update_visit(id, body).await?))
}

pub async fn delete_visit(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: VisitId = dto::parse_id(&id)?;
    services.delete_visit(id).await?;
    Ok(dto::no_content())
}

pub async fn bulk_save(
    Extension(services): Extension<Arc<Services>>,
    JsonBody(body): JsonBody<BulkVisitPayload>,
) -> ApiResult {
    Ok(dto::created(services.bulk_save(body).await?))
}

pub async fn bulk_update(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<BulkVisitPayload>,
) -> ApiResult {
    let id: VisitId = dto::parse_id(&id)?;
    Ok(dto::ok(services.bulk_update(id, body).await?))
}

// ---- machine restocks

pub async fn list_restocks(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<RestockQuery>,
) -> ApiResult {
    Ok(dto::items(services.list_restocks(&q.into()).await))
}

pub async fn create_restock(
    Extension(services): Extension<Arc<Services>>,
    JsonBody(body): JsonBody<MachineRestockDraft>,
) -> ApiResult {
    Ok(dto::created(services.create_restock(body).await?))
}

pub async fn get_restock(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: MachineRestockId = dto::parse_id(&id)?;
    Ok(dto::ok(services.get_restock(id).await?))
}

pub async fn update_restock(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<MachineRestockPatch>,
) -> ApiResult {
    let id: MachineRestockId = dto::parse_id(&id)?;
    Ok(dto::ok(services.update_restock(id, body).await?))
}

pub async fn delete_restock(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: MachineRestockId = dto::parse_id(&id)?;
    services.delete_restock(id).await?;
    Ok(dto::no_content())
}

// ---- restock entries

pub async fn list_entries(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<EntryQuery>,
) -> ApiResult {
    Ok(dto::items(services.list_entries(&q.into()).await))
}

pub async fn create_entry(
    Extension(services): Extension<Arc<Services>>,
    JsonBody(body): JsonBody<RestockEntryDraft>,
) -> ApiResult {
    Ok(dto::created(services.create_entry(body).await?))
}

pub async fn get_entry(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: RestockEntryId = dto::parse_id(&id)?;
    Ok(dto::ok(services.get_entry(id).await?))
}

pub async fn update_entry(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<RestockEntryPatch>,
) -> ApiResult {
    let id: RestockEntryId = dto::parse_id(&id)?;
    Ok(dto::ok(services.update_entry(id, body).await?))
}

pub async fn delete_entry(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: RestockEntryId = dto::parse_id(&id)?;
    services.delete_entry(id).await?;
    Ok(dto::no_content())
}

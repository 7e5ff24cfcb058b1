use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    routing::get,
};

use vendops_core::LocationId;
use vendops_fleet::{LocationDraft, LocationPatch};
use vendops_infra::Services;

use crate::app::dto::{self, JsonBody};
use crate::app::errors::ApiResult;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_locations).post(create_location))
        .route(
            "/:id",
            get(get_location)
                .put(update_location)
                .patch(update_location)
                .delete(delete_location),
        )
}

pub async fn list_locations(Extension(services): Extension<Arc<Services>>) -> ApiResult {
    Ok(dto::items(services.list_locations().await))
}

pub async fn create_location(
    Extension(services): Extension<Arc<Services>>,
    JsonBody(body): JsonBody<LocationDraft>,
) -> ApiResult {
    Ok(dto::created(services.create_location(body).await?))
}

pub async fn get_location(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: LocationId = dto::parse_id(&id)?;
    Ok(dto::ok(services.get_location(id).await?))
}

pub async fn update_location(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<LocationPatch>,
) -> ApiResult {
    let id: LocationId = dto::parse_id(&id)?;
    Ok(dto::ok(services.update_location(id, body).await?))
}

/// Also removes the location's machines and visits.
pub async fn delete_location(
    Extension(services): Extension<Arc<Services>>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: LocationId = dto::parse_id(&id)?;
    services.delete_location(id).await?;
    Ok(dto::no_content())
}

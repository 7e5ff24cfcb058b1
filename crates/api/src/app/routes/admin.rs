//! Analytics cache administration.

use std::sync::Arc;

use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use serde_json::json;

use vendops_infra::Services;

use crate::app::dto::{self, ClearCacheQuery, JsonBody, QueryParams, WarmupRequest};
use crate::app::errors::ApiResult;

pub fn router() -> Router {
    Router::new()
        .route("/cache/stats", get(cache_stats))
        .route("/cache/clear", post(clear_cache))
        .route("/cache/warmup", post(warmup))
}

pub async fn cache_stats(Extension(services): Extension<Arc<Services>>) -> ApiResult {
    Ok(dto::ok(services.cache_stats()))
}

pub async fn clear_cache(
    Extension(services): Extension<Arc<Services>>,
    QueryParams(q): QueryParams<ClearCacheQuery>,
) -> ApiResult {
    let cleared = services.clear_cache(q.pattern.as_deref());
    Ok(dto::ok(json!({
        "cleared": cleared,
        "pattern": q.pattern,
    })))
}

/// The body is optional; without one every location and the default day
/// ranges are warmed.
pub async fn warmup(
    Extension(services): Extension<Arc<Services>>,
    body: Option<JsonBody<WarmupRequest>>,
) -> ApiResult {
    let request = body.map(|JsonBody(r)| r).unwrap_or_default();
    let report = services.warmup(request.locations, request.days).await;
    Ok(dto::ok(report))
}

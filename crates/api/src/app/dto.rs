use std::str::FromStr;

use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use vendops_analytics::{DemandFilter, PeriodParams, parse_date_param};
use vendops_core::{
    DomainError, LocationId, MachineId, MachineRestockId, ProductId, SupplierId, UserId, VisitId,
};
use vendops_infra::services::catalog::{CostFilter, MachineFilter, ProductFilter, SlotFilter};
use vendops_infra::services::purchasing::{PurchaseFilter, SupplierFilter};
use vendops_infra::services::reports::ReportScope;
use vendops_infra::services::visits::{EntryFilter, RestockFilter, VisitFilter};
use vendops_products::ProductType;

use crate::app::errors::ApiError;

// -------------------------
// Extractors
// -------------------------

/// JSON body whose rejections use the API error shape.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(|rej| ApiError::bad_request("invalid_body", rej.body_text()))
    }
}

/// Query string whose rejections use the API error shape.
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| Self(value))
            .map_err(|rej| ApiError::bad_request("invalid_query", rej.body_text()))
    }
}

/// Parse a path id; malformed ids are a 400.
pub fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse().map_err(ApiError::from)
}

// -------------------------
// Responses
// -------------------------

#[derive(Debug, Serialize)]
struct Items<T> {
    items: Vec<T>,
}

pub fn ok<T: Serialize>(value: T) -> Response {
    (StatusCode::OK, Json(value)).into_response()
}

pub fn created<T: Serialize>(value: T) -> Response {
    (StatusCode::CREATED, Json(value)).into_response()
}

pub fn items<T: Serialize>(items: Vec<T>) -> Response {
    ok(Items { items })
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

// -------------------------
// Collection filters
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct MachineQuery {
    pub location: Option<LocationId>,
    pub search: Option<String>,
}

impl From<MachineQuery> for MachineFilter {
    fn from(q: MachineQuery) -> Self {
        Self {
            location: q.location,
            search: q.search,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub product_type: Option<ProductType>,
}

impl From<ProductQuery> for ProductFilter {
    fn from(q: ProductQuery) -> Self {
        Self {
            search: q.search,
            product_type: q.product_type,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SlotQuery {
    pub machine: Option<MachineId>,
    pub product: Option<ProductId>,
    pub slot: Option<u32>,
}

impl From<SlotQuery> for SlotFilter {
    fn from(q: SlotQuery) -> Self {
        Self {
            machine: q.machine,
            product: q.product,
            slot: q.slot,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CostQuery {
    pub product: Option<ProductId>,
}

impl From<CostQuery> for CostFilter {
    fn from(q: CostQuery) -> Self {
        Self { product: q.product }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SupplierQuery {
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

impl From<SupplierQuery> for SupplierFilter {
    fn from(q: SupplierQuery) -> Self {
        Self {
            is_active: q.is_active,
            search: q.search,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PurchaseQuery {
    pub product: Option<ProductId>,
    pub supplier: Option<SupplierId>,
}

impl From<PurchaseQuery> for PurchaseFilter {
    fn from(q: PurchaseQuery) -> Self {
        Self {
            product: q.product,
            supplier: q.supplier,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct VisitQuery {
    pub location: Option<LocationId>,
    pub user: Option<UserId>,
}

impl From<VisitQuery> for VisitFilter {
    fn from(q: VisitQuery) -> Self {
        Self {
            location: q.location,
            user: q.user,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RestockQuery {
    pub visit: Option<VisitId>,
    pub machine: Option<MachineId>,
}

impl From<RestockQuery> for RestockFilter {
    fn from(q: RestockQuery) -> Self {
        Self {
            visit: q.visit,
            machine: q.machine,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EntryQuery {
    pub machine_restock: Option<MachineRestockId>,
    pub product: Option<ProductId>,
}

impl From<EntryQuery> for EntryFilter {
    fn from(q: EntryQuery) -> Self {
        Self {
            machine_restock: q.machine_restock,
            product: q.product,
        }
    }
}

// -------------------------
// Demand tracking
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct DemandTrackingQuery {
    pub machine_id: Option<MachineId>,
    pub product_id: Option<ProductId>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DemandTrackingQuery {
    pub fn filter(&self) -> Result<DemandFilter, DomainError> {
        let date = |field: &'static str, raw: &Option<String>, end_of_day: bool| {
            raw.as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_date_param(field, s, end_of_day))
                .transpose()
        };
        Ok(DemandFilter {
            machine: self.machine_id,
            product: self.product_id,
            start_date: date("start_date", &self.start_date, false)?,
            end_date: date("end_date", &self.end_date, true)?,
        })
    }
}

// -------------------------
// Analytics
// -------------------------

/// `/analytics/demand` and `/analytics/revenue-profit`.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub location: Option<LocationId>,
    pub product: Option<ProductId>,
    pub machine: Option<MachineId>,
    pub days: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl AnalyticsQuery {
    pub fn scope(&self) -> ReportScope {
        ReportScope {
            location: self.location,
            product: self.product,
            machine: self.machine,
        }
    }

    pub fn period(&self) -> PeriodParams {
        PeriodParams {
            days: self.days,
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StockLevelsQuery {
    pub product: Option<ProductId>,
    pub machine: Option<MachineId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CoverageParams {
    pub location: Option<LocationId>,
    pub product: Option<ProductId>,
    pub analysis_days: Option<i64>,
}

// -------------------------
// Cache admin
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ClearCacheQuery {
    pub pattern: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WarmupRequest {
    pub locations: Option<Vec<LocationId>>,
    pub days: Option<Vec<i64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analytics_query_splits_scope_and_period() {
        let q: AnalyticsQuery =
            serde_json::from_value(serde_json::json!({ "days": 7, "start_date": "2025-01-01" })).unwrap();
        assert_eq!(q.scope(), ReportScope::default());
        let period = q.period();
        assert_eq!(period.days, Some(7));
        assert_eq!(period.start_date.as_deref(), Some("2025-01-01"));
    }

    #[test]
    fn demand_tracking_dates_are_validated() {
        let q = DemandTrackingQuery {
            end_date: Some("2025-01-31".into()),
            ..Default::default()
        };
        let filter = q.filter().unwrap();
        assert_eq!(filter.end_date.unwrap().to_rfc3339(), "2025-01-31T23:59:59+00:00");

        let bad = DemandTrackingQuery {
            start_date: Some("yesterday".into()),
            ..Default::default()
        };
        assert!(matches!(bad.filter(), Err(DomainError::Field { field: "start_date", .. })));
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert!(parse_id::<LocationId>("not-a-uuid").is_err());
        let id = LocationId::new();
        assert_eq!(parse_id::<LocationId>(&id.to_string()).unwrap(), id);
    }
}

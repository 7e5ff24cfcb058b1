use axum::Router;

pub mod admin;
pub mod analytics;
pub mod demand;
pub mod inventory;
pub mod locations;
pub mod machines;
pub mod products;
pub mod purchases;
pub mod suppliers;
pub mod system;
pub mod visits;

/// Router for every resource endpoint.
pub fn router() -> Router {
    Router::new()
        .nest("/locations", locations::router())
        .nest("/machines", machines::router())
        .nest("/machine-items", machines::items_router())
        .nest("/products", products::router())
        .nest("/product-costs", products::costs_router())
        .nest("/suppliers", suppliers::router())
        .nest("/purchases", purchases::router())
        .nest("/visits", visits::router())
        .nest("/restocks", visits::restocks_router())
        .nest("/restock-entries", visits::entries_router())
        .nest("/demand-tracking", demand::router())
        .nest("/analytics", analytics::router())
        .route("/dashboard", axum::routing::get(analytics::dashboard))
        .nest("/inventory", inventory::router())
        .nest("/admin", admin::router())
}

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::StatusCode;
use serde_json::{Value, json};

use vendops_infra::{AppConfig, Services};

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over an in-memory store, bound to an ephemeral port.
        let services = Arc::new(Services::in_memory(AppConfig::in_memory()));
        let app = vendops_api::app::build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.put(self.url(path)).json(&body).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn delete(&self, path: &str) -> StatusCode {
        self.client.delete(self.url(path)).send().await.unwrap().status()
    }

    /// Create a resource and return its id.
    async fn create(&self, path: &str, body: Value) -> String {
        let (status, created) = self.post(path, body).await;
        assert_eq!(status, StatusCode::CREATED, "create {path}: {created}");
        created["id"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// One location with a soda machine stocking one product in slot 1.
struct Route {
    location: String,
    machine: String,
    product: String,
}

async fn seed_route(srv: &TestServer) -> Route {
    let location = srv
        .create("/locations", json!({ "name": "Central Station", "address": "Main St 1" }))
        .await;
    let machine = srv
        .create(
            "/machines",
            json!({ "name": "Hall A", "location": location, "machine_type": "Soda" }),
        )
        .await;
    let product = srv
        .create("/products", json!({ "name": "Cola", "product_type": "Soda" }))
        .await;
    srv.create(
        "/machine-items",
        json!({ "machine": machine, "product": product, "price": "1.50", "slot": 1 }),
    )
    .await;
    Route {
        location,
        machine,
        product,
    }
}

fn bulk_visit(route: &Route, days_ago: i64, before: i64, discarded: i64, restocked: i64) -> Value {
    let visit_date = Utc::now() - ChronoDuration::days(days_ago);
    json!({
        "visit": { "location": route.location, "visit_date": visit_date.to_rfc3339() },
        "machine_restocks": [{
            "machine": route.machine,
            "restock_entries": [{
                "product": route.product,
                "stock_before": before,
                "discarded": discarded,
                "restocked": restocked,
            }],
        }],
    })
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn catalog_crud_and_reference_errors() {
    let srv = TestServer::spawn().await;
    let route = seed_route(&srv).await;

    let (status, machines) = srv.get(&format!("/machines?location={}", route.location)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(machines["items"].as_array().unwrap().len(), 1);
    assert_eq!(machines["items"][0]["location_name"], "Central Station");

    // A machine pointing at a missing location is a field error.
    let missing = vendops_core::LocationId::new();
    let (status, body) = srv
        .post(
            "/machines",
            json!({ "name": "Ghost", "location": missing, "machine_type": "Snack" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["field"], "location");

    // The same slot number twice in one machine is refused.
    let other = srv
        .create("/products", json!({ "name": "Lemonade", "product_type": "Soda" }))
        .await;
    let (status, _) = srv
        .post(
            "/machine-items",
            json!({ "machine": route.machine, "product": other, "price": "2.00", "slot": 1 }),
        )
        .await;
    assert!(status.is_client_error());

    let (status, updated) = srv
        .put(&format!("/locations/{}", route.location), json!({ "name": "North Station" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "North Station");
    assert_eq!(updated["address"], "Main St 1");

    let (status, body) = srv.get("/locations/not-an-id").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");

    let (status, body) = srv.get(&format!("/products/{}", vendops_core::ProductId::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    // Deleting the location cascades to its machines and their items.
    assert_eq!(srv.delete(&format!("/locations/{}", route.location)).await, StatusCode::NO_CONTENT);
    let (_, machines) = srv.get("/machines").await;
    assert!(machines["items"].as_array().unwrap().is_empty());
    let (_, items) = srv.get("/machine-items").await;
    assert!(items["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn purchases_and_visits_move_stock_and_derive_demand() {
    let srv = TestServer::spawn().await;
    let route = seed_route(&srv).await;

    let (status, purchase) = srv
        .post(
            "/purchases",
            json!({ "product": route.product, "quantity": 20, "total_cost": "10.00" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(purchase["inventory_updated"], true);

    let (_, latest) = srv.get("/product-costs/latest").await;
    assert_eq!(latest["items"].as_array().unwrap().len(), 1);

    let (status, first) = srv.post("/visits/bulk", bulk_visit(&route, 10, 0, 0, 8)).await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    assert_eq!(first["machine_restocks"].as_array().unwrap().len(), 1);
    let (status, _) = srv.post("/visits/bulk", bulk_visit(&route, 3, 3, 1, 6)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, product) = srv.get(&format!("/products/{}", route.product)).await;
    assert_eq!(product["inventory_quantity"], 6);

    let (status, stock) = srv.get("/inventory/current-stock").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stock["machine_details"][0]["current_stock"], 8);
    assert_eq!(stock["product_summary"][0]["warehouse_stock"], 6);

    let (status, demand) = srv
        .get(&format!("/demand-tracking?machine_id={}", route.machine))
        .await;
    assert_eq!(status, StatusCode::OK);
    let records = demand["items"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["total_consumption"], 5);
    assert_eq!(records[0]["days_between_visits"], 7);

    let (status, body) = srv.get("/demand-tracking/by-product").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "product_id parameter is required");

    // Loading more than the warehouse holds rolls the whole visit back.
    let (status, body) = srv.post("/visits/bulk", bulk_visit(&route, 1, 8, 0, 100)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invariant_violation");
    let (_, visits) = srv.get("/visits").await;
    assert_eq!(visits["items"].as_array().unwrap().len(), 2);
    let (_, product) = srv.get(&format!("/products/{}", route.product)).await;
    assert_eq!(product["inventory_quantity"], 6);
}

#[tokio::test]
async fn analytics_are_cached_until_a_write() {
    let srv = TestServer::spawn().await;
    let route = seed_route(&srv).await;

    let (status, dashboard) = srv.get("/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["locations"], 1);
    srv.get("/dashboard").await;

    let (_, stats) = srv.get("/admin/cache/stats").await;
    assert_eq!(stats["total_entries"], 1);
    assert_eq!(stats["hits"], 1);

    // Any write drops the analytics entries.
    srv.post(
        "/purchases",
        json!({ "product": route.product, "quantity": 5, "cost_per_unit": "0.40" }),
    )
    .await;
    let (_, stats) = srv.get("/admin/cache/stats").await;
    assert_eq!(stats["total_entries"], 0);

    let (status, body) = srv.get("/analytics/demand?start_date=someday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = srv.get("/dashboard?days=1000000000000").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "days");
    let (status, _) = srv.get("/inventory/stock-coverage?analysis_days=1000000000000").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, report) = srv
        .post("/admin/cache/warmup", json!({ "days": [7] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_operations"], report["successful_operations"]);
    let (_, stats) = srv.get("/admin/cache/stats").await;
    assert!(stats["total_entries"].as_u64().unwrap() > 0);

    let (status, cleared) = srv.post("/admin/cache/clear", Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cleared["cleared"].as_u64().unwrap() > 0);
    let (_, stats) = srv.get("/admin/cache/stats").await;
    assert_eq!(stats["total_entries"], 0);
}

#[tokio::test]
async fn suppliers_with_purchases_can_only_be_deactivated() {
    let srv = TestServer::spawn().await;
    let route = seed_route(&srv).await;
    let supplier = srv
        .create("/suppliers", json!({ "name": "Metro Wholesale", "email": "orders@metro.test" }))
        .await;
    srv.create(
        "/purchases",
        json!({
            "product": route.product,
            "supplier": supplier,
            "quantity": 12,
            "total_cost": "6.00",
        }),
    )
    .await;

    let (status, body) = srv.post("/suppliers", json!({ "name": "metro wholesale" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "name");

    assert_eq!(srv.delete(&format!("/suppliers/{supplier}")).await, StatusCode::BAD_REQUEST);

    let (status, toggled) = srv
        .post(&format!("/suppliers/{supplier}/toggle-active"), Value::Null)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["is_active"], false);
    assert_eq!(toggled["purchase_count"], 1);

    let (_, active) = srv.get("/suppliers/active").await;
    assert!(active["items"].as_array().unwrap().is_empty());
}

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::json;

use rollstock_api::app::services::AppServices;
use rollstock_auth::CompanyCode;
use rollstock_infra::InMemoryStore;

struct TestServer {
    base_url: String,
    store: Arc<InMemoryStore>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over a fresh in-memory store, on an ephemeral port.
        let store = Arc::new(InMemoryStore::new());
        let services = AppServices::new(store.clone(), CompanyCode::new("2026").unwrap());
        let app = rollstock_api::app::build_app(Arc::new(services));

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
            store,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, client: &reqwest::Client) -> String {
        let res = client
            .post(self.url("/login"))
            .json(&json!({ "code": "2026" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: serde_json::Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn roll(id: &str, quantity: f64) -> serde_json::Value {
    json!({
        "id": id,
        "quantity": quantity,
        "attributes": {
            "category": "roll",
            "thickness_mm": 0.05,
            "width_cm": 100.0,
            "length_m": 500.0
        }
    })
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn session_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/inventory/roll")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/work-orders"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn login_rotate_and_logout() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/login"))
        .json(&json!({ "code": "1234" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(srv.url("/login"))
        .json(&json!({ "code": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let token = srv.login(&client).await;

    let res = client.get(srv.url("/whoami")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["token"], token.as_str());

    let res = client
        .put(srv.url("/settings/company-code"))
        .bearer_auth(&token)
        .json(&json!({ "code": "7777" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    // Old code no longer opens sessions; the existing one survives.
    let res = client
        .post(srv.url("/login"))
        .json(&json!({ "code": "2026" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let res = client.get(srv.url("/whoami")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.post(srv.url("/logout")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client.get(srv.url("/whoami")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn inventory_lifecycle_register_move_and_alert() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client).await;

    let res = client
        .post(srv.url("/inventory/roll"))
        .bearer_auth(&token)
        .json(&roll("V-TEST", 5.0))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(srv.url("/inventory/roll"))
        .bearer_auth(&token)
        .json(&roll("V-TEST", 1.0))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .post(srv.url("/inventory/roll/items/V-TEST/movements"))
        .bearer_auth(&token)
        .json(&json!({ "delta": -3.0, "note": "outbound" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["item"]["quantity"].as_f64().unwrap(), 2.0);
    assert_eq!(body["transaction"]["delta"].as_f64().unwrap(), -3.0);

    // Overdraw: rejected, nothing changes.
    let res = client
        .post(srv.url("/inventory/roll/items/V-TEST/movements"))
        .bearer_auth(&token)
        .json(&json!({ "delta": -10.0, "note": "outbound" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");

    let res = client
        .get(srv.url("/inventory/roll/items/V-TEST/movements"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let log: serde_json::Value = res.json().await.unwrap();
    assert_eq!(log.as_array().unwrap().len(), 1);

    let res = client
        .get(srv.url("/inventory/roll/items/V-TEST/usage"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["usage"].as_f64().unwrap(), 3.0);

    let res = client
        .get(srv.url("/inventory/roll/items/V-TEST/usage?year=2000&month=1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["usage"].as_f64().unwrap(), 0.0);

    let res = client
        .get(srv.url("/inventory/roll/items/V-TEST/usage?year=2026"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(srv.url("/inventory/roll/items/V-TEST/usage?year=2147483647&month=12"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .put(srv.url("/inventory/roll/items/V-TEST/reorder-level"))
        .bearer_auth(&token)
        .json(&json!({ "threshold": 2.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url("/inventory/roll/alerts"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let alerts: serde_json::Value = res.json().await.unwrap();
    assert_eq!(alerts.as_array().unwrap().len(), 1);
    assert_eq!(alerts[0]["item_id"], "V-TEST");

    let res = client.get(srv.url("/inventory/roll")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let snapshot: serde_json::Value = res.json().await.unwrap();
    assert_eq!(snapshot["unit"], "rolls");
    assert_eq!(snapshot["total_quantity"].as_f64().unwrap(), 2.0);
    assert_eq!(snapshot["lines"][0]["monthly_usage"].as_f64().unwrap(), 3.0);
    assert_eq!(snapshot["lines"][0]["reorder_level"].as_f64().unwrap(), 2.0);
    assert!(snapshot["degraded"].is_null());
}

#[tokio::test]
async fn inventory_edit_bulk_replace_and_delete() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client).await;

    let res = client
        .put(srv.url("/inventory/roll"))
        .bearer_auth(&token)
        .json(&json!({ "items": [roll("V-1", 4.0), roll("V-2", 6.0)] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["replaced"], 2);

    let res = client
        .get(srv.url("/inventory/roll/total"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["total_quantity"].as_f64().unwrap(), 10.0);

    // Cut-only field on a roll.
    let res = client
        .patch(srv.url("/inventory/roll/items/V-1"))
        .bearer_auth(&token)
        .json(&json!({ "company": "ACME" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .patch(srv.url("/inventory/roll/items/V-1"))
        .bearer_auth(&token)
        .json(&json!({ "width_cm": 120.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["attributes"]["width_cm"].as_f64().unwrap(), 120.0);

    let res = client
        .delete(srv.url("/inventory/roll/items/V-2"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url("/inventory/roll/items/V-2"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(srv.url("/inventory/sheets"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn raw_material_id_is_derived_from_name_and_grade() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client).await;

    let res = client
        .post(srv.url("/inventory/raw_material"))
        .bearer_auth(&token)
        .json(&json!({
            "quantity": 12.5,
            "attributes": { "category": "raw_material", "name": " PET ", "grade": "A ", "note": "lot 7" }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["id"], "PET/A");
    assert_eq!(body["attributes"]["name"], "PET");
    assert_eq!(body["attributes"]["grade"], "A");
    assert_eq!(body["attributes"]["note"], "lot 7");

    let res = client
        .get(srv.url("/inventory/raw_material/items/PET%2FA"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["quantity"].as_f64().unwrap(), 12.5);
}

#[tokio::test]
async fn unavailable_backend_degrades_reads_and_fails_writes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client).await;

    srv.store.set_available(false);

    let res = client.get(srv.url("/inventory/cut")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let snapshot: serde_json::Value = res.json().await.unwrap();
    assert!(snapshot["degraded"].is_string());
    assert!(snapshot["lines"].as_array().unwrap().is_empty());

    let res = client
        .post(srv.url("/inventory/roll"))
        .bearer_auth(&token)
        .json(&roll("V-1", 1.0))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "backend_unavailable");
}

#[tokio::test]
async fn work_order_pipeline_and_purge() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.login(&client).await;

    for (id, company) in [("W-1", "ACME"), ("W-2", "Globex")] {
        let res = client
            .post(srv.url("/work-orders"))
            .bearer_auth(&token)
            .json(&json!({ "id": id, "company": company, "quantity": 10, "unit": "roll" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = client
        .post(srv.url("/work-orders"))
        .bearer_auth(&token)
        .json(&json!({ "id": "W-1", "company": "Other", "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let expected = ["in_production", "cutting", "done", "delivered"];
    for status in expected {
        let res = client
            .post(srv.url("/work-orders/W-1/advance"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["order"]["status"], status);
        assert_eq!(body["changed"], true);
    }

    let res = client
        .post(srv.url("/work-orders/W-1/advance"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["order"]["status"], "delivered");
    assert_eq!(body["changed"], false);

    let res = client
        .put(srv.url("/work-orders/W-2/status"))
        .bearer_auth(&token)
        .json(&json!({ "status": "재단중" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["order"]["status"], "cutting");

    let res = client
        .patch(srv.url("/work-orders/W-2"))
        .bearer_auth(&token)
        .json(&json!({ "due_date": "2026-03-01" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["due_date"], "2026-03-01");

    let res = client
        .patch(srv.url("/work-orders/W-2"))
        .bearer_auth(&token)
        .json(&json!({ "due_date": null }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["due_date"].is_null());

    let res = client.get(srv.url("/work-orders/board")).bearer_auth(&token).send().await.unwrap();
    let board: serde_json::Value = res.json().await.unwrap();
    assert_eq!(board.as_array().unwrap().len(), 4);
    assert_eq!(board[2]["orders"][0]["id"], "W-2");

    let res = client
        .get(srv.url("/work-orders?filter=delivered"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let delivered: serde_json::Value = res.json().await.unwrap();
    assert_eq!(delivered.as_array().unwrap().len(), 1);

    let res = client
        .post(srv.url("/work-orders/purge"))
        .bearer_auth(&token)
        .json(&json!({ "ids": ["W-1", "W-2"] }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["removed"], json!(["W-1"]));

    let res = client
        .get(srv.url("/work-orders?filter=all"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let all: serde_json::Value = res.json().await.unwrap();
    assert_eq!(all.as_array().unwrap().len(), 1);
}

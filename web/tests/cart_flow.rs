//! End-to-end storefront flows over the full router, with an in-memory
//! session store, the recording mock processor, and a wiremock table-store.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::{TestServer, TestServerConfig};
use chrono::Duration;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use printworks_checkout::{MockProcessor, PaymentProcessor};
use printworks_store::{MemorySessionStore, SessionStore, TableStore};
use printworks_web::{AppState, Config, router};

struct TestApp {
    server: TestServer,
    sessions: Arc<MemorySessionStore>,
    processor: Arc<MockProcessor>,
    _table_store: MockServer,
}

fn test_config(table_store_url: String) -> Config {
    Config {
        bind_address: "127.0.0.1:0".to_string(),
        public_base_url: "http://localhost:8000".to_string(),
        table_store_url,
        table_store_token: "test-token".to_string(),
        artwork_table: "artworks".to_string(),
        icon_table: "icons".to_string(),
        sessions_table: "sessions".to_string(),
        subscribers_table: "subscribers".to_string(),
        keys_table: "keys".to_string(),
        processor_secret_key: "sk_test".to_string(),
        session_ttl: Duration::minutes(15),
        sweep_interval: std::time::Duration::from_secs(1800),
        image_scale: 0.8,
        admin_username: "admin".to_string(),
        admin_password: "secret".to_string(),
        allowed_origins: Vec::new(),
        static_dir: "static".to_string(),
    }
}

async fn spawn_app(titles: &[(&str, i64)]) -> TestApp {
    let table_store = MockServer::start().await;

    let artworks: Vec<serde_json::Value> = titles
        .iter()
        .enumerate()
        .map(|(index, (title, price))| {
            json!({
                "Id": index + 1,
                "img_label": title,
                "img": format!("[{{\"path\": \"download/{index}.png\"}}]"),
                "price": price.to_string(),
                "updated_at": "2024-06-01 10:00:00+00:00"
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/api/v2/tables/artworks/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "list": artworks })))
        .mount(&table_store)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tables/icons/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "list": [] })))
        .mount(&table_store)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tables/subscribers/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "list": [] })))
        .mount(&table_store)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v2/tables/subscribers/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Id": 1 })))
        .mount(&table_store)
        .await;

    let config = test_config(table_store.uri());
    let store = TableStore::new(table_store.uri(), "test-token");
    let sessions = Arc::new(MemorySessionStore::new(config.session_ttl));
    let processor = Arc::new(MockProcessor::new());
    let dyn_sessions: Arc<dyn SessionStore> = sessions.clone();
    let dyn_processor: Arc<dyn PaymentProcessor> = processor.clone();
    let state = AppState::from_parts(config, store, dyn_sessions, dyn_processor).unwrap();

    let server = TestServer::new_with_config(
        router(state),
        TestServerConfig {
            save_cookies: true,
            ..TestServerConfig::default()
        },
    )
    .unwrap();

    TestApp {
        server,
        sessions,
        processor,
        _table_store: table_store,
    }
}

#[tokio::test]
async fn adding_to_the_cart_creates_a_session_and_merges_quantities() {
    let app = spawn_app(&[("Sunset", 225)]).await;

    let first = app
        .server
        .post("/cart/items")
        .json(&json!({"title": "Sunset", "quantity": 2}))
        .await;
    first.assert_status_ok();
    assert_eq!(first.json::<serde_json::Value>()["quantity"], 2);

    let second = app
        .server
        .post("/cart/items")
        .json(&json!({"title": "Sunset", "quantity": 3}))
        .await;
    assert_eq!(second.json::<serde_json::Value>()["quantity"], 5);

    // One session row, one merged line, price from the catalog lookup.
    let records = app.sessions.list_all().await.unwrap();
    assert_eq!(records.len(), 1);
    let cart = &records[0].state.cart;
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.get("Sunset").unwrap().quantity, 5);
    assert_eq!(cart.get("Sunset").unwrap().price, 225 * 5);

    let quantity = app.server.get("/cart/quantity").await;
    assert_eq!(quantity.json::<serde_json::Value>()["quantity"], 5);
}

#[tokio::test]
async fn adding_an_unknown_title_is_a_404() {
    let app = spawn_app(&[("Sunset", 225)]).await;

    let response = app
        .server
        .post("/cart/items")
        .json(&json!({"title": "Ghost", "quantity": 1}))
        .await;
    response.assert_status_not_found();
    assert!(app.sessions.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn the_twenty_first_distinct_title_is_rejected() {
    let titles: Vec<(String, i64)> = (0..21).map(|i| (format!("Piece {i}"), 100)).collect();
    let borrowed: Vec<(&str, i64)> = titles.iter().map(|(t, p)| (t.as_str(), *p)).collect();
    let app = spawn_app(&borrowed).await;

    for (title, _) in borrowed.iter().take(20) {
        let response = app
            .server
            .post("/cart/items")
            .json(&json!({"title": title, "quantity": 1}))
            .await;
        response.assert_status_ok();
    }

    let rejected = app
        .server
        .post("/cart/items")
        .json(&json!({"title": "Piece 20", "quantity": 1}))
        .await;
    rejected.assert_status_bad_request();
    assert_eq!(rejected.json::<serde_json::Value>()["code"], "CART_FULL");

    let quantity = app.server.get("/cart/quantity").await;
    assert_eq!(quantity.json::<serde_json::Value>()["quantity"], 20);
}

#[tokio::test]
async fn decreasing_the_last_unit_deletes_the_session() {
    let app = spawn_app(&[("Sunset", 225)]).await;

    app.server
        .post("/cart/items")
        .json(&json!({"title": "Sunset", "quantity": 1}))
        .await
        .assert_status_ok();
    assert_eq!(app.sessions.list_all().await.unwrap().len(), 1);

    let response = app
        .server
        .post("/cart/decrease")
        .json(&json!({"title": "Sunset"}))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>()["price"], 0);

    assert!(app.sessions.list_all().await.unwrap().is_empty());
    let quantity = app.server.get("/cart/quantity").await;
    assert_eq!(quantity.json::<serde_json::Value>()["quantity"], 0);
}

#[tokio::test]
async fn cart_mutations_without_a_session_are_rejected() {
    let app = spawn_app(&[("Sunset", 225)]).await;

    let response = app
        .server
        .post("/cart/increase")
        .json(&json!({"title": "Sunset"}))
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn validate_total_confirms_the_persisted_cart() {
    let app = spawn_app(&[("Sunset", 225)]).await;
    app.server
        .post("/cart/items")
        .json(&json!({"title": "Sunset", "quantity": 2}))
        .await
        .assert_status_ok();

    app.server
        .post("/cart/validate_total")
        .json(&json!({"totalPrice": 450}))
        .await
        .assert_status_ok();

    let mismatch = app
        .server
        .post("/cart/validate_total")
        .json(&json!({"totalPrice": 449}))
        .await;
    mismatch.assert_status_bad_request();
}

#[tokio::test]
async fn checkout_reuses_synchronized_processor_prices() {
    let app = spawn_app(&[("Sunset", 225)]).await;
    let (_, price_id) = app.processor.seed_product("Sunset", 22500).await;

    app.server
        .post("/cart/items")
        .json(&json!({"title": "Sunset", "quantity": 2}))
        .await
        .assert_status_ok();

    let response = app.server.post("/checkout/session").await;
    response.assert_status_ok();
    let url = response.json::<serde_json::Value>()["url"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(url.starts_with("https://pay.processor.test/"));

    assert_eq!(app.processor.created_products().await, 0);
    assert_eq!(app.processor.created_prices().await, 0);
    let links = app.processor.payment_links().await;
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].len(), 1);
    assert_eq!(links[0][0].price, price_id);
    assert_eq!(links[0][0].quantity, 2);
}

#[tokio::test]
async fn checkout_with_no_cart_is_nothing_to_check_out() {
    let app = spawn_app(&[("Sunset", 225)]).await;
    let response = app.server.post("/checkout/session").await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn session_bootstrap_issues_a_token_once() {
    let app = spawn_app(&[]).await;

    let first = app.server.get("/session/bootstrap").await;
    first.assert_status_ok();
    let first_body = first.json::<serde_json::Value>();
    assert_eq!(first_body["fresh"], true);

    let second = app.server.get("/session/bootstrap").await;
    let second_body = second.json::<serde_json::Value>();
    assert_eq!(second_body["fresh"], false);
    assert_eq!(second_body["session_id"], first_body["session_id"]);

    // Bootstrap alone creates no row.
    assert!(app.sessions.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn product_feed_lists_the_catalog() {
    let app = spawn_app(&[("Sunset", 225)]).await;

    let response = app.server.get("/feed/google").await;
    response.assert_status_ok();
    let body = response.text();
    assert!(body.contains("<g:title>Sunset</g:title>"));
    assert!(body.contains("<g:price>225.00 USD</g:price>"));
}

#[tokio::test]
async fn portal_login_gates_the_admin_page() {
    let app = spawn_app(&[]).await;

    let rejected = app
        .server
        .post("/portal/login")
        .json(&json!({"username": "admin", "password": "wrong"}))
        .await;
    rejected.assert_status(StatusCode::UNAUTHORIZED);

    let accepted = app
        .server
        .post("/portal/login")
        .json(&json!({"username": "admin", "password": "secret"}))
        .await;
    accepted.assert_status(StatusCode::SEE_OTHER);

    let admin = app.server.get("/portal/admin").await;
    admin.assert_status_ok();
    assert!(admin.text().contains("Add artwork"));

    app.server
        .post("/portal/logout")
        .await
        .assert_status(StatusCode::SEE_OTHER);
    assert!(app.sessions.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn subscribe_inserts_each_email_once() {
    let app = spawn_app(&[]).await;

    let response = app
        .server
        .post("/subscribe")
        .json(&json!({"email": "collector@example.com"}))
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<serde_json::Value>()["message"],
        "Email subscribed successfully"
    );

    let invalid = app.server.post("/subscribe").json(&json!({"email": "nope"})).await;
    invalid.assert_status_bad_request();
}

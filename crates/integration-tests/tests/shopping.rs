//! Integration tests for the catalog, checkout, order history and the admin
//! inventory panel.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use lm_store_core::{NewProduct, OrderId, OrderStatus, Price, ProductId};
use lm_store_integration_tests::{MockApi, MockResponse};
use lm_store_storefront::api::CardDetails;
use lm_store_storefront::{ApiError, AuthEvent, SessionCredential, StoreClient};
use serde_json::json;

fn logged_in(api: &MockApi) -> StoreClient {
    api.client(Some(SessionCredential::from_token("abc123")))
}

fn card() -> CardDetails {
    CardDetails::parse("4242 4242 4242 4242", "12/29", "123").unwrap()
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_product_list_and_detail() {
    let api = MockApi::start().await;
    api.stub(
        Method::GET,
        "/products",
        MockResponse::ok(json!([
            {"id": 1, "name": "Mug", "description": "Ceramic", "price": 12.0, "image_url": "/mug.png", "stock": 4, "is_active": 1},
            {"id": 2, "name": "Lamp", "description": "LED", "price": 24.5, "image_url": null, "stock": 0, "is_active": 1}
        ])),
    );
    api.stub(
        Method::GET,
        "/products/2",
        MockResponse::ok(json!({"id": 2, "name": "Lamp", "description": "LED", "price": 24.5, "stock": 0})),
    );
    let client = api.client(None);

    let products = client.products().list().await.unwrap();
    assert_eq!(products.len(), 2);
    assert!(products[0].in_stock());
    assert!(!products[1].in_stock());

    let lamp = client.products().get(ProductId::new(2)).await.unwrap();
    assert_eq!(lamp.price, Price::from_cents(2450));
    assert!(lamp.is_active);
}

#[tokio::test]
async fn test_missing_product_is_404() {
    let api = MockApi::start().await;
    api.stub(
        Method::GET,
        "/products/99",
        MockResponse::json(StatusCode::NOT_FOUND, json!({"detail": "Product not found"})),
    );
    let client = api.client(None);

    let err = client.products().get(ProductId::new(99)).await.unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
    assert_eq!(err.to_string(), "Product not found (HTTP 404 Not Found)");
}

#[tokio::test]
async fn test_malformed_body_is_json_error() {
    let api = MockApi::start().await;
    api.stub(Method::GET, "/products", MockResponse::ok(json!({"unexpected": true})));
    let client = api.client(None);

    let err = client.products().list().await.unwrap_err();

    assert!(matches!(err, ApiError::Json(_)));
}

// =============================================================================
// Checkout and Orders
// =============================================================================

#[tokio::test]
async fn test_checkout_places_order() {
    let api = MockApi::start().await;
    api.stub(
        Method::POST,
        "/checkout",
        MockResponse::ok(json!({"message": "Order placed successfully", "order_id": 41})),
    );
    let client = logged_in(&api);
    let mut events = client.session().subscribe();

    let receipt = client.checkout().pay(&card()).await.unwrap();

    assert_eq!(receipt.order_id, OrderId::new(41));
    assert_eq!(events.try_recv().unwrap(), AuthEvent::CartUpdated);
    let request = &api.requests_to("/checkout")[0];
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.header("authorization"), Some("Bearer abc123"));
    assert!(request.body.is_empty());
}

#[tokio::test]
async fn test_declined_checkout() {
    let api = MockApi::start().await;
    api.stub(
        Method::POST,
        "/checkout",
        MockResponse::json(StatusCode::BAD_REQUEST, json!({"detail": "Cart is empty"})),
    );
    let client = logged_in(&api);

    let err = client.checkout().pay(&card()).await.unwrap_err();

    let ApiError::Rejected { detail, .. } = err else {
        panic!("expected Rejected, got {err:?}");
    };
    assert_eq!(detail, "Cart is empty");
}

#[tokio::test]
async fn test_order_history() {
    let api = MockApi::start().await;
    api.stub(
        Method::GET,
        "/orders",
        MockResponse::ok(json!([
            {"id": 41, "user_id": 7, "total_amount": 49.0, "status": "pending", "created_at": "2025-06-02 18:04:11"},
            {"id": 12, "user_id": 7, "total_amount": 12.0, "status": "shipped", "created_at": "2025-05-20T09:00:00"}
        ])),
    );
    let client = logged_in(&api);

    let orders = client.orders().history().await.unwrap();

    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].id, OrderId::new(41));
    assert_eq!(orders[1].status, OrderStatus::Shipped);
    assert_eq!(orders[0].total_amount, Price::from_cents(4900));
}

// =============================================================================
// Admin Inventory
// =============================================================================

#[tokio::test]
async fn test_dashboard_combines_users_and_catalog() {
    let api = MockApi::start().await;
    api.stub(
        Method::GET,
        "/admin/users",
        MockResponse::ok(json!([
            {"id": 1, "username": "ada", "role": "admin", "created_at": "2025-01-01 10:00:00"},
            {"id": 7, "username": "grace", "role": "user", "created_at": "2025-02-01 10:00:00"}
        ])),
    );
    api.stub(
        Method::GET,
        "/products",
        MockResponse::ok(json!([
            {"id": 1, "name": "Mug", "description": "", "price": 12.0, "stock": 4},
            {"id": 2, "name": "Lamp", "description": "", "price": 24.5, "stock": 0}
        ])),
    );
    let client = logged_in(&api);

    let dashboard = client.admin().dashboard().await.unwrap();

    assert_eq!(dashboard.user_count, 2);
    assert_eq!(dashboard.products.len(), 2);
    let out: Vec<_> = dashboard.out_of_stock().map(|p| p.name.as_str()).collect();
    assert_eq!(out, vec!["Lamp"]);
}

#[tokio::test]
async fn test_dashboard_stops_at_forbidden() {
    let api = MockApi::start().await;
    api.stub(
        Method::GET,
        "/admin/users",
        MockResponse::json(StatusCode::FORBIDDEN, json!({"detail": "Admin access required"})),
    );
    let client = logged_in(&api);

    let err = client.admin().dashboard().await.unwrap_err();

    assert!(err.is_forbidden());
    assert!(api.requests_to("/products").is_empty());
}

#[tokio::test]
async fn test_inventory_writes() {
    let api = MockApi::start().await;
    api.stub(
        Method::PUT,
        "/admin/product/3/stock",
        MockResponse::ok(json!({"status": "success", "message": "Updated stock for product ID 3"})),
    );
    api.stub(
        Method::POST,
        "/admin/deactive/3",
        MockResponse::ok(json!({"status": "success", "message": "Deleted product with ID 3"})),
    );
    api.stub(
        Method::POST,
        "/admin/products/restore/3",
        MockResponse::ok(json!({"message": "Restored product #3"})),
    );
    let client = logged_in(&api);
    let id = ProductId::new(3);

    client.admin().update_stock(id, 25).await.unwrap();
    client.admin().deactivate(id).await.unwrap();
    client.admin().restore(id).await.unwrap();

    let requests = api.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].query.as_deref(), Some("stock=25"));
    assert_eq!(requests[1].method, Method::POST);
    assert_eq!(requests[2].path, "/admin/products/restore/3");
}

#[tokio::test]
async fn test_add_product_sends_body() {
    let api = MockApi::start().await;
    api.stub(
        Method::POST,
        "/admin/products",
        MockResponse::ok(json!({"status": "success", "message": "Added Desk Lamp"})),
    );
    let client = logged_in(&api);
    let product = NewProduct {
        name: "Desk Lamp".to_string(),
        description: "Warm white LED".to_string(),
        price: Price::from_cents(2450),
        image_url: String::new(),
        stock: 10,
    };

    let message = client.admin().add_product(&product).await.unwrap();

    assert_eq!(message, "Added Desk Lamp");
    let body = api.requests_to("/admin/products")[0].json();
    assert_eq!(body["name"], "Desk Lamp");
    assert_eq!(body["price"], json!(24.5));
    assert_eq!(body["stock"], 10);
}

#[tokio::test]
async fn test_archived_and_activity() {
    let api = MockApi::start().await;
    api.stub(
        Method::GET,
        "/admin/products/archived",
        MockResponse::ok(json!([
            {"id": 9, "name": "Old Mug", "description": "", "price": 5.0, "stock": 0, "is_active": 0}
        ])),
    );
    api.stub(
        Method::GET,
        "/admin/activities",
        MockResponse::ok(json!([
            {"username": "grace", "order_id": 41, "total_amount": 49.0, "created_at": "2025-06-02 18:04:11"}
        ])),
    );
    let client = logged_in(&api);

    let archived = client.admin().archived().await.unwrap();
    assert!(!archived[0].is_active);

    let activity = client.admin().activities().await.unwrap();
    assert_eq!(activity[0].username, "grace");
    assert_eq!(activity[0].order_id, OrderId::new(41));
}

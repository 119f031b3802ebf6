use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    middleware,
    routing::{get, patch, post, put},
};
use serde_json::{Value, json};
use tower::ServiceExt; // for oneshot

use udhar_khata::{routes, session::require_owner, state::AppState};

#[path = "common/mod.rs"]
mod common;

fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/customers",
            get(routes::customers_index).post(routes::customers_create),
        )
        .route(
            "/api/customers/{id}",
            put(routes::customers_update).delete(routes::customers_delete),
        )
        .route(
            "/api/customer-udhar",
            get(routes::udhar_index).post(routes::udhar_create),
        )
        .route(
            "/api/customer-udhar/{id}",
            put(routes::udhar_update).delete(routes::udhar_delete),
        )
        .route("/api/customer-udhar/{id}/paid", patch(routes::udhar_mark_paid))
        .route(
            "/api/customer-udhar/{id}/partial-payment",
            patch(routes::udhar_partial_payment),
        )
        .route(
            "/api/customer-udhar/{id}/carry-forward",
            post(routes::udhar_carry_forward),
        )
        .route(
            "/api/shop-borrow",
            get(routes::borrow_index).post(routes::borrow_create),
        )
        .route("/api/shop-borrow/{id}/paid", patch(routes::borrow_mark_paid))
        .route("/api/sales", get(routes::sales_index).post(routes::sales_create))
        .route("/api/sales/{id}", get(routes::sales_show))
        .route("/api/dashboard/stats", get(routes::dashboard_show))
        .route("/api/notifications", get(routes::notifications_index))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_owner))
        .with_state(state)
}

fn authed(token: &str, method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn rejects_missing_and_bogus_tokens() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = Arc::new(ctx.state.clone());
    let app = build_app(state);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/customers")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(authed("no-such-token", "GET", "/api/customers", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn customer_and_udhar_flow_over_http() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = Arc::new(ctx.state.clone());
    let token = ctx.token_for(&ctx.owner).await;
    let app = build_app(state);

    // Create a customer.
    let response = app
        .clone()
        .oneshot(authed(
            &token,
            "POST",
            "/api/customers",
            Some(json!({ "name": "Imran", "phone": "0333-1231234" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    let customer_id = body["data"]["_id"]["$oid"].as_str().unwrap().to_string();

    // Open an udhar record against them.
    let response = app
        .clone()
        .oneshot(authed(
            &token,
            "POST",
            "/api/customer-udhar",
            Some(json!({
                "customer": customer_id,
                "items": [
                    { "itemName": "Rice", "quantity": 2, "pricePerItem": 100 },
                    { "itemName": "Oil", "quantity": 1, "pricePerItem": 100 }
                ],
                "dueDate": "2030-06-01"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["totalAmount"], json!(300.0));
    assert_eq!(body["data"]["status"], json!("Pending"));
    assert_eq!(body["data"]["customerInfo"]["name"], json!("Imran"));
    let record_id = body["data"]["_id"]["$oid"].as_str().unwrap().to_string();

    // Record a partial payment.
    let response = app
        .clone()
        .oneshot(authed(
            &token,
            "PATCH",
            &format!("/api/customer-udhar/{record_id}/partial-payment"),
            Some(json!({ "amount": 120 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["paidAmount"], json!(120.0));
    assert_eq!(body["data"]["remainingAmount"], json!(180.0));
    assert_eq!(body["data"]["status"], json!("PartialPaid"));
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("Payment of Rs.120")
    );

    // The list view paginates and resolves the customer reference.
    let response = app
        .clone()
        .oneshot(authed(&token, "GET", "/api/customer-udhar", None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["page"], json!(1));
    assert_eq!(body["data"][0]["customerInfo"]["phone"], json!("0333-1231234"));

    // Another owner's token sees nothing.
    let stranger = bson::oid::ObjectId::new();
    let other_token = ctx.token_for(&stranger).await;
    let response = app
        .oneshot(authed(&other_token, "GET", "/api/customer-udhar", None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total"], json!(0));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn deleted_customer_leaves_udhar_readable() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = Arc::new(ctx.state.clone());
    let token = ctx.token_for(&ctx.owner).await;
    let app = build_app(state);

    let response = app
        .clone()
        .oneshot(authed(
            &token,
            "POST",
            "/api/customers",
            Some(json!({ "name": "Departed", "phone": "0307-9990000" })),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    let customer_id = body["data"]["_id"]["$oid"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(authed(
            &token,
            "POST",
            "/api/customer-udhar",
            Some(json!({
                "customer": customer_id,
                "items": [{ "itemName": "Goods", "quantity": 1, "pricePerItem": 400 }],
                "dueDate": "2030-06-01"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(authed(
            &token,
            "DELETE",
            &format!("/api/customers/{customer_id}"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The ledger entry outlives the directory entry; the reference just
    // stops resolving.
    let response = app
        .oneshot(authed(&token, "GET", "/api/customer-udhar", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["data"][0]["totalAmount"], json!(400.0));
    assert_eq!(body["data"][0]["customerInfo"], Value::Null);

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn carry_forward_over_http() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = Arc::new(ctx.state.clone());
    let token = ctx.token_for(&ctx.owner).await;
    let app = build_app(state);

    let customer = bson::oid::ObjectId::new();
    let response = app
        .clone()
        .oneshot(authed(
            &token,
            "POST",
            "/api/customer-udhar",
            Some(json!({
                "customer": customer.to_hex(),
                "items": [{ "itemName": "Ghee", "quantity": 1, "pricePerItem": 500 }],
                "dueDate": "2024-01-15"
            })),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    let record_id = body["data"]["_id"]["$oid"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(authed(
            &token,
            "POST",
            &format!("/api/customer-udhar/{record_id}/carry-forward"),
            Some(json!({})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["originalRecord"]["status"], json!("Paid"));
    assert_eq!(body["data"]["originalRecord"]["remainingAmount"], json!(0.0));
    assert_eq!(body["data"]["newRecord"]["totalAmount"], json!(500.0));
    assert_eq!(
        body["data"]["newRecord"]["carriedForwardFrom"],
        json!({ "$oid": record_id })
    );
    assert!(body["message"].as_str().unwrap().contains("carried forward"));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn sale_and_dashboard_over_http() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = Arc::new(ctx.state.clone());
    let token = ctx.token_for(&ctx.owner).await;
    let app = build_app(state);

    let response = app
        .clone()
        .oneshot(authed(
            &token,
            "POST",
            "/api/sales",
            Some(json!({
                "walkInName": "Passerby",
                "items": [{ "itemName": "Soap", "quantity": 4, "pricePerItem": 250 }],
                "amountReceived": 950,
                "discount": 100
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["totalAmount"], json!(900.0));
    assert_eq!(body["data"]["changeReturned"], json!(50.0));
    let receipt = body["data"]["receiptNumber"].as_str().unwrap();
    assert!(receipt.starts_with("REC-") && receipt.ends_with("-00001"));

    let response = app
        .oneshot(authed(&token, "GET", "/api/dashboard/stats", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["totalCustomers"], json!(0));
    assert_eq!(body["data"]["customerUdhar"]["Pending"]["count"], json!(0));
    assert_eq!(body["data"]["dueToday"], json!(0));

    common::teardown(Some(ctx)).await;
}

#[tokio::test]
async fn validation_errors_use_the_envelope() {
    let ctx = match common::setup_state().await {
        Some(s) => s,
        None => return,
    };
    let state = Arc::new(ctx.state.clone());
    let token = ctx.token_for(&ctx.owner).await;
    let app = build_app(state);

    // Malformed id in the path.
    let response = app
        .clone()
        .oneshot(authed(
            &token,
            "PATCH",
            "/api/customer-udhar/not-an-id/paid",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Invalid ID format"));

    // Unknown record id.
    let missing = bson::oid::ObjectId::new();
    let response = app
        .oneshot(authed(
            &token,
            "PATCH",
            &format!("/api/customer-udhar/{}/paid", missing.to_hex()),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["message"], json!("Record not found"));

    common::teardown(Some(ctx)).await;
}

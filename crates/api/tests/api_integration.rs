//! Integration tests for the API server.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{Money, ProductId, UserId, VariantId};
use gateway::InMemoryGatewayTransport;
use gateway::sign::{self, SignatureAlgorithm};
use metrics_exporter_prometheus::PrometheusHandle;
use settlement::{InventoryLedger, VariantRecord};
use tower::ServiceExt;

use api::config::Config;
use api::routes::orders::{AppState, USER_HEADER};

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct Harness {
    app: axum::Router,
    state: Arc<AppState>,
    transport: InMemoryGatewayTransport,
    user: UserId,
    admin: UserId,
    product: ProductId,
    variant: VariantId,
}

async fn setup() -> Harness {
    let config = Config {
        tax_cents: 100,
        shipping_fee_cents: 500,
        ..Config::default()
    };
    let (state, transport) = api::create_in_memory_state(&config);
    let app = api::create_app(state.clone(), get_metrics_handle());

    let user = UserId::new();
    let admin = UserId::new();
    state.directory.add_user(user).await;
    state.directory.add_admin(admin).await;

    let product = ProductId::new();
    let variant = VariantId::new();
    state
        .catalog
        .add_variant(VariantRecord {
            product_id: product,
            variant_id: variant,
            product_name: "Widget".to_string(),
            unit_price: Money::from_cents(1000),
        })
        .await;
    state.inventory.set_stock(variant, 5).await;

    Harness {
        app,
        state,
        transport,
        user,
        admin,
        product,
        variant,
    }
}

fn order_body(h: &Harness, quantity: u32, method: &str) -> String {
    serde_json::to_string(&serde_json::json!({
        "items": [{
            "product_id": h.product.to_string(),
            "variant_id": h.variant.to_string(),
            "quantity": quantity,
        }],
        "shipping_address": {
            "recipient": "Ada Lovelace",
            "phone": "555-0100",
            "line1": "1 Analytical Way",
            "line2": null,
            "city": "London",
            "postal_code": "E1 6AN",
        },
        "payment_method": method,
    }))
    .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn create_order(h: &Harness, quantity: u32, method: &str) -> serde_json::Value {
    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .header(USER_HEADER, h.user.to_string())
                .body(Body::from(order_body(h, quantity, method)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

async fn initiate_payment(h: &Harness, order: &serde_json::Value) -> serde_json::Value {
    let order_id = order["id"].as_str().unwrap();
    let total = order["total_cents"].as_i64().unwrap();
    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/orders/{order_id}/payments"))
                .header("content-type", "application/json")
                .header(USER_HEADER, h.user.to_string())
                .body(Body::from(
                    serde_json::json!({ "amount_cents": total }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await
}

/// Builds a validly-signed AlphaPay callback as an urlencoded form body.
fn alpha_callback_form(txn: &str, status: &str, secret: &str) -> String {
    let mut fields = BTreeMap::from([
        ("out_trade_no".to_string(), txn.to_string()),
        ("trade_no".to_string(), "ALPHA-777".to_string()),
        ("trade_status".to_string(), status.to_string()),
    ]);
    let signature = sign::sign(
        fields.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        secret,
        SignatureAlgorithm::HmacSha256,
    );
    fields.insert("sign".to_string(), signature);
    fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[tokio::test]
async fn test_health_check() {
    let h = setup().await;

    let response = h
        .app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_order_computes_totals() {
    let h = setup().await;
    let order = create_order(&h, 2, "alphapay").await;

    assert_eq!(order["status"], "Pending");
    assert_eq!(order["subtotal_cents"], 2000);
    assert_eq!(order["tax_cents"], 100);
    assert_eq!(order["shipping_fee_cents"], 500);
    assert_eq!(order["total_cents"], 2600);
    assert_eq!(h.state.inventory.available(h.variant).await, 3);
}

#[tokio::test]
async fn test_create_order_requires_user_header() {
    let h = setup().await;

    let body = order_body(&h, 1, "alphapay");
    let response = h
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_order_insufficient_stock_conflicts() {
    let h = setup().await;

    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .header(USER_HEADER, h.user.to_string())
                .body(Body::from(order_body(&h, 6, "alphapay")))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(h.state.inventory.available(h.variant).await, 5);
}

#[tokio::test]
async fn test_get_order_visibility() {
    let h = setup().await;
    let order = create_order(&h, 1, "alphapay").await;
    let order_id = order["id"].as_str().unwrap();

    // Owner sees the order.
    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{order_id}"))
                .header(USER_HEADER, h.user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Strangers do not.
    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{order_id}"))
                .header(USER_HEADER, UserId::new().to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_get_nonexistent_order() {
    let h = setup().await;
    let fake_id = uuid::Uuid::new_v4();

    let response = h
        .app
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{fake_id}"))
                .header(USER_HEADER, h.user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_order_id_format() {
    let h = setup().await;

    let response = h
        .app
        .oneshot(
            Request::builder()
                .uri("/orders/not-a-uuid")
                .header(USER_HEADER, h.user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_orders_is_scoped_to_caller() {
    let h = setup().await;
    create_order(&h, 1, "alphapay").await;

    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/orders")
                .header(USER_HEADER, h.user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let orders = json_body(response).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);

    let response = h
        .app
        .oneshot(
            Request::builder()
                .uri("/orders")
                .header(USER_HEADER, h.admin.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let orders = json_body(response).await;
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_cancel_order_releases_stock() {
    let h = setup().await;
    let order = create_order(&h, 2, "alphapay").await;
    let order_id = order["id"].as_str().unwrap();
    assert_eq!(h.state.inventory.available(h.variant).await, 3);

    let response = h
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/orders/{order_id}/cancel"))
                .header(USER_HEADER, h.user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cancelled = json_body(response).await;
    assert_eq!(cancelled["status"], "Cancelled");
    assert_eq!(h.state.inventory.available(h.variant).await, 5);
}

#[tokio::test]
async fn test_status_update_is_admin_only() {
    let h = setup().await;
    let order = create_order(&h, 1, "cash_on_delivery").await;
    let order_id = order["id"].as_str().unwrap();
    initiate_payment(&h, &order).await;

    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/orders/{order_id}/status"))
                .header("content-type", "application/json")
                .header(USER_HEADER, h.user.to_string())
                .body(Body::from(r#"{"status":"shipped"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = h
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/orders/{order_id}/status"))
                .header("content-type", "application/json")
                .header(USER_HEADER, h.admin.to_string())
                .body(Body::from(r#"{"status":"shipped"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let shipped = json_body(response).await;
    assert_eq!(shipped["status"], "Shipped");
}

#[tokio::test]
async fn test_cash_on_delivery_payment_settles_immediately() {
    let h = setup().await;
    let order = create_order(&h, 1, "cash_on_delivery").await;
    let order_id = order["id"].as_str().unwrap();

    let payment = initiate_payment(&h, &order).await;
    assert_eq!(payment["status"], "Success");
    assert!(payment["redirect_url"].is_null());

    let response = h
        .app
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{order_id}"))
                .header(USER_HEADER, h.user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let order = json_body(response).await;
    assert_eq!(order["status"], "Processing");
}

#[tokio::test]
async fn test_payment_amount_mismatch_is_rejected() {
    let h = setup().await;
    let order = create_order(&h, 1, "alphapay").await;
    let order_id = order["id"].as_str().unwrap();

    let response = h
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/orders/{order_id}/payments"))
                .header("content-type", "application/json")
                .header(USER_HEADER, h.user.to_string())
                .body(Body::from(r#"{"amount_cents":1}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_alphapay_callback_flow() {
    let h = setup().await;
    let order = create_order(&h, 1, "alphapay").await;
    let order_id = order["id"].as_str().unwrap();

    let payment = initiate_payment(&h, &order).await;
    assert_eq!(payment["status"], "Pending");
    assert!(
        payment["redirect_url"]
            .as_str()
            .unwrap()
            .contains("/pay?")
    );
    let txn = payment["transaction_id"].as_str().unwrap();

    let config = Config::default();
    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/callbacks/alphapay")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(alpha_callback_form(
                    txn,
                    "SUCCESS",
                    &config.alphapay.secret,
                )))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"success");

    // The payment settled and the order advanced.
    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{order_id}/payments"))
                .header(USER_HEADER, h.user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let history = json_body(response).await;
    assert_eq!(history[0]["status"], "Success");
    assert_eq!(history[0]["gateway_reference"], "ALPHA-777");

    let response = h
        .app
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{order_id}"))
                .header(USER_HEADER, h.user.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let order = json_body(response).await;
    assert_eq!(order["status"], "Processing");
}

#[tokio::test]
async fn test_tampered_callback_is_rejected() {
    let h = setup().await;
    let order = create_order(&h, 1, "alphapay").await;
    let payment = initiate_payment(&h, &order).await;
    let txn = payment["transaction_id"].as_str().unwrap();

    let response = h
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/callbacks/alphapay")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(alpha_callback_form(
                    txn,
                    "SUCCESS",
                    "wrong-secret",
                )))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refund_is_admin_only() {
    let h = setup().await;
    let order = create_order(&h, 1, "alphapay").await;
    let total = order["total_cents"].as_i64().unwrap();
    let payment = initiate_payment(&h, &order).await;
    let txn = payment["transaction_id"].as_str().unwrap();

    let config = Config::default();
    h.app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/callbacks/alphapay")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(alpha_callback_form(
                    txn,
                    "SUCCESS",
                    &config.alphapay.secret,
                )))
                .unwrap(),
        )
        .await
        .unwrap();

    let refund_body = serde_json::json!({ "amount_cents": total }).to_string();
    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/payments/{txn}/refund"))
                .header("content-type", "application/json")
                .header(USER_HEADER, h.user.to_string())
                .body(Body::from(refund_body.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    h.transport
        .set_response(BTreeMap::from([("code".to_string(), "SUCCESS".to_string())]));
    let response = h
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/payments/{txn}/refund"))
                .header("content-type", "application/json")
                .header(USER_HEADER, h.admin.to_string())
                .body(Body::from(refund_body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let refunded = json_body(response).await;
    assert_eq!(refunded["status"], "Refunded");
}

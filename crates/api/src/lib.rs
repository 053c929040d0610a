//! HTTP API server with observability for the settlement core.
//!
//! Provides REST endpoints for order management, payment initiation,
//! gateway callback notifications and refunds, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use gateway::{
    AlphaPayGateway, BetaPayGateway, CashOnDeliveryGateway, GatewayTransport,
    InMemoryGatewayTransport,
};
use metrics_exporter_prometheus::PrometheusHandle;
use settlement::{
    FlatPricing, GatewayRegistry, InMemoryCatalog, InMemoryInventoryLedger, InMemoryOrderStore,
    InMemoryPaymentStore, InMemoryUserDirectory, NotificationReconciler, OrderService,
    PaymentService,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use common::Money;
use config::Config;
use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create))
        .route("/orders", get(routes::orders::list))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/cancel", post(routes::orders::cancel))
        .route("/orders/{id}/status", post(routes::orders::update_status))
        .route("/orders/{id}/payments", post(routes::payments::initiate))
        .route("/orders/{id}/payments", get(routes::payments::history))
        .route(
            "/payments/{transaction_id}/refund",
            post(routes::payments::refund),
        )
        .route("/callbacks/alphapay", post(routes::callbacks::alphapay))
        .route("/callbacks/betapay", post(routes::callbacks::betapay))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state: in-memory stores and ledgers,
/// the three gateway adapters wired to `transport`, and flat pricing from
/// the configuration.
pub fn create_default_state(config: &Config, transport: Arc<dyn GatewayTransport>) -> Arc<AppState> {
    let order_store = InMemoryOrderStore::new();
    let payment_store = InMemoryPaymentStore::new();
    let inventory = InMemoryInventoryLedger::new();
    let catalog = InMemoryCatalog::new();
    let directory = InMemoryUserDirectory::new();

    let registry = Arc::new(
        GatewayRegistry::new()
            .register(Arc::new(CashOnDeliveryGateway::new()))
            .register(Arc::new(AlphaPayGateway::new(
                config
                    .alphapay
                    .to_gateway_config(&config.public_url, "/callbacks/alphapay"),
                Arc::clone(&transport),
            )))
            .register(Arc::new(BetaPayGateway::new(
                config
                    .betapay
                    .to_gateway_config(&config.public_url, "/callbacks/betapay"),
                transport,
            ))),
    );

    let pricing = Arc::new(FlatPricing::new(
        Money::from_cents(config.tax_cents),
        Money::from_cents(config.shipping_fee_cents),
    ));
    let orders = OrderService::new(
        order_store.clone(),
        payment_store.clone(),
        inventory.clone(),
        catalog.clone(),
        directory.clone(),
        pricing,
    );
    let payments = Arc::new(PaymentService::new(
        payment_store,
        order_store,
        directory.clone(),
        Arc::clone(&registry),
    ));
    let reconciler = NotificationReconciler::new(Arc::clone(&payments), registry);

    Arc::new(AppState {
        orders,
        payments,
        reconciler,
        catalog,
        inventory,
        directory,
    })
}

/// Convenience for local runs and tests: default state over the in-memory
/// gateway transport.
pub fn create_in_memory_state(config: &Config) -> (Arc<AppState>, InMemoryGatewayTransport) {
    let transport = InMemoryGatewayTransport::new();
    let state = create_default_state(config, Arc::new(transport.clone()));
    (state, transport)
}

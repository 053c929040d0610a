//! Order placement, queries and lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use common::{OrderId, UserId};
use domain::{Order, OrderStatus, PaymentMethod, ShippingAddress};
use serde::{Deserialize, Serialize};
use settlement::{
    CreateOrderRequest, InMemoryCatalog, InMemoryInventoryLedger, InMemoryOrderStore,
    InMemoryPaymentStore, InMemoryUserDirectory, NotificationReconciler, OrderItemRequest,
    OrderService, PaymentService,
};

use crate::error::ApiError;

/// Concrete service types the server runs with.
pub type Orders = OrderService<
    InMemoryOrderStore,
    InMemoryPaymentStore,
    InMemoryInventoryLedger,
    InMemoryCatalog,
    InMemoryUserDirectory,
>;
pub type Payments = PaymentService<InMemoryPaymentStore, InMemoryOrderStore, InMemoryUserDirectory>;
pub type Reconciler =
    NotificationReconciler<InMemoryPaymentStore, InMemoryOrderStore, InMemoryUserDirectory>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub orders: Orders,
    pub payments: Arc<Payments>,
    pub reconciler: Reconciler,
    pub catalog: InMemoryCatalog,
    pub inventory: InMemoryInventoryLedger,
    pub directory: InMemoryUserDirectory,
}

/// Header identifying the calling user.
pub const USER_HEADER: &str = "x-user-id";

/// Extracts the calling user from the `x-user-id` header.
pub(crate) fn requester(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let value = headers
        .get(USER_HEADER)
        .ok_or_else(|| ApiError::BadRequest(format!("missing {USER_HEADER} header")))?;
    let value = value
        .to_str()
        .map_err(|_| ApiError::BadRequest(format!("invalid {USER_HEADER} header")))?;
    let uuid = uuid::Uuid::parse_str(value)
        .map_err(|e| ApiError::BadRequest(format!("invalid {USER_HEADER} header: {e}")))?;
    Ok(UserId::from_uuid(uuid))
}

pub(crate) fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("invalid order id: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderBody {
    pub items: Vec<OrderItemBody>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

#[derive(Deserialize)]
pub struct OrderItemBody {
    pub product_id: uuid::Uuid,
    pub variant_id: Option<uuid::Uuid>,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateStatusBody {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub payment_method: String,
    pub items: Vec<OrderItemResponse>,
    pub shipping_address: ShippingAddress,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub shipping_fee_cents: i64,
    pub total_cents: i64,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub variant_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

impl OrderResponse {
    pub(crate) fn from_order(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            user_id: order.user_id().to_string(),
            status: order.status().to_string(),
            payment_method: order.payment_method().to_string(),
            items: order
                .items()
                .iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.to_string(),
                    variant_id: item.variant_id.to_string(),
                    product_name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                })
                .collect(),
            shipping_address: order.shipping_address().clone(),
            subtotal_cents: order.subtotal().cents(),
            tax_cents: order.tax().cents(),
            shipping_fee_cents: order.shipping_fee().cents(),
            total_cents: order.total().cents(),
            created_at: order.created_at().to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /orders — place a new order.
#[tracing::instrument(skip(state, headers, body))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateOrderBody>,
) -> Result<(axum::http::StatusCode, Json<OrderResponse>), ApiError> {
    let user_id = requester(&headers)?;
    let request = CreateOrderRequest {
        user_id,
        items: body
            .items
            .into_iter()
            .map(|item| OrderItemRequest {
                product_id: item.product_id.into(),
                variant_id: item.variant_id.map(Into::into),
                quantity: item.quantity,
            })
            .collect(),
        shipping_address: body.shipping_address,
        payment_method: body.payment_method,
    };

    let order = state.orders.create_order(request).await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(OrderResponse::from_order(&order)),
    ))
}

/// GET /orders — list the caller's orders, most recent first.
#[tracing::instrument(skip(state, headers))]
pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let user_id = requester(&headers)?;
    let orders = state.orders.list_orders(user_id).await;
    Ok(Json(orders.iter().map(OrderResponse::from_order).collect()))
}

/// GET /orders/:id — fetch one order. Owner or admin only.
#[tracing::instrument(skip(state, headers))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let user_id = requester(&headers)?;
    let order = state.orders.get_order(parse_order_id(&id)?, user_id).await?;
    Ok(Json(OrderResponse::from_order(&order)))
}

/// POST /orders/:id/cancel — cancel an order and release its stock.
#[tracing::instrument(skip(state, headers))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let user_id = requester(&headers)?;
    let order = state
        .orders
        .cancel_order(parse_order_id(&id)?, user_id)
        .await?;
    Ok(Json(OrderResponse::from_order(&order)))
}

/// POST /orders/:id/status — admin-driven fulfillment transition.
#[tracing::instrument(skip(state, headers, body))]
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<OrderResponse>, ApiError> {
    let user_id = requester(&headers)?;
    let next = OrderStatus::parse(&body.status)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown order status '{}'", body.status)))?;
    let order = state
        .orders
        .update_status(parse_order_id(&id)?, user_id, next)
        .await?;
    Ok(Json(OrderResponse::from_order(&order)))
}

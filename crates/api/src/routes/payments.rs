//! Payment initiation, history and refund endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use common::Money;
use domain::Payment;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::orders::{AppState, parse_order_id, requester};

// -- Request types --

#[derive(Deserialize)]
pub struct InitiatePaymentBody {
    /// Restated order total; rejected if it disagrees with the order.
    pub amount_cents: i64,
}

#[derive(Deserialize)]
pub struct RefundBody {
    pub amount_cents: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct PaymentResponse {
    pub transaction_id: String,
    pub order_id: String,
    pub method: String,
    pub status: String,
    pub amount_cents: i64,
    pub gateway_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub processed_at: Option<String>,
}

#[derive(Serialize)]
pub struct InitiatedPaymentResponse {
    #[serde(flatten)]
    pub payment: PaymentResponse,
    pub redirect_url: Option<String>,
    pub qr_payload: Option<String>,
}

impl PaymentResponse {
    fn from_payment(payment: &Payment) -> Self {
        Self {
            transaction_id: payment.transaction_id().to_string(),
            order_id: payment.order_id().to_string(),
            method: payment.method().to_string(),
            status: payment.status().to_string(),
            amount_cents: payment.amount().cents(),
            gateway_reference: payment.gateway_reference().map(String::from),
            failure_reason: payment.failure_reason().map(String::from),
            processed_at: payment.processed_at().map(|t| t.to_rfc3339()),
        }
    }
}

// -- Handlers --

/// POST /orders/:id/payments — start a payment attempt for the order.
#[tracing::instrument(skip(state, headers, body))]
pub async fn initiate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<InitiatePaymentBody>,
) -> Result<(axum::http::StatusCode, Json<InitiatedPaymentResponse>), ApiError> {
    let user_id = requester(&headers)?;
    let initiated = state
        .payments
        .initiate_payment(
            parse_order_id(&id)?,
            user_id,
            Money::from_cents(body.amount_cents),
        )
        .await?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(InitiatedPaymentResponse {
            payment: PaymentResponse::from_payment(&initiated.payment),
            redirect_url: initiated.redirect_url,
            qr_payload: initiated.qr_payload,
        }),
    ))
}

/// GET /orders/:id/payments — all payment attempts for the order.
#[tracing::instrument(skip(state, headers))]
pub async fn history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let user_id = requester(&headers)?;
    let payments = state
        .payments
        .payment_history(parse_order_id(&id)?, user_id)
        .await?;
    Ok(Json(
        payments.iter().map(PaymentResponse::from_payment).collect(),
    ))
}

/// POST /payments/:transaction_id/refund — refund a successful payment.
#[tracing::instrument(skip(state, headers, body))]
pub async fn refund(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(transaction_id): Path<String>,
    Json(body): Json<RefundBody>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let user_id = requester(&headers)?;
    let payment = state
        .payments
        .refund_payment(
            &transaction_id,
            user_id,
            Money::from_cents(body.amount_cents),
        )
        .await?;
    Ok(Json(PaymentResponse::from_payment(&payment)))
}

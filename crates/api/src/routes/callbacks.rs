//! Gateway notification endpoints.
//!
//! Gateways post form-encoded notifications here and retry until they see
//! the gateway-specific acknowledgement body with a 2xx status. Any error
//! response therefore means "deliver again later".

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Form;
use axum::extract::State;
use domain::PaymentMethod;

use crate::error::ApiError;
use crate::routes::orders::AppState;

/// POST /callbacks/alphapay — AlphaPay asynchronous notification.
#[tracing::instrument(skip(state, fields))]
pub async fn alphapay(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<BTreeMap<String, String>>,
) -> Result<&'static str, ApiError> {
    let ack = state
        .reconciler
        .handle(PaymentMethod::AlphaPay, &fields)
        .await?;
    Ok(ack.body)
}

/// POST /callbacks/betapay — BetaPay asynchronous notification.
#[tracing::instrument(skip(state, fields))]
pub async fn betapay(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<BTreeMap<String, String>>,
) -> Result<&'static str, ApiError> {
    let ack = state
        .reconciler
        .handle(PaymentMethod::BetaPay, &fields)
        .await?;
    Ok(ack.body)
}

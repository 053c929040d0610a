//! Cash-on-delivery: the degenerate adapter.

use std::collections::BTreeMap;

use async_trait::async_trait;
use common::Money;
use domain::PaymentMethod;

use crate::adapter::{GatewayInitiation, InitiationRequest, PaymentGateway, VerifiedCallback};
use crate::error::GatewayError;

/// Cash-on-delivery adapter.
///
/// Initiation always succeeds with no redirect target, callbacks never
/// happen, and refunds are not supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct CashOnDeliveryGateway;

impl CashOnDeliveryGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentGateway for CashOnDeliveryGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::CashOnDelivery
    }

    async fn initiate(
        &self,
        _request: &InitiationRequest,
    ) -> Result<GatewayInitiation, GatewayError> {
        Ok(GatewayInitiation::default())
    }

    fn verify_callback(
        &self,
        _fields: &BTreeMap<String, String>,
    ) -> Result<VerifiedCallback, GatewayError> {
        Err(GatewayError::Unsupported(
            "cash on delivery has no gateway callbacks",
        ))
    }

    async fn refund(&self, _gateway_reference: &str, _amount: Money) -> Result<(), GatewayError> {
        Err(GatewayError::Unsupported(
            "cash on delivery payments cannot be refunded through a gateway",
        ))
    }

    fn ack(&self) -> &'static str {
        "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{OrderId, TransactionId};

    #[tokio::test]
    async fn test_initiate_succeeds_with_no_redirect() {
        let gateway = CashOnDeliveryGateway::new();
        let request = InitiationRequest {
            transaction_id: TransactionId::generate(),
            order_id: OrderId::new(),
            amount: Money::from_cents(2600),
        };

        let initiation = gateway.initiate(&request).await.unwrap();
        assert!(initiation.redirect_url.is_none());
        assert!(initiation.qr_payload.is_none());
        assert!(initiation.gateway_reference.is_none());
    }

    #[test]
    fn test_callbacks_unsupported() {
        let gateway = CashOnDeliveryGateway::new();
        assert!(matches!(
            gateway.verify_callback(&BTreeMap::new()),
            Err(GatewayError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_refund_unsupported() {
        let gateway = CashOnDeliveryGateway::new();
        assert!(matches!(
            gateway.refund("n/a", Money::from_cents(1)).await,
            Err(GatewayError::Unsupported(_))
        ));
    }
}

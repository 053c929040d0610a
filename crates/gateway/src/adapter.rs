//! The capability contract every payment method implements.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use common::{Money, OrderId, TransactionId};
use domain::{PaymentMethod, PaymentOutcome};

use crate::error::GatewayError;

/// Static configuration for one gateway integration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Partner/merchant identifier assigned by the gateway.
    pub merchant_id: String,

    /// Shared signing secret.
    pub secret: String,

    /// Base endpoint for outbound calls and redirect targets.
    pub endpoint: String,

    /// Where the customer's browser lands after paying.
    pub return_url: String,

    /// Where the gateway posts callback notifications.
    pub notify_url: String,

    /// Upper bound on outbound gateway calls.
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(
        merchant_id: impl Into<String>,
        secret: impl Into<String>,
        endpoint: impl Into<String>,
        return_url: impl Into<String>,
        notify_url: impl Into<String>,
    ) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            secret: secret.into(),
            endpoint: endpoint.into(),
            return_url: return_url.into(),
            notify_url: notify_url.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// What the settlement layer hands an adapter to start a payment.
#[derive(Debug, Clone)]
pub struct InitiationRequest {
    /// Merchant-generated unique identifier, embedded in the gateway
    /// request and echoed back in callbacks.
    pub transaction_id: TransactionId,

    /// The order being paid, for display on the gateway side.
    pub order_id: OrderId,

    /// Amount to charge. Converted to integer minor units on the wire.
    pub amount: Money,
}

/// What initiation produces: a redirect target, a QR payload, or neither
/// (immediate methods such as cash-on-delivery).
#[derive(Debug, Clone, Default)]
pub struct GatewayInitiation {
    pub redirect_url: Option<String>,
    pub qr_payload: Option<String>,
    pub gateway_reference: Option<String>,
}

/// A callback notification that passed signature verification.
#[derive(Debug, Clone)]
pub struct VerifiedCallback {
    /// The merchant transaction identifier embedded in the original
    /// request.
    pub transaction_id: TransactionId,

    /// The mapped outcome.
    pub outcome: PaymentOutcome,

    /// The gateway's own transaction identifier, if reported.
    pub gateway_reference: Option<String>,

    /// Failure detail reported by the gateway, if any.
    pub failure_reason: Option<String>,
}

/// Common capability contract, implemented once per payment method.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// The payment method this adapter serves.
    fn method(&self) -> PaymentMethod;

    /// Builds the gateway-specific signed request and either calls the
    /// gateway or returns a client-redirect target.
    async fn initiate(&self, request: &InitiationRequest)
    -> Result<GatewayInitiation, GatewayError>;

    /// Validates the inbound signature and maps the gateway's result code.
    ///
    /// `fields` must carry the callback parameters byte-for-byte as they
    /// were posted; any transformation of values breaks the signature.
    fn verify_callback(
        &self,
        fields: &BTreeMap<String, String>,
    ) -> Result<VerifiedCallback, GatewayError>;

    /// Requests a refund against the gateway's transaction reference.
    async fn refund(&self, gateway_reference: &str, amount: Money) -> Result<(), GatewayError>;

    /// The response body this gateway expects as "received, do not retry".
    fn ack(&self) -> &'static str;
}

pub(crate) fn require<'a>(
    fields: &'a BTreeMap<String, String>,
    key: &str,
) -> Result<&'a str, GatewayError> {
    fields
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| GatewayError::MalformedCallback(format!("missing field '{key}'")))
}

//! AlphaPay adapter: browser-redirect flow, HMAC-SHA256 signatures.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::Money;
use domain::{PaymentMethod, PaymentOutcome};

use crate::adapter::{
    GatewayConfig, GatewayInitiation, InitiationRequest, PaymentGateway, VerifiedCallback, require,
};
use crate::error::GatewayError;
use crate::sign::{self, SignatureAlgorithm};
use crate::transport::GatewayTransport;

const ALGORITHM: SignatureAlgorithm = SignatureAlgorithm::HmacSha256;

/// Field carrying the signature in AlphaPay callbacks. Excluded from the
/// canonical string.
const SIGN_FIELD: &str = "sign";

/// AlphaPay gateway adapter.
///
/// Initiation is local: the signed request is encoded into a redirect URL
/// the customer's browser follows. Refunds are server-to-server.
pub struct AlphaPayGateway {
    config: GatewayConfig,
    transport: Arc<dyn GatewayTransport>,
}

impl AlphaPayGateway {
    pub fn new(config: GatewayConfig, transport: Arc<dyn GatewayTransport>) -> Self {
        Self { config, transport }
    }

    fn signed_query(&self, params: &BTreeMap<String, String>) -> String {
        let pairs = params.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        let signature = sign::sign(pairs.clone(), &self.config.secret, ALGORITHM);
        format!("{}&{SIGN_FIELD}={signature}", sign::canonical_query(pairs))
    }
}

#[async_trait]
impl PaymentGateway for AlphaPayGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::AlphaPay
    }

    #[tracing::instrument(skip(self, request), fields(transaction_id = %request.transaction_id))]
    async fn initiate(
        &self,
        request: &InitiationRequest,
    ) -> Result<GatewayInitiation, GatewayError> {
        let params = BTreeMap::from([
            ("merchant_id".to_string(), self.config.merchant_id.clone()),
            (
                "out_trade_no".to_string(),
                request.transaction_id.to_string(),
            ),
            ("subject".to_string(), format!("order {}", request.order_id)),
            (
                "total_fee".to_string(),
                request.amount.minor_units().to_string(),
            ),
            ("return_url".to_string(), self.config.return_url.clone()),
            ("notify_url".to_string(), self.config.notify_url.clone()),
        ]);

        let redirect_url = format!("{}/pay?{}", self.config.endpoint, self.signed_query(&params));
        Ok(GatewayInitiation {
            redirect_url: Some(redirect_url),
            qr_payload: None,
            gateway_reference: None,
        })
    }

    fn verify_callback(
        &self,
        fields: &BTreeMap<String, String>,
    ) -> Result<VerifiedCallback, GatewayError> {
        let provided = require(fields, SIGN_FIELD)?;
        let unsigned = fields
            .iter()
            .filter(|(k, _)| k.as_str() != SIGN_FIELD)
            .map(|(k, v)| (k.as_str(), v.as_str()));

        if !sign::verify(unsigned, provided, &self.config.secret, ALGORITHM) {
            return Err(GatewayError::InvalidSignature);
        }

        let outcome = match require(fields, "trade_status")? {
            "SUCCESS" => PaymentOutcome::Success,
            "FAILED" => PaymentOutcome::Failed,
            "CANCELLED" => PaymentOutcome::Cancelled,
            other => {
                return Err(GatewayError::MalformedCallback(format!(
                    "unknown trade_status '{other}'"
                )));
            }
        };

        Ok(VerifiedCallback {
            transaction_id: require(fields, "out_trade_no")?.into(),
            outcome,
            gateway_reference: fields.get("trade_no").cloned(),
            failure_reason: fields.get("error_msg").cloned(),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn refund(&self, gateway_reference: &str, amount: Money) -> Result<(), GatewayError> {
        let mut params = BTreeMap::from([
            ("merchant_id".to_string(), self.config.merchant_id.clone()),
            ("trade_no".to_string(), gateway_reference.to_string()),
            ("refund_fee".to_string(), amount.minor_units().to_string()),
        ]);
        let pairs = params.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        let signature = sign::sign(pairs, &self.config.secret, ALGORITHM);
        params.insert(SIGN_FIELD.to_string(), signature);

        let endpoint = format!("{}/refund", self.config.endpoint);
        let response = tokio::time::timeout(
            self.config.timeout,
            self.transport.post_form(&endpoint, params),
        )
        .await
        .map_err(|_| GatewayError::Unavailable("refund call timed out".to_string()))??;

        match response.get("code").map(String::as_str) {
            Some("SUCCESS") => Ok(()),
            _ => {
                let message = response
                    .get("message")
                    .cloned()
                    .unwrap_or_else(|| "refund refused".to_string());
                Err(GatewayError::RefundRejected(message))
            }
        }
    }

    fn ack(&self) -> &'static str {
        "success"
    }
}

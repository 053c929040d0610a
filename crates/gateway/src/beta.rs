//! BetaPay adapter: QR pre-creation flow, HMAC-SHA512 signatures.

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

const ALGORITHM: SignatureAlgorithm = SignatureAlgorithm::HmacSha512;

/// Field carrying the signature in BetaPay messages. Excluded from the
/// canonical string. BetaPay compares signatures case-insensitively.
const SIGN_FIELD: &str = "signature";

/// BetaPay gateway adapter.
///
/// Initiation is server-to-server: the gateway pre-creates the payment and
/// returns a QR payload for the customer to scan, so the initiate call is
/// bounded by the configured timeout.
pub struct BetaPayGateway {
    config: GatewayConfig,
    transport: Arc<dyn GatewayTransport>,
}

impl BetaPayGateway {
    pub fn new(config: GatewayConfig, transport: Arc<dyn GatewayTransport>) -> Self {
        Self { config, transport }
    }

    fn sign_params(&self, params: &mut BTreeMap<String, String>) {
        let pairs = params.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        let signature = sign::sign(pairs, &self.config.secret, ALGORITHM);
        params.insert(SIGN_FIELD.to_string(), signature);
    }

    async fn post_bounded(
        &self,
        path: &str,
        params: BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, GatewayError> {
        let endpoint = format!("{}{path}", self.config.endpoint);
        tokio::time::timeout(
            self.config.timeout,
            self.transport.post_form(&endpoint, params),
        )
        .await
        .map_err(|_| GatewayError::Unavailable(format!("call to {path} timed out")))?
    }
}

#[async_trait]
impl PaymentGateway for BetaPayGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::BetaPay
    }

    #[tracing::instrument(skip(self, request), fields(transaction_id = %request.transaction_id))]
    async fn initiate(
        &self,
        request: &InitiationRequest,
    ) -> Result<GatewayInitiation, GatewayError> {
        let mut params = BTreeMap::from([
            ("mch_id".to_string(), self.config.merchant_id.clone()),
            ("order_ref".to_string(), request.transaction_id.to_string()),
            (
                "amount".to_string(),
                request.amount.minor_units().to_string(),
            ),
            ("notify_url".to_string(), self.config.notify_url.clone()),
            ("return_url".to_string(), self.config.return_url.clone()),
        ]);
        self.sign_params(&mut params);

        let response = self.post_bounded("/order/create", params).await?;
        match response.get("result_code").map(String::as_str) {
            Some("OK") => Ok(GatewayInitiation {
                redirect_url: None,
                qr_payload: response.get("qr_url").cloned(),
                gateway_reference: response.get("txn_ref").cloned(),
            }),
            _ => {
                let reason = response
                    .get("reason")
                    .cloned()
                    .unwrap_or_else(|| "pre-creation refused".to_string());
                Err(GatewayError::Unavailable(reason))
            }
        }
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

        let outcome = match require(fields, "result_code")? {
            "PAID" => PaymentOutcome::Success,
            "DECLINED" => PaymentOutcome::Failed,
            "VOIDED" => PaymentOutcome::Cancelled,
            other => {
                return Err(GatewayError::MalformedCallback(format!(
                    "unknown result_code '{other}'"
                )));
            }
        };

        Ok(VerifiedCallback {
            transaction_id: require(fields, "order_ref")?.into(),
            outcome,
            gateway_reference: fields.get("txn_ref").cloned(),
            failure_reason: fields.get("reason").cloned(),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn refund(&self, gateway_reference: &str, amount: Money) -> Result<(), GatewayError> {
        let mut params = BTreeMap::from([
            ("mch_id".to_string(), self.config.merchant_id.clone()),
            ("txn_ref".to_string(), gateway_reference.to_string()),
            (
                "refund_amount".to_string(),
                amount.minor_units().to_string(),
            ),
        ]);
        self.sign_params(&mut params);

        let response = self.post_bounded("/refund", params).await?;
        match response.get("result_code").map(String::as_str) {
            Some("REFUNDED") => Ok(()),
            Some("REJECTED") => {
                let reason = response
                    .get("reason")
                    .cloned()
                    .unwrap_or_else(|| "refund rejected".to_string());
                Err(GatewayError::RefundRejected(reason))
            }
            other => Err(GatewayError::Unavailable(format!(
                "unexpected refund result {other:?}"
            ))),
        }
    }

    fn ack(&self) -> &'static str {
        r#"{"code":"RECEIVED"}"#
    }
}

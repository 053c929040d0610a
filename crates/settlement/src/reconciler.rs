//! Inbound gateway notification handling.

use std::collections::BTreeMap;
use std::sync::Arc;

use domain::PaymentMethod;
use metrics::counter;
use tracing::{instrument, warn};

use crate::directory::UserDirectory;
use crate::error::Result;
use crate::payments::PaymentService;
use crate::registry::GatewayRegistry;
use crate::store::{OrderStore, PaymentStore};

/// What to answer the gateway once a notification is fully recorded.
/// Anything other than this body (or a non-2xx status) makes the gateway
/// retry the delivery.
#[derive(Debug, Clone, Copy)]
pub struct CallbackAck {
    pub body: &'static str,
}

/// Verifies and applies asynchronous gateway notifications.
///
/// The flow is verify-then-apply: the adapter authenticates the payload
/// and maps its result code, then the payment service records the outcome
/// idempotently. Only a fully recorded notification is acknowledged.
pub struct NotificationReconciler<P, O, U> {
    payments: Arc<PaymentService<P, O, U>>,
    gateways: Arc<GatewayRegistry>,
}

impl<P, O, U> NotificationReconciler<P, O, U>
where
    P: PaymentStore,
    O: OrderStore,
    U: UserDirectory,
{
    pub fn new(payments: Arc<PaymentService<P, O, U>>, gateways: Arc<GatewayRegistry>) -> Self {
        Self { payments, gateways }
    }

    /// Handles one posted notification for `method`.
    ///
    /// `fields` must be the posted form parameters verbatim; the adapter
    /// recomputes the signature over them.
    #[instrument(skip(self, fields))]
    pub async fn handle(
        &self,
        method: PaymentMethod,
        fields: &BTreeMap<String, String>,
    ) -> Result<CallbackAck> {
        let gateway = self.gateways.select(method)?;

        let verified = match gateway.verify_callback(fields) {
            Ok(verified) => verified,
            Err(err) => {
                warn!(method = method.as_str(), error = %err, "callback rejected");
                counter!("payment_notifications_rejected_total", "method" => method.as_str())
                    .increment(1);
                return Err(err.into());
            }
        };

        // Kept verbatim on the payment for audit.
        let raw = serde_json::to_string(fields).ok();
        self.payments
            .apply_gateway_outcome(method, &verified, raw)
            .await?;

        Ok(CallbackAck {
            body: gateway.ack(),
        })
    }
}

impl<P, O, U> std::fmt::Debug for NotificationReconciler<P, O, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationReconciler").finish_non_exhaustive()
    }
}

//! Payment initiation, gateway outcome application and refunds.

use std::sync::Arc;

use common::{Money, OrderId, UserId};
use domain::{DomainError, OutcomeApplied, Payment, PaymentMethod, PaymentOutcome};
use gateway::{InitiationRequest, VerifiedCallback};
use metrics::counter;
use tracing::{error, info, instrument};

use crate::directory::UserDirectory;
use crate::error::{Result, SettlementError};
use crate::registry::GatewayRegistry;
use crate::store::{OrderStore, PaymentStore};

/// A freshly initiated payment plus where to send the customer next.
#[derive(Debug, Clone)]
pub struct InitiatedPayment {
    pub payment: Payment,
    pub redirect_url: Option<String>,
    pub qr_payload: Option<String>,
}

/// Orchestrates the payment side of settlement.
pub struct PaymentService<P, O, U> {
    payments: P,
    orders: O,
    directory: U,
    gateways: Arc<GatewayRegistry>,
}

impl<P, O, U> PaymentService<P, O, U>
where
    P: PaymentStore,
    O: OrderStore,
    U: UserDirectory,
{
    pub fn new(payments: P, orders: O, directory: U, gateways: Arc<GatewayRegistry>) -> Self {
        Self {
            payments,
            orders,
            directory,
            gateways,
        }
    }

    /// Starts a payment attempt for a pending order.
    ///
    /// The charged amount comes from the order; the caller restates it and
    /// any mismatch is rejected before the gateway is involved. The pending
    /// payment is persisted before the outbound call, so a callback that
    /// races the initiation response still finds its transaction.
    ///
    /// Cash on delivery settles immediately: the payment is recorded as
    /// successful and the order advances to `Processing` with no gateway
    /// round-trip.
    #[instrument(skip(self))]
    pub async fn initiate_payment(
        &self,
        order_id: OrderId,
        requester: UserId,
        amount: Money,
    ) -> Result<InitiatedPayment> {
        let order = self
            .orders
            .get(order_id)
            .await
            .ok_or(SettlementError::OrderNotFound(order_id))?;
        if order.user_id() != requester && !self.directory.is_admin(requester).await {
            return Err(SettlementError::Forbidden { user_id: requester });
        }
        if order.status() != domain::OrderStatus::Pending {
            return Err(DomainError::InvalidRequest(format!(
                "payment can only be initiated for a pending order, not {}",
                order.status()
            ))
            .into());
        }
        if amount != order.total() {
            return Err(DomainError::AmountMismatch {
                expected: order.total(),
                actual: amount,
            }
            .into());
        }
        let method = order.payment_method();
        let gateway = self.gateways.select(method)?;
        let payment = Payment::new(order_id, method, order.total());
        let transaction_id = payment.transaction_id().clone();
        // Check-and-insert is one store operation: two racing initiations
        // for the same order cannot both open an attempt.
        self.payments.insert_unless_active(payment.clone()).await?;
        counter!("payments_initiated_total", "method" => method.as_str()).increment(1);

        if method.is_cash_on_delivery() {
            let payment = self
                .payments
                .update_by_transaction(transaction_id.as_str(), &mut |p| {
                    p.apply_outcome(PaymentOutcome::Success, None, None, None)
                        .map(|_| ())
                        .map_err(Into::into)
                })
                .await?;
            self.orders
                .update(order_id, &mut |o| o.confirm_payment().map_err(Into::into))
                .await?;
            info!(order_id = %order_id, "cash-on-delivery payment recorded");
            return Ok(InitiatedPayment {
                payment,
                redirect_url: None,
                qr_payload: None,
            });
        }

        let initiation = match gateway
            .initiate(&InitiationRequest {
                transaction_id: transaction_id.clone(),
                order_id,
                amount: order.total(),
            })
            .await
        {
            Ok(initiation) => initiation,
            Err(err) => {
                // The payment stays Pending: the gateway may still have
                // accepted the request, so a late callback must find it.
                error!(transaction_id = %transaction_id, error = %err, "gateway initiation failed");
                counter!("payments_initiation_errors_total", "method" => method.as_str())
                    .increment(1);
                return Err(err.into());
            }
        };

        let payment = match &initiation.gateway_reference {
            Some(reference) => {
                let reference = reference.clone();
                self.payments
                    .update_by_transaction(transaction_id.as_str(), &mut |p| {
                        p.set_gateway_reference(reference.clone());
                        Ok(())
                    })
                    .await?
            }
            None => payment,
        };

        info!(transaction_id = %transaction_id, order_id = %order_id, "payment initiated");
        Ok(InitiatedPayment {
            payment,
            redirect_url: initiation.redirect_url,
            qr_payload: initiation.qr_payload,
        })
    }

    /// Records a verified gateway notification against its payment.
    ///
    /// Re-delivery of an outcome already on record is a no-op; a
    /// conflicting outcome is rejected and logged without touching state.
    /// A successful outcome also advances the order to `Processing`; if
    /// the order can no longer accept that transition the mismatch is
    /// logged for reconciliation but the notification itself still
    /// succeeds, so the gateway stops retrying.
    #[instrument(skip(self, callback, raw_response), fields(transaction_id = %callback.transaction_id))]
    pub async fn apply_gateway_outcome(
        &self,
        method: PaymentMethod,
        callback: &VerifiedCallback,
        raw_response: Option<String>,
    ) -> Result<Payment> {
        let mut applied = OutcomeApplied::AlreadyRecorded;
        let result = self
            .payments
            .update_by_transaction(callback.transaction_id.as_str(), &mut |p| {
                if p.method() != method {
                    return Err(SettlementError::UnrecognizedTransaction {
                        transaction_id: callback.transaction_id.to_string(),
                    });
                }
                applied = p.apply_outcome(
                    callback.outcome,
                    callback.gateway_reference.clone(),
                    raw_response.clone(),
                    callback.failure_reason.clone(),
                )?;
                Ok(())
            })
            .await;

        let payment = match result {
            Ok(payment) => payment,
            Err(err) => {
                if matches!(
                    err,
                    SettlementError::Domain(DomainError::ConflictingNotification { .. })
                ) {
                    error!(
                        transaction_id = %callback.transaction_id,
                        reported = ?callback.outcome,
                        "conflicting gateway notification rejected"
                    );
                    counter!("payment_notifications_conflicting_total").increment(1);
                }
                return Err(err);
            }
        };

        if applied == OutcomeApplied::Applied {
            counter!(
                "payment_notifications_applied_total",
                "outcome" => outcome_label(callback.outcome)
            )
            .increment(1);
            if callback.outcome == PaymentOutcome::Success {
                let confirmed = self
                    .orders
                    .update(payment.order_id(), &mut |o| {
                        o.confirm_payment().map_err(Into::into)
                    })
                    .await;
                if let Err(err) = confirmed {
                    error!(
                        order_id = %payment.order_id(),
                        error = %err,
                        "paid order could not advance to processing"
                    );
                }
            }
        }

        Ok(payment)
    }

    /// Refunds a successful payment in full or in part. Administrators
    /// only.
    ///
    /// The payment moves `Success -> Refunded` inside the store's critical
    /// section before the gateway is called, so concurrent refund requests
    /// for the same payment cannot both dispatch. If the gateway declines
    /// or is unreachable the payment returns to `Success` for retry.
    #[instrument(skip(self))]
    pub async fn refund_payment(
        &self,
        transaction_id: &str,
        requester: UserId,
        amount: Money,
    ) -> Result<Payment> {
        if !self.directory.is_admin(requester).await {
            return Err(SettlementError::Forbidden { user_id: requester });
        }
        let claimed = self
            .payments
            .update_by_transaction(transaction_id, &mut |p| {
                if !amount.is_positive() || amount > p.amount() {
                    return Err(DomainError::InvalidRequest(format!(
                        "refund amount {} must be positive and at most {}",
                        amount,
                        p.amount()
                    ))
                    .into());
                }
                p.mark_refunded().map_err(Into::into)
            })
            .await?;

        let dispatched = match self.gateways.select(claimed.method()) {
            Ok(gateway) => {
                gateway
                    .refund(claimed.gateway_reference().unwrap_or_default(), amount)
                    .await
            }
            Err(err) => Err(err),
        };
        if let Err(err) = dispatched {
            error!(transaction_id = %transaction_id, error = %err, "refund dispatch failed");
            self.payments
                .update_by_transaction(transaction_id, &mut |p| {
                    p.revert_refund().map_err(Into::into)
                })
                .await?;
            return Err(err.into());
        }

        info!(transaction_id = %transaction_id, amount = %amount, "payment refunded");
        counter!("payments_refunded_total").increment(1);
        Ok(claimed)
    }

    /// All payment attempts for an order, oldest first. Visible to the
    /// order's owner and to administrators.
    pub async fn payment_history(
        &self,
        order_id: OrderId,
        requester: UserId,
    ) -> Result<Vec<Payment>> {
        let order = self
            .orders
            .get(order_id)
            .await
            .ok_or(SettlementError::OrderNotFound(order_id))?;
        if order.user_id() != requester && !self.directory.is_admin(requester).await {
            return Err(SettlementError::Forbidden { user_id: requester });
        }
        Ok(self.payments.list_for_order(order_id).await)
    }
}

fn outcome_label(outcome: PaymentOutcome) -> &'static str {
    match outcome {
        PaymentOutcome::Success => "success",
        PaymentOutcome::Failed => "failed",
        PaymentOutcome::Cancelled => "cancelled",
    }
}

impl<P, O, U> std::fmt::Debug for PaymentService<P, O, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentService").finish_non_exhaustive()
    }
}

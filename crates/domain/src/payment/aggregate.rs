//! Payment aggregate implementation.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, PaymentId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::method::PaymentMethod;

use super::{PaymentOutcome, PaymentStatus};

/// Upper bound on the stored verbatim gateway response, for audit.
const GATEWAY_RESPONSE_MAX_BYTES: usize = 4096;

/// What [`Payment::apply_outcome`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeApplied {
    /// The outcome moved the payment out of `Pending`.
    Applied,

    /// The payment was already terminal with the same outcome; nothing
    /// changed. Safe re-delivery.
    AlreadyRecorded,
}

/// Payment aggregate, many-to-one with its order.
///
/// The amount is immutable after creation and must equal the order total
/// at initiation time (enforced by the settlement layer, which can see
/// the order).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    id: PaymentId,
    order_id: OrderId,
    transaction_id: TransactionId,
    method: PaymentMethod,
    status: PaymentStatus,
    amount: Money,
    gateway_reference: Option<String>,
    gateway_response: Option<String>,
    failure_reason: Option<String>,
    processed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a new pending payment attempt for an order.
    pub fn new(order_id: OrderId, method: PaymentMethod, amount: Money) -> Self {
        let now = Utc::now();
        Self {
            id: PaymentId::new(),
            order_id,
            transaction_id: TransactionId::generate(),
            method,
            status: PaymentStatus::Pending,
            amount,
            gateway_reference: None,
            gateway_response: None,
            failure_reason: None,
            processed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Records the gateway reference returned by a successful initiation.
    pub fn set_gateway_reference(&mut self, reference: impl Into<String>) {
        self.gateway_reference = Some(reference.into());
        self.updated_at = Utc::now();
    }

    /// Applies a gateway-reported outcome.
    ///
    /// Idempotent with respect to re-delivery: if the payment is already
    /// terminal with the status the outcome maps to, this is a no-op
    /// returning [`OutcomeApplied::AlreadyRecorded`]. A terminal payment
    /// receiving a *different* outcome fails with
    /// [`DomainError::ConflictingNotification`]; recorded state is never
    /// silently overwritten.
    pub fn apply_outcome(
        &mut self,
        outcome: PaymentOutcome,
        gateway_reference: Option<String>,
        raw_response: Option<String>,
        failure_reason: Option<String>,
    ) -> Result<OutcomeApplied, DomainError> {
        let reported = outcome.as_status();

        if self.status.is_terminal() {
            if self.status == reported {
                return Ok(OutcomeApplied::AlreadyRecorded);
            }
            return Err(DomainError::ConflictingNotification {
                transaction_id: self.transaction_id.to_string(),
                recorded: self.status,
                reported,
            });
        }

        // Pending -> {Success, Failed, Cancelled} is always in the table,
        // but keep every transition behind the one validation point.
        if !self.status.can_transition_to(reported) {
            return Err(self.invalid_transition(reported));
        }

        self.status = reported;
        if let Some(reference) = gateway_reference {
            self.gateway_reference = Some(reference);
        }
        self.gateway_response = raw_response.map(truncate_response);
        self.failure_reason = failure_reason;
        let now = Utc::now();
        self.processed_at = Some(now);
        self.updated_at = now;
        Ok(OutcomeApplied::Applied)
    }

    /// Moves a successful payment to `Refunded` after the gateway accepted
    /// the refund.
    pub fn mark_refunded(&mut self) -> Result<(), DomainError> {
        if !self.status.can_transition_to(PaymentStatus::Refunded) {
            return Err(self.invalid_transition(PaymentStatus::Refunded));
        }
        self.status = PaymentStatus::Refunded;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Returns a refunded payment to `Success` after the gateway declined
    /// the refund or could not be reached, so it can be retried.
    pub fn revert_refund(&mut self) -> Result<(), DomainError> {
        if self.status != PaymentStatus::Refunded {
            return Err(self.invalid_transition(PaymentStatus::Success));
        }
        self.status = PaymentStatus::Success;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn invalid_transition(&self, to: PaymentStatus) -> DomainError {
        DomainError::InvalidStateTransition {
            entity: "payment",
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}

fn truncate_response(mut raw: String) -> String {
    if raw.len() > GATEWAY_RESPONSE_MAX_BYTES {
        let mut end = GATEWAY_RESPONSE_MAX_BYTES;
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        raw.truncate(end);
    }
    raw
}

// Query methods
impl Payment {
    pub fn id(&self) -> PaymentId {
        self.id
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn gateway_reference(&self) -> Option<&str> {
        self.gateway_reference.as_deref()
    }

    pub fn gateway_response(&self) -> Option<&str> {
        self.gateway_response.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns true once no further gateway notification is accepted.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

//! Payment status state machine.

use serde::{Deserialize, Serialize};

/// The status of a payment attempt.
///
/// Transitions:
/// ```text
/// Pending ──┬──► Success ──► Refunded
///           ├──► Failed
///           └──► Cancelled
/// ```
///
/// Everything except `Pending` is terminal with respect to forward
/// processing: no further status-changing notification is accepted once
/// terminal. `Success -> Refunded` is the single allowed post-terminal edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    /// Awaiting a gateway outcome.
    #[default]
    Pending,

    /// Gateway confirmed the charge.
    Success,

    /// Gateway declined the charge.
    Failed,

    /// Customer abandoned or voided the payment.
    Cancelled,

    /// A successful charge was refunded.
    Refunded,
}

impl PaymentStatus {
    /// The single transition table for payments.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Success) | (Pending, Failed) | (Pending, Cancelled) | (Success, Refunded)
        )
    }

    /// Returns true once no further gateway notification is accepted.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Success => "Success",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Cancelled => "Cancelled",
            PaymentStatus::Refunded => "Refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The outcome a gateway reports for a pending payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Success,
    Failed,
    Cancelled,
}

impl PaymentOutcome {
    /// The payment status this outcome drives a pending payment to.
    pub fn as_status(&self) -> PaymentStatus {
        match self {
            PaymentOutcome::Success => PaymentStatus::Success,
            PaymentOutcome::Failed => PaymentStatus::Failed,
            PaymentOutcome::Cancelled => PaymentStatus::Cancelled,
        }
    }
}

impl std::fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_status())
    }
}

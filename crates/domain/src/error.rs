//! Domain error types.

use common::{Money, MoneyError};
use thiserror::Error;

use crate::payment::PaymentStatus;

/// Errors raised by aggregate validation and state machines.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed business input (caller error).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A status transition not present in the transition tables.
    #[error("invalid {entity} state transition: {from} -> {to}")]
    InvalidStateTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// The initiated amount does not equal the order total.
    #[error("amount mismatch: order total is {expected}, got {actual}")]
    AmountMismatch { expected: Money, actual: Money },

    /// A gateway reported an outcome that contradicts an already-recorded
    /// terminal payment status. Never auto-resolved; surfaced for manual
    /// reconciliation.
    #[error(
        "conflicting notification for transaction {transaction_id}: recorded {recorded}, reported {reported}"
    )]
    ConflictingNotification {
        transaction_id: String,
        recorded: PaymentStatus,
        reported: PaymentStatus,
    },

    /// Monetary amount could not be parsed or converted exactly.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

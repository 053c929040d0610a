//! Gateway error types.

use thiserror::Error;

/// Errors from gateway adapters.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Callback signature did not verify. Never retried automatically.
    #[error("invalid callback signature")]
    InvalidSignature,

    /// Callback payload is missing a field or carries an unknown code.
    #[error("malformed callback: {0}")]
    MalformedCallback(String),

    /// Network or timeout failure talking to the gateway. Transient; the
    /// caller may retry with backoff.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    /// The gateway rejected the refund for a business reason. Permanent.
    #[error("refund rejected by gateway: {0}")]
    RefundRejected(String),

    /// The payment method does not support this operation.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

//! Settlement error types.

use common::{OrderId, UserId, VariantId};
use domain::DomainError;
use gateway::GatewayError;
use thiserror::Error;

/// Errors that can occur during settlement operations.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// Order not found.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// Requester is neither the order's owner nor an administrator.
    #[error("user {user_id} is not allowed to perform this operation")]
    Forbidden { user_id: UserId },

    /// Not enough stock to reserve the requested quantity.
    #[error(
        "insufficient stock for variant {variant_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        variant_id: VariantId,
        requested: u32,
        available: u32,
    },

    /// A non-terminal payment already exists for the order.
    #[error("order {order_id} already has a payment attempt in progress")]
    ConflictingPayment { order_id: OrderId },

    /// No payment matches the transaction identifier a gateway reported.
    #[error("unrecognized transaction: {transaction_id}")]
    UnrecognizedTransaction { transaction_id: String },

    /// Domain validation or state-machine error.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Gateway adapter error.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Convenience type alias for settlement results.
pub type Result<T> = std::result::Result<T, SettlementError>;

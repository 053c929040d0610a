//! Shared types for the order-and-payment settlement core.

pub mod money;
pub mod types;

pub use money::{Money, MoneyError};
pub use types::{OrderId, PaymentId, ProductId, TransactionId, UserId, VariantId};

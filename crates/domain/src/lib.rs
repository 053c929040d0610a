//! Domain layer for the settlement core.
//!
//! Holds the order and payment aggregates together with their state
//! machines. Every status transition in the system is validated by
//! exactly one transition table per aggregate, defined in this crate.

pub mod error;
pub mod method;
pub mod order;
pub mod payment;

pub use error::DomainError;
pub use method::PaymentMethod;
pub use order::{Order, OrderItem, OrderStatus, ShippingAddress};
pub use payment::{OutcomeApplied, Payment, PaymentOutcome, PaymentStatus};

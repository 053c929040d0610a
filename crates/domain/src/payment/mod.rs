//! Payment aggregate and related types.

mod aggregate;
mod state;

pub use aggregate::{OutcomeApplied, Payment};
pub use state::{PaymentOutcome, PaymentStatus};

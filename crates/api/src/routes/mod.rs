//! HTTP route handlers.

pub mod callbacks;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod payments;

//! Payment gateway adapters for the settlement core.
//!
//! Each supported payment method implements the [`PaymentGateway`]
//! capability contract: initiate a payment, verify an inbound callback
//! notification, and request a refund. Gateway-specific signing (canonical
//! query string, keyed hash, hex rendering) lives in [`sign`].

pub mod adapter;
pub mod alpha;
pub mod beta;
pub mod cod;
pub mod error;
pub mod sign;
pub mod transport;

pub use adapter::{
    GatewayConfig, GatewayInitiation, InitiationRequest, PaymentGateway, VerifiedCallback,
};
pub use alpha::AlphaPayGateway;
pub use beta::BetaPayGateway;
pub use cod::CashOnDeliveryGateway;
pub use error::GatewayError;
pub use sign::SignatureAlgorithm;
pub use transport::{GatewayTransport, InMemoryGatewayTransport};

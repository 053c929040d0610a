//! Settlement orchestration: order placement with inventory reservation,
//! payment initiation against gateway adapters, idempotent notification
//! reconciliation and refunds.
//!
//! The crate is organized around storage and collaborator traits
//! ([`OrderStore`], [`PaymentStore`], [`InventoryLedger`], [`Catalog`],
//! [`UserDirectory`]) with in-memory implementations, and two services
//! ([`OrderService`], [`PaymentService`]) plus the
//! [`NotificationReconciler`] that drive them.

pub mod catalog;
pub mod directory;
pub mod error;
pub mod inventory;
pub mod orders;
pub mod payments;
pub mod pricing;
pub mod reconciler;
pub mod registry;
pub mod store;

pub use catalog::{Catalog, InMemoryCatalog, VariantRecord};
pub use directory::{InMemoryUserDirectory, UserDirectory};
pub use error::{Result, SettlementError};
pub use inventory::{InMemoryInventoryLedger, InventoryLedger};
pub use orders::{CreateOrderRequest, OrderItemRequest, OrderService};
pub use payments::{InitiatedPayment, PaymentService};
pub use pricing::{FlatPricing, PricingPolicy, PricingQuote};
pub use reconciler::{CallbackAck, NotificationReconciler};
pub use registry::GatewayRegistry;
pub use store::{InMemoryOrderStore, InMemoryPaymentStore, OrderStore, PaymentStore};

//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::method::PaymentMethod;

use super::{OrderItem, OrderStatus, ShippingAddress};

/// Order aggregate root.
///
/// Owns its items exclusively. Totals are always computed from the items
/// plus tax and shipping fee, never supplied by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    items: Vec<OrderItem>,
    shipping_address: ShippingAddress,
    payment_method: PaymentMethod,
    status: OrderStatus,
    subtotal: Money,
    tax: Money,
    shipping_fee: Money,
    total: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Places a new order in `Pending` status.
    ///
    /// Computes `subtotal` as the sum of line totals and
    /// `total = subtotal + tax + shipping_fee`. Inventory must already be
    /// reserved for every item by the caller.
    pub fn place(
        user_id: UserId,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        tax: Money,
        shipping_fee: Money,
    ) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::InvalidRequest(
                "order must contain at least one item".to_string(),
            ));
        }
        for item in &items {
            if item.quantity == 0 {
                return Err(DomainError::InvalidRequest(format!(
                    "quantity for product {} must be at least 1",
                    item.product_id
                )));
            }
        }

        let subtotal: Money = items.iter().map(OrderItem::line_total).sum();
        let total = subtotal + tax + shipping_fee;
        let now = Utc::now();

        Ok(Self {
            id: OrderId::new(),
            user_id,
            items,
            shipping_address,
            payment_method,
            status: OrderStatus::Pending,
            subtotal,
            tax,
            shipping_fee,
            total,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a status transition, validated against the transition table.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                entity: "order",
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Advances `Pending -> Processing` after a confirmed payment.
    pub fn confirm_payment(&mut self) -> Result<(), DomainError> {
        self.transition_to(OrderStatus::Processing)
    }

    /// Cancels the order. Allowed from `Pending` and `Processing` only.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.transition_to(OrderStatus::Cancelled)
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    pub fn tax(&self) -> Money {
        self.tax
    }

    pub fn shipping_fee(&self) -> Money {
        self.shipping_fee
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if the order is in a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

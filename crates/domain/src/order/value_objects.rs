//! Value objects for the order domain.

use common::{Money, ProductId, VariantId};
use serde::{Deserialize, Serialize};

/// A line of an order.
///
/// The unit price is captured at order-creation time and never changes
/// afterwards; catalog price changes must not retroactively alter
/// historical orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The ordered product.
    pub product_id: ProductId,

    /// The purchasable variant the stock was reserved against.
    pub variant_id: VariantId,

    /// Human-readable product name, snapshotted for display.
    pub product_name: String,

    /// Quantity ordered, at least 1.
    pub quantity: u32,

    /// Price per unit at the time of order.
    pub unit_price: Money,
}

impl OrderItem {
    /// Creates a new order item.
    pub fn new(
        product_id: ProductId,
        variant_id: VariantId,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id,
            variant_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the line total (quantity x unit price).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Shipping destination, snapshotted into the order rather than referencing
/// a live address record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
}

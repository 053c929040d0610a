//! Order pricing: tax and shipping on top of the item subtotal.

use common::Money;

/// Charges added on top of an order's item subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingQuote {
    pub tax: Money,
    pub shipping_fee: Money,
}

/// Computes the tax and shipping charges for an order.
pub trait PricingPolicy: Send + Sync {
    fn quote(&self, subtotal: Money) -> PricingQuote;
}

/// Fixed tax and shipping amounts regardless of subtotal.
#[derive(Debug, Clone, Copy)]
pub struct FlatPricing {
    tax: Money,
    shipping_fee: Money,
}

impl FlatPricing {
    pub fn new(tax: Money, shipping_fee: Money) -> Self {
        Self { tax, shipping_fee }
    }

    /// No tax, no shipping fee.
    pub fn free() -> Self {
        Self::new(Money::zero(), Money::zero())
    }
}

impl PricingPolicy for FlatPricing {
    fn quote(&self, _subtotal: Money) -> PricingQuote {
        PricingQuote {
            tax: self.tax,
            shipping_fee: self.shipping_fee,
        }
    }
}

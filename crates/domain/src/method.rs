//! Payment method enumeration.

use serde::{Deserialize, Serialize};

/// How an order is paid.
///
/// One canonical enumeration shared by orders, payments, and gateway
/// adapter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Collected by the courier at delivery; no gateway involved.
    CashOnDelivery,

    /// AlphaPay redirect flow, HMAC-SHA256 signed callbacks.
    #[serde(rename = "alphapay")]
    AlphaPay,

    /// BetaPay QR flow, HMAC-SHA512 signed callbacks.
    #[serde(rename = "betapay")]
    BetaPay,
}

impl PaymentMethod {
    /// Returns true for cash-on-delivery.
    pub fn is_cash_on_delivery(&self) -> bool {
        matches!(self, PaymentMethod::CashOnDelivery)
    }

    /// Returns the method name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
            PaymentMethod::AlphaPay => "alphapay",
            PaymentMethod::BetaPay => "betapay",
        }
    }

    /// Parses a method name, accepting the same strings `as_str` produces.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash_on_delivery" => Some(PaymentMethod::CashOnDelivery),
            "alphapay" => Some(PaymentMethod::AlphaPay),
            "betapay" => Some(PaymentMethod::BetaPay),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for method in [
            PaymentMethod::CashOnDelivery,
            PaymentMethod::AlphaPay,
            PaymentMethod::BetaPay,
        ] {
            assert_eq!(PaymentMethod::parse(method.as_str()), Some(method));
        }
        assert_eq!(PaymentMethod::parse("carrier_pigeon"), None);
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&PaymentMethod::AlphaPay).unwrap();
        assert_eq!(json, "\"alphapay\"");
    }
}

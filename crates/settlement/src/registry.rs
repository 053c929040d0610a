//! Routing from payment method to gateway adapter.

use std::collections::HashMap;
use std::sync::Arc;

use domain::PaymentMethod;
use gateway::{GatewayError, PaymentGateway};

/// Holds one adapter per payment method.
#[derive(Default)]
pub struct GatewayRegistry {
    gateways: HashMap<PaymentMethod, Arc<dyn PaymentGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter under the method it reports.
    pub fn register(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateways.insert(gateway.method(), gateway);
        self
    }

    /// Looks up the adapter for a method.
    pub fn select(&self, method: PaymentMethod) -> Result<&Arc<dyn PaymentGateway>, GatewayError> {
        self.gateways
            .get(&method)
            .ok_or(GatewayError::Unsupported("no adapter for payment method"))
    }
}

impl std::fmt::Debug for GatewayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let methods: Vec<_> = self.gateways.keys().collect();
        f.debug_struct("GatewayRegistry")
            .field("methods", &methods)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway::CashOnDeliveryGateway;

    #[test]
    fn test_select_registered_and_missing() {
        let registry = GatewayRegistry::new().register(Arc::new(CashOnDeliveryGateway::new()));

        assert!(registry.select(PaymentMethod::CashOnDelivery).is_ok());
        assert!(matches!(
            registry.select(PaymentMethod::AlphaPay),
            Err(GatewayError::Unsupported(_))
        ));
    }
}

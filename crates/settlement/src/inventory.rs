//! Per-variant available-quantity ledger.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::VariantId;
use tokio::sync::RwLock;

use crate::error::{Result, SettlementError};

/// Atomic reserve/release of per-variant stock counters.
///
/// `reserve` must be a single conditional check-and-decrement: two
/// concurrent reservations racing for the last unit must never both
/// succeed, and `available` must never go negative. `release` is an
/// unconditional add-back; deduplicating releases is the caller's
/// responsibility.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Current available quantity, zero for unknown variants.
    async fn available(&self, variant_id: VariantId) -> u32;

    /// Atomically checks `available >= quantity` and decrements.
    async fn reserve(&self, variant_id: VariantId, quantity: u32) -> Result<()>;

    /// Atomically adds the quantity back.
    async fn release(&self, variant_id: VariantId, quantity: u32);
}

/// In-memory ledger. The conditional decrement runs inside one write-lock
/// critical section, which serializes racing reservations the same way a
/// single conditional `UPDATE` would.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryLedger {
    stock: Arc<RwLock<HashMap<VariantId, u32>>>,
}

impl InMemoryInventoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the available quantity for a variant.
    pub async fn set_stock(&self, variant_id: VariantId, quantity: u32) {
        self.stock.write().await.insert(variant_id, quantity);
    }
}

#[async_trait]
impl InventoryLedger for InMemoryInventoryLedger {
    async fn available(&self, variant_id: VariantId) -> u32 {
        self.stock.read().await.get(&variant_id).copied().unwrap_or(0)
    }

    async fn reserve(&self, variant_id: VariantId, quantity: u32) -> Result<()> {
        let mut stock = self.stock.write().await;
        let available = stock.entry(variant_id).or_insert(0);
        if *available < quantity {
            return Err(SettlementError::InsufficientStock {
                variant_id,
                requested: quantity,
                available: *available,
            });
        }
        *available -= quantity;
        Ok(())
    }

    async fn release(&self, variant_id: VariantId, quantity: u32) {
        let mut stock = self.stock.write().await;
        *stock.entry(variant_id).or_insert(0) += quantity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reserve_decrements_stock() {
        let ledger = InMemoryInventoryLedger::new();
        let variant = VariantId::new();
        ledger.set_stock(variant, 5).await;

        ledger.reserve(variant, 3).await.unwrap();
        assert_eq!(ledger.available(variant).await, 2);
    }

    #[tokio::test]
    async fn test_reserve_beyond_stock_fails() {
        let ledger = InMemoryInventoryLedger::new();
        let variant = VariantId::new();
        ledger.set_stock(variant, 2).await;

        let result = ledger.reserve(variant, 3).await;
        assert!(matches!(
            result,
            Err(SettlementError::InsufficientStock {
                requested: 3,
                available: 2,
                ..
            })
        ));
        assert_eq!(ledger.available(variant).await, 2);
    }

    #[tokio::test]
    async fn test_unknown_variant_has_zero_stock() {
        let ledger = InMemoryInventoryLedger::new();
        let variant = VariantId::new();
        assert_eq!(ledger.available(variant).await, 0);
        assert!(ledger.reserve(variant, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_reserve_then_release_is_a_noop_on_available() {
        let ledger = InMemoryInventoryLedger::new();
        let variant = VariantId::new();
        ledger.set_stock(variant, 7).await;

        ledger.reserve(variant, 4).await.unwrap();
        ledger.release(variant, 4).await;
        assert_eq!(ledger.available(variant).await, 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_reservations_never_oversell() {
        let ledger = InMemoryInventoryLedger::new();
        let variant = VariantId::new();
        ledger.set_stock(variant, 5).await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(
                async move { ledger.reserve(variant, 1).await },
            ));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        assert_eq!(succeeded, 5);
        assert_eq!(ledger.available(variant).await, 0);
    }
}

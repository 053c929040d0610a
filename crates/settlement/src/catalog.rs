//! Product catalog lookups used while placing orders.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{Money, ProductId, VariantId};
use tokio::sync::RwLock;

/// A sellable variant as the catalog knows it.
#[derive(Debug, Clone)]
pub struct VariantRecord {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub product_name: String,
    pub unit_price: Money,
}

/// Read-only catalog seam.
///
/// `resolve` with no variant picks the product's default variant, so
/// callers can order single-variant products without naming one.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn resolve(
        &self,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Option<VariantRecord>;
}

#[derive(Debug, Default)]
struct CatalogState {
    variants: HashMap<VariantId, VariantRecord>,
    defaults: HashMap<ProductId, VariantId>,
}

/// In-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variant. The first variant added for a product becomes its
    /// default.
    pub async fn add_variant(&self, record: VariantRecord) {
        let mut state = self.state.write().await;
        state
            .defaults
            .entry(record.product_id)
            .or_insert(record.variant_id);
        state.variants.insert(record.variant_id, record);
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn resolve(
        &self,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Option<VariantRecord> {
        let state = self.state.read().await;
        let variant_id = match variant_id {
            Some(id) => id,
            None => *state.defaults.get(&product_id)?,
        };
        let record = state.variants.get(&variant_id)?;
        if record.product_id != product_id {
            return None;
        }
        Some(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_explicit_variant() {
        let catalog = InMemoryCatalog::new();
        let product = ProductId::new();
        let variant = VariantId::new();
        catalog
            .add_variant(VariantRecord {
                product_id: product,
                variant_id: variant,
                product_name: "Widget".to_string(),
                unit_price: Money::from_cents(1000),
            })
            .await;

        let record = catalog.resolve(product, Some(variant)).await.unwrap();
        assert_eq!(record.unit_price, Money::from_cents(1000));
    }

    #[tokio::test]
    async fn test_resolve_default_variant() {
        let catalog = InMemoryCatalog::new();
        let product = ProductId::new();
        let first = VariantId::new();
        let second = VariantId::new();
        for (variant_id, price) in [(first, 1000), (second, 1200)] {
            catalog
                .add_variant(VariantRecord {
                    product_id: product,
                    variant_id,
                    product_name: "Widget".to_string(),
                    unit_price: Money::from_cents(price),
                })
                .await;
        }

        let record = catalog.resolve(product, None).await.unwrap();
        assert_eq!(record.variant_id, first);
    }

    #[tokio::test]
    async fn test_resolve_rejects_variant_of_other_product() {
        let catalog = InMemoryCatalog::new();
        let product = ProductId::new();
        let variant = VariantId::new();
        catalog
            .add_variant(VariantRecord {
                product_id: product,
                variant_id: variant,
                product_name: "Widget".to_string(),
                unit_price: Money::from_cents(1000),
            })
            .await;

        assert!(catalog.resolve(ProductId::new(), Some(variant)).await.is_none());
        assert!(catalog.resolve(ProductId::new(), None).await.is_none());
    }
}

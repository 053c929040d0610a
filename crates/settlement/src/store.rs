//! Repository traits for orders and payments, with in-memory
//! implementations.
//!
//! The `update*` methods run the supplied closure inside the record's
//! critical section, so concurrent mutations of the same record are
//! serialized. That is what makes duplicate gateway notifications for one
//! payment unable to race past the "already terminal" check. Payment
//! records carry their own lock, so deliveries for different payments only
//! share the brief map lookup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, UserId};
use domain::{Order, Payment};
use tokio::sync::{Mutex, RwLock};

use crate::error::{Result, SettlementError};

/// Mutation applied to an order under the store's critical section.
pub type OrderUpdate<'a> = &'a mut (dyn FnMut(&mut Order) -> Result<()> + Send);

/// Mutation applied to a payment under the store's critical section.
pub type PaymentUpdate<'a> = &'a mut (dyn FnMut(&mut Payment) -> Result<()> + Send);

/// Persistence seam for orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order);

    async fn get(&self, id: OrderId) -> Option<Order>;

    /// Orders for one user, most recent first.
    async fn list_for_user(&self, user_id: UserId) -> Vec<Order>;

    /// Applies `apply` to the stored order atomically and returns the
    /// updated record. The order is only modified if `apply` succeeds.
    async fn update(&self, id: OrderId, apply: OrderUpdate<'_>) -> Result<Order>;
}

/// Persistence seam for payments.
///
/// Payments are addressable by the merchant transaction identifier, which
/// is how gateway callbacks route back to them.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert(&self, payment: Payment);

    /// Inserts a pending payment unless the order already has a
    /// non-terminal one. Check and insert are one atomic step, so two
    /// racing initiations cannot both open an attempt.
    async fn insert_unless_active(&self, payment: Payment) -> Result<()>;

    async fn get_by_transaction(&self, transaction_id: &str) -> Option<Payment>;

    /// The single non-terminal payment for an order, if any.
    async fn find_active_for_order(&self, order_id: OrderId) -> Option<Payment>;

    /// All payment attempts for an order, oldest first.
    async fn list_for_order(&self, order_id: OrderId) -> Vec<Payment>;

    /// Applies `apply` to the payment atomically and returns the updated
    /// record. Fails with `UnrecognizedTransaction` if absent.
    async fn update_by_transaction(
        &self,
        transaction_id: &str,
        apply: PaymentUpdate<'_>,
    ) -> Result<Payment>;
}

/// In-memory order store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) {
        self.orders.write().await.insert(order.id(), order);
    }

    async fn get(&self, id: OrderId) -> Option<Order> {
        self.orders.read().await.get(&id).cloned()
    }

    async fn list_for_user(&self, user_id: UserId) -> Vec<Order> {
        let orders = self.orders.read().await;
        let mut result: Vec<Order> = orders
            .values()
            .filter(|o| o.user_id() == user_id)
            .cloned()
            .collect();
        result.sort_by_key(|o| std::cmp::Reverse(o.created_at()));
        result
    }

    async fn update(&self, id: OrderId, apply: OrderUpdate<'_>) -> Result<Order> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&id)
            .ok_or(SettlementError::OrderNotFound(id))?;
        apply(order)?;
        Ok(order.clone())
    }
}

type PaymentRecord = Arc<Mutex<Payment>>;

/// In-memory payment store, keyed by transaction identifier.
///
/// Each record carries its own lock: mutations of one payment serialize on
/// it, and the map-wide lock is only held to look the record up or to
/// insert.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<String, PaymentRecord>>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: Payment) {
        self.payments.write().await.insert(
            payment.transaction_id().to_string(),
            Arc::new(Mutex::new(payment)),
        );
    }

    async fn insert_unless_active(&self, payment: Payment) -> Result<()> {
        let mut payments = self.payments.write().await;
        for record in payments.values() {
            let existing = record.lock().await;
            if existing.order_id() == payment.order_id() && !existing.is_terminal() {
                return Err(SettlementError::ConflictingPayment {
                    order_id: payment.order_id(),
                });
            }
        }
        payments.insert(
            payment.transaction_id().to_string(),
            Arc::new(Mutex::new(payment)),
        );
        Ok(())
    }

    async fn get_by_transaction(&self, transaction_id: &str) -> Option<Payment> {
        let record = self.payments.read().await.get(transaction_id).cloned()?;
        let payment = record.lock().await;
        Some(payment.clone())
    }

    async fn find_active_for_order(&self, order_id: OrderId) -> Option<Payment> {
        let records: Vec<PaymentRecord> = self.payments.read().await.values().cloned().collect();
        for record in records {
            let payment = record.lock().await;
            if payment.order_id() == order_id && !payment.is_terminal() {
                return Some(payment.clone());
            }
        }
        None
    }

    async fn list_for_order(&self, order_id: OrderId) -> Vec<Payment> {
        let records: Vec<PaymentRecord> = self.payments.read().await.values().cloned().collect();
        let mut result = Vec::new();
        for record in records {
            let payment = record.lock().await;
            if payment.order_id() == order_id {
                result.push(payment.clone());
            }
        }
        result.sort_by_key(|p| p.created_at());
        result
    }

    async fn update_by_transaction(
        &self,
        transaction_id: &str,
        apply: PaymentUpdate<'_>,
    ) -> Result<Payment> {
        let record = self
            .payments
            .read()
            .await
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| SettlementError::UnrecognizedTransaction {
                transaction_id: transaction_id.to_string(),
            })?;
        let mut payment = record.lock().await;
        apply(&mut payment)?;
        Ok(payment.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use domain::{OrderItem, OrderStatus, PaymentMethod, PaymentOutcome, ShippingAddress};

    fn order(user_id: UserId) -> Order {
        Order::place(
            user_id,
            vec![OrderItem::new(
                common::ProductId::new(),
                common::VariantId::new(),
                "Widget",
                1,
                Money::from_cents(1000),
            )],
            ShippingAddress {
                recipient: "Test".to_string(),
                phone: "555".to_string(),
                line1: "1 Test St".to_string(),
                line2: None,
                city: "Testville".to_string(),
                postal_code: "00000".to_string(),
            },
            PaymentMethod::AlphaPay,
            Money::zero(),
            Money::zero(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_order_insert_get_and_list() {
        let store = InMemoryOrderStore::new();
        let user = UserId::new();
        let order = order(user);
        let id = order.id();

        store.insert(order).await;
        assert!(store.get(id).await.is_some());
        assert_eq!(store.list_for_user(user).await.len(), 1);
        assert!(store.list_for_user(UserId::new()).await.is_empty());
    }

    #[tokio::test]
    async fn test_order_update_missing_fails() {
        let store = InMemoryOrderStore::new();
        let result = store.update(OrderId::new(), &mut |_| Ok(())).await;
        assert!(matches!(result, Err(SettlementError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_order_update_applies_transition() {
        let store = InMemoryOrderStore::new();
        let order = order(UserId::new());
        let id = order.id();
        store.insert(order).await;

        let updated = store
            .update(id, &mut |o| o.confirm_payment().map_err(Into::into))
            .await
            .unwrap();
        assert_eq!(updated.status(), OrderStatus::Processing);
        assert_eq!(store.get(id).await.unwrap().status(), OrderStatus::Processing);
    }

    #[tokio::test]
    async fn test_payment_store_routing() {
        let store = InMemoryPaymentStore::new();
        let order_id = OrderId::new();
        let payment = Payment::new(order_id, PaymentMethod::AlphaPay, Money::from_cents(2600));
        let txn = payment.transaction_id().to_string();

        store.insert(payment).await;
        assert!(store.get_by_transaction(&txn).await.is_some());
        assert!(store.get_by_transaction("TXN-unknown").await.is_none());
        assert!(store.find_active_for_order(order_id).await.is_some());

        store
            .update_by_transaction(&txn, &mut |p| {
                p.apply_outcome(PaymentOutcome::Failed, None, None, None)
                    .map(|_| ())
                    .map_err(Into::into)
            })
            .await
            .unwrap();

        assert!(store.find_active_for_order(order_id).await.is_none());
        assert_eq!(store.list_for_order(order_id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_unless_active_rejects_open_attempt() {
        let store = InMemoryPaymentStore::new();
        let order_id = OrderId::new();
        let first = Payment::new(order_id, PaymentMethod::AlphaPay, Money::from_cents(2600));
        let txn = first.transaction_id().to_string();
        store.insert_unless_active(first).await.unwrap();

        let second = Payment::new(order_id, PaymentMethod::AlphaPay, Money::from_cents(2600));
        assert!(matches!(
            store.insert_unless_active(second).await,
            Err(SettlementError::ConflictingPayment { .. })
        ));

        // A terminal attempt no longer blocks a new one.
        store
            .update_by_transaction(&txn, &mut |p| {
                p.apply_outcome(PaymentOutcome::Failed, None, None, None)
                    .map(|_| ())
                    .map_err(Into::into)
            })
            .await
            .unwrap();
        let third = Payment::new(order_id, PaymentMethod::AlphaPay, Money::from_cents(2600));
        store.insert_unless_active(third).await.unwrap();
    }

    #[tokio::test]
    async fn test_payment_update_unknown_transaction() {
        let store = InMemoryPaymentStore::new();
        let result = store
            .update_by_transaction("TXN-missing", &mut |_| Ok(()))
            .await;
        assert!(matches!(
            result,
            Err(SettlementError::UnrecognizedTransaction { .. })
        ));
    }
}

//! Order placement and lifecycle orchestration.

use std::sync::Arc;

use common::{OrderId, ProductId, UserId, VariantId};
use domain::{DomainError, Order, OrderItem, OrderStatus, PaymentMethod, ShippingAddress};
use metrics::counter;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::catalog::Catalog;
use crate::directory::UserDirectory;
use crate::error::{Result, SettlementError};
use crate::inventory::InventoryLedger;
use crate::pricing::PricingPolicy;
use crate::store::{OrderStore, PaymentStore};

/// One requested line of a new order. `variant_id` may be omitted for
/// single-variant products; the catalog picks the default.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
}

/// Everything needed to place an order. Prices are intentionally absent;
/// they come from the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: UserId,
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// Orchestrates order placement, queries and lifecycle transitions.
pub struct OrderService<O, P, L, C, U> {
    orders: O,
    payments: P,
    inventory: L,
    catalog: C,
    directory: U,
    pricing: Arc<dyn PricingPolicy>,
}

impl<O, P, L, C, U> OrderService<O, P, L, C, U>
where
    O: OrderStore,
    P: PaymentStore,
    L: InventoryLedger,
    C: Catalog,
    U: UserDirectory,
{
    pub fn new(
        orders: O,
        payments: P,
        inventory: L,
        catalog: C,
        directory: U,
        pricing: Arc<dyn PricingPolicy>,
    ) -> Self {
        Self {
            orders,
            payments,
            inventory,
            catalog,
            directory,
            pricing,
        }
    }

    /// Places an order: resolves items against the catalog, reserves
    /// inventory for every line, prices the order and persists it in
    /// `Pending` status.
    ///
    /// Reservation is all-or-nothing. If any line cannot be reserved,
    /// every already-reserved line is released before the error is
    /// returned, so a failed order leaves stock untouched.
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<Order> {
        if !self.directory.exists(request.user_id).await {
            return Err(DomainError::InvalidRequest(format!(
                "unknown user: {}",
                request.user_id
            ))
            .into());
        }
        if request.items.is_empty() {
            return Err(
                DomainError::InvalidRequest("order must contain at least one item".into()).into(),
            );
        }

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            if line.quantity == 0 {
                return Err(DomainError::InvalidRequest(format!(
                    "quantity for product {} must be at least 1",
                    line.product_id
                ))
                .into());
            }
            let record = self
                .catalog
                .resolve(line.product_id, line.variant_id)
                .await
                .ok_or_else(|| {
                    DomainError::InvalidRequest(format!(
                        "unknown product or variant: {}",
                        line.product_id
                    ))
                })?;
            items.push(OrderItem::new(
                record.product_id,
                record.variant_id,
                record.product_name,
                line.quantity,
                record.unit_price,
            ));
        }

        let mut reserved: Vec<(VariantId, u32)> = Vec::with_capacity(items.len());
        for item in &items {
            if let Err(err) = self.inventory.reserve(item.variant_id, item.quantity).await {
                for (variant_id, quantity) in reserved {
                    self.inventory.release(variant_id, quantity).await;
                }
                counter!("orders_rejected_total", "reason" => "insufficient_stock").increment(1);
                return Err(err);
            }
            reserved.push((item.variant_id, item.quantity));
        }

        let subtotal = items.iter().map(OrderItem::line_total).sum();
        let quote = self.pricing.quote(subtotal);
        let order = match Order::place(
            request.user_id,
            items,
            request.shipping_address,
            request.payment_method,
            quote.tax,
            quote.shipping_fee,
        ) {
            Ok(order) => order,
            Err(err) => {
                for (variant_id, quantity) in reserved {
                    self.inventory.release(variant_id, quantity).await;
                }
                return Err(err.into());
            }
        };

        info!(order_id = %order.id(), total = %order.total(), "order placed");
        counter!("orders_created_total").increment(1);
        self.orders.insert(order.clone()).await;
        Ok(order)
    }

    /// Fetches one order. Visible to its owner and to administrators.
    pub async fn get_order(&self, order_id: OrderId, requester: UserId) -> Result<Order> {
        let order = self
            .orders
            .get(order_id)
            .await
            .ok_or(SettlementError::OrderNotFound(order_id))?;
        self.authorize(&order, requester).await?;
        Ok(order)
    }

    /// Lists the requester's own orders, most recent first.
    pub async fn list_orders(&self, user_id: UserId) -> Vec<Order> {
        self.orders.list_for_user(user_id).await
    }

    /// Cancels an order and releases its reserved inventory.
    ///
    /// Allowed for the owner and for administrators, and only while the
    /// order is `Pending` or `Processing`. Stock is released exactly once
    /// because a second cancel fails the state transition before the
    /// release runs.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId, requester: UserId) -> Result<Order> {
        let order = self.get_order(order_id, requester).await?;
        let order = self
            .orders
            .update(order.id(), &mut |o| o.cancel().map_err(Into::into))
            .await?;

        self.release_items(&order).await;
        info!(order_id = %order.id(), "order cancelled");
        counter!("orders_cancelled_total").increment(1);
        Ok(order)
    }

    /// Applies an administrator-driven status transition.
    ///
    /// `Processing` additionally requires settled funds: a cash-on-delivery
    /// order qualifies as-is, anything else needs a successful payment on
    /// record. Transitioning to `Cancelled` releases reserved inventory.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        requester: UserId,
        next: OrderStatus,
    ) -> Result<Order> {
        if !self.directory.is_admin(requester).await {
            return Err(SettlementError::Forbidden { user_id: requester });
        }
        let order = self
            .orders
            .get(order_id)
            .await
            .ok_or(SettlementError::OrderNotFound(order_id))?;

        if next == OrderStatus::Processing && !order.payment_method().is_cash_on_delivery() {
            let paid = self
                .payments
                .list_for_order(order_id)
                .await
                .iter()
                .any(|p| p.status() == domain::PaymentStatus::Success);
            if !paid {
                return Err(DomainError::InvalidRequest(
                    "order has no successful payment".into(),
                )
                .into());
            }
        }

        let order = self
            .orders
            .update(order_id, &mut |o| o.transition_to(next).map_err(Into::into))
            .await?;

        if next == OrderStatus::Cancelled {
            self.release_items(&order).await;
        }
        info!(order_id = %order.id(), status = %order.status(), "order status updated");
        Ok(order)
    }

    async fn authorize(&self, order: &Order, requester: UserId) -> Result<()> {
        if order.user_id() == requester || self.directory.is_admin(requester).await {
            return Ok(());
        }
        warn!(order_id = %order.id(), user_id = %requester, "order access denied");
        Err(SettlementError::Forbidden { user_id: requester })
    }

    async fn release_items(&self, order: &Order) {
        for item in order.items() {
            self.inventory.release(item.variant_id, item.quantity).await;
        }
    }
}

impl<O, P, L, C, U> std::fmt::Debug for OrderService<O, P, L, C, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService").finish_non_exhaustive()
    }
}

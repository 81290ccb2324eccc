use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{CheckoutOptions, Order, OrderId, OrderTransition},
    events::{EventProducers, OrderDeliveredEvent, OrderRejectedEvent},
    traits::{MarketplaceDatabase, MarketplaceError},
};

/// `OrderFlowApi` is the primary API for the order lifecycle: assembling a cart into an order at checkout, and
/// driving the status state machine as the chef and the delivery flow report progress.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: MarketplaceDatabase
{
    /// Assemble the user's cart into a new order against the chef's active shift.
    ///
    /// The order and every line item are inserted in one transaction; a failure anywhere rolls the whole order
    /// back, so a partially persisted order is never observable. The cart is not cleared here — that is a separate,
    /// caller-driven step.
    pub async fn create_order(&self, user_id: i64, options: CheckoutOptions) -> Result<Order, MarketplaceError> {
        let order = self.db.create_order_from_cart(user_id, options).await?;
        debug!(
            "🔄️📦️ Order {} created for user #{user_id} with chef #{} on shift #{}. Total {}",
            order.id, order.chef_id, order.shift_id, order.total_price
        );
        Ok(order)
    }

    /// The chef takes the order. `Created` → `Accepted`.
    pub async fn accept_order(&self, order_id: OrderId) -> Result<Order, MarketplaceError> {
        self.apply_transition(order_id, OrderTransition::Accept).await
    }

    /// Cooking finished; a courier is requested. `Accepted` → `Cooked`.
    pub async fn call_delivery(&self, order_id: OrderId) -> Result<Order, MarketplaceError> {
        self.apply_transition(order_id, OrderTransition::CallDelivery).await
    }

    /// The courier collects the order. `Cooked` → `InDelivery`.
    pub async fn pick_up(&self, order_id: OrderId) -> Result<Order, MarketplaceError> {
        self.apply_transition(order_id, OrderTransition::PickUp).await
    }

    /// The order reaches the client. `InDelivery` → `Delivered`.
    ///
    /// The status write and the shift-profit credit happen in one transaction in the backend; if either fails,
    /// neither applies. On success the `OrderDelivered` hook subscribers are notified.
    pub async fn deliver(&self, order_id: OrderId) -> Result<Order, MarketplaceError> {
        let order = self.apply_transition(order_id, OrderTransition::Deliver).await?;
        self.call_order_delivered_hook(&order).await;
        Ok(order)
    }

    /// The chef turns the order down. `Created` or `Accepted` → `Rejected`.
    pub async fn reject_order(&self, order_id: OrderId) -> Result<Order, MarketplaceError> {
        let order = self.apply_transition(order_id, OrderTransition::Reject).await?;
        self.call_order_rejected_hook(&order).await;
        Ok(order)
    }

    /// Applies one operation of the state machine.
    ///
    /// | Operation    | Source states       | Target       |
    /// |--------------|---------------------|--------------|
    /// | Accept       | Created             | Accepted     |
    /// | CallDelivery | Accepted            | Cooked       |
    /// | PickUp       | Cooked              | InDelivery   |
    /// | Deliver      | InDelivery          | Delivered    |
    /// | Reject       | Created, Accepted   | Rejected     |
    ///
    /// Anything else fails with [`MarketplaceError::InvalidTransition`] and leaves the order untouched. The error
    /// carries the status actually on record so a stale caller can refresh and retry; it is never silently coerced
    /// into a different transition.
    async fn apply_transition(&self, order_id: OrderId, op: OrderTransition) -> Result<Order, MarketplaceError> {
        let order = self.db.transition_order(order_id, op).await?;
        debug!("🔄️📦️ Order {order_id} is now {}", order.status);
        Ok(order)
    }

    async fn call_order_delivered_hook(&self, order: &Order) {
        for emitter in &self.producers.order_delivered_producer {
            trace!("🔄️📦️ Notifying order delivered hook subscribers");
            let event = OrderDeliveredEvent { order: order.clone() };
            emitter.publish_event(event).await;
        }
    }

    async fn call_order_rejected_hook(&self, order: &Order) {
        for emitter in &self.producers.order_rejected_producer {
            trace!("🔄️📦️ Notifying order rejected hook subscribers");
            let event = OrderRejectedEvent { order: order.clone() };
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

use crate::{
    db_types::{Order, OrderId, OrderItem},
    order_objects::{OrderQueryFilter, OrderWithItems},
    traits::MarketplaceError,
};

/// Read paths over the append-only order history.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, MarketplaceError>;

    async fn fetch_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, MarketplaceError>;

    async fn fetch_order_with_items(&self, order_id: OrderId) -> Result<Option<OrderWithItems>, MarketplaceError> {
        let order = match self.fetch_order(order_id).await? {
            Some(order) => order,
            None => return Ok(None),
        };
        let items = self.fetch_order_items(order_id).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    /// Fetches orders matching the filter, ordered by `created_at` ascending.
    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, MarketplaceError>;

    async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, MarketplaceError> {
        self.search_orders(OrderQueryFilter::default().with_user_id(user_id)).await
    }

    async fn orders_for_shift(&self, shift_id: i64) -> Result<Vec<Order>, MarketplaceError> {
        self.search_orders(OrderQueryFilter::default().with_shift_id(shift_id)).await
    }
}

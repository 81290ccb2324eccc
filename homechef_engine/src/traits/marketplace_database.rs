use thiserror::Error;

use crate::{
    db_types::{CheckoutOptions, Order, OrderId, OrderStatusType, OrderTransition},
    traits::OrderManagement,
};

/// This trait defines the highest level of behaviour for backends supporting the HomeChef engine: the transactional
/// checkout flow and the order status state machine.
///
/// The two operations here are the ones where atomicity carries the correctness of the system:
/// * [`create_order_from_cart`](Self::create_order_from_cart) must persist the order and all of its line items in
///   one transaction, or none of them.
/// * [`transition_order`](Self::transition_order) must write the new status as a compare-and-swap against the
///   operation's permitted source states, and fold the shift credit of a `Deliver` into the same transaction.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone + OrderManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Assemble the user's cart into a durable order.
    ///
    /// In a single atomic transaction:
    /// * resolves the user's most recently updated delivery address ([`MarketplaceError::NoDeliveryAddress`]);
    /// * loads the cart ([`MarketplaceError::EmptyCart`]), rejecting carts that span more than one chef
    ///   ([`MarketplaceError::MixedChefCart`]);
    /// * resolves the chef's active shift ([`MarketplaceError::ChefOffline`]);
    /// * computes the total as Σ quantity × unit price over the cart lines, snapshots each line as an order item,
    ///   and inserts the order.
    ///
    /// The cart is left untouched; clearing it is the caller's decision.
    async fn create_order_from_cart(
        &self,
        user_id: i64,
        options: CheckoutOptions,
    ) -> Result<Order, MarketplaceError>;

    /// Apply a state-machine operation to an order.
    ///
    /// The persisted status is checked and replaced in one conditional write. A caller whose view of the order is
    /// stale receives [`MarketplaceError::InvalidTransition`] carrying the status actually on record, and the row
    /// is left untouched. [`OrderTransition::Deliver`] additionally credits the order's shift with the order total;
    /// the credit and the status write commit together or not at all.
    async fn transition_order(&self, order_id: OrderId, op: OrderTransition) -> Result<Order, MarketplaceError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), MarketplaceError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Could not encode event payload: {0}")]
    SerializationError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("User #{0} has no delivery address on record")]
    NoDeliveryAddress(i64),
    #[error("User #{0} has an empty cart")]
    EmptyCart(i64),
    #[error("The cart of user #{0} contains dishes from more than one chef")]
    MixedChefCart(i64),
    #[error("Chef #{0} has no active shift; orders cannot be placed against a closed shift")]
    ChefOffline(i64),
    #[error("Cannot {op} order {order_id}: its status is {from}")]
    InvalidTransition { order_id: OrderId, from: OrderStatusType, op: OrderTransition },
    #[error("Chef #{0} already has an active shift")]
    ShiftAlreadyActive(i64),
    #[error("The requested shift #{0} does not exist")]
    ShiftNotFound(i64),
    #[error("Order {0} is not reviewable by this user")]
    OrderNotReviewable(OrderId),
    #[error("A star rating must be between 1 and 5, not {0}")]
    InvalidRating(i32),
    #[error("User #{user_id} has already reviewed order {order_id}")]
    ReviewAlreadyExists { order_id: OrderId, user_id: i64 },
}

impl From<sqlx::Error> for MarketplaceError {
    fn from(e: sqlx::Error) -> Self {
        MarketplaceError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for MarketplaceError {
    fn from(e: serde_json::Error) -> Self {
        MarketplaceError::SerializationError(e.to_string())
    }
}

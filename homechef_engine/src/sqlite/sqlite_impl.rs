//! `SqliteDatabase` is a concrete implementation of a HomeChef engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backing store and implements all the traits defined in the
//! [`traits`](crate::traits) module. The transactional flows (checkout, status transitions, review submission,
//! rating application) are composed out of the low-level functions in [`super::db`], with a `pool.begin()` /
//! `tx.commit()` bracket around every multi-statement write.
use std::fmt::Debug;

use hc_common::Money;
use log::*;
use sqlx::SqlitePool;

use super::db::{customers, db_url, new_pool, orders, outbox, ratings, reviews, shifts};
use crate::{
    db_types::{
        Address,
        CartItem,
        CheckoutOptions,
        EntityKind,
        NewAddress,
        NewCartItem,
        NewOrder,
        NewOutboxEntry,
        NewReview,
        Order,
        OrderId,
        OrderItem,
        OrderStatusType,
        OrderTransition,
        OutboxEntry,
        RatingAggregate,
        Review,
        Shift,
    },
    order_objects::OrderQueryFilter,
    traits::{
        AddressBook,
        CartManagement,
        MarketplaceDatabase,
        MarketplaceError,
        OrderManagement,
        OutboxManagement,
        RatingOutcome,
        RatingStore,
        ReviewManagement,
        ShiftManagement,
    },
    transport::{ChefReviewMessage, DishReviewMessage},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using `HC_DATABASE_URL` (or the default path).
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    /// The transactional body of checkout. Address, cart, shift and the inserts all happen inside one transaction;
    /// an early error drops the transaction and nothing is persisted, so an order can never exist with only part
    /// of its line items.
    async fn create_order_from_cart(
        &self,
        user_id: i64,
        options: CheckoutOptions,
    ) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let address = customers::last_updated_address(user_id, &mut tx)
            .await?
            .ok_or(MarketplaceError::NoDeliveryAddress(user_id))?;
        let items = customers::cart_items(user_id, &mut tx).await?;
        let first = items.first().ok_or(MarketplaceError::EmptyCart(user_id))?;
        let chef_id = first.chef_id;
        // One chef per checkout. A cart that silently spans chefs would attribute the whole order to one of them.
        if items.iter().any(|item| item.chef_id != chef_id) {
            return Err(MarketplaceError::MixedChefCart(user_id));
        }
        let shift =
            shifts::active_shift_for_chef(chef_id, &mut tx).await?.ok_or(MarketplaceError::ChefOffline(chef_id))?;
        let total_price: Money = items.iter().map(CartItem::line_total).sum();
        let new_order = NewOrder {
            chef_id,
            shift_id: shift.id,
            user_id,
            address_id: address.id,
            total_price,
            leave_by_door: options.leave_by_door,
            call_beforehand: options.call_beforehand,
        };
        let order = orders::insert_order(new_order, &mut tx).await?;
        for item in &items {
            orders::insert_order_item(order.id, item, &mut tx).await?;
        }
        tx.commit().await?;
        debug!(
            "🗃️ Order {} ({} line items, total {}) saved for user #{user_id} against shift #{}",
            order.id,
            items.len(),
            total_price,
            shift.id
        );
        Ok(order)
    }

    async fn transition_order(&self, order_id: OrderId, op: OrderTransition) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = match orders::try_transition(order_id, op, &mut tx).await? {
            Some(order) => order,
            None => {
                // The CAS matched nothing: either the order is missing, or it is not in a source state of `op`.
                let current = orders::fetch_order(order_id, &mut tx)
                    .await?
                    .ok_or(MarketplaceError::OrderNotFound(order_id))?;
                return Err(MarketplaceError::InvalidTransition { order_id, from: current.status, op });
            },
        };
        if op == OrderTransition::Deliver {
            // The credit rides in the delivery transaction: a crash between the two leaves neither applied, and a
            // retry of a committed delivery fails the CAS instead of double-crediting.
            shifts::credit_shift(order.shift_id, order.total_price, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order {order_id}: {op} applied, status is now {}", order.status);
        Ok(order)
    }

    async fn close(&mut self) -> Result<(), MarketplaceError> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(filter, &mut conn).await?;
        Ok(orders)
    }
}

impl ShiftManagement for SqliteDatabase {
    async fn open_shift(&self, chef_id: i64) -> Result<Shift, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let shift = shifts::open_shift(chef_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Shift #{} opened for chef #{chef_id}", shift.id);
        Ok(shift)
    }

    async fn close_shift(&self, chef_id: i64) -> Result<Option<Shift>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let shift = shifts::close_shift(chef_id, &mut conn).await?;
        Ok(shift)
    }

    async fn active_shift_for_chef(&self, chef_id: i64) -> Result<Option<Shift>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let shift = shifts::active_shift_for_chef(chef_id, &mut conn).await?;
        Ok(shift)
    }

    async fn fetch_shift(&self, shift_id: i64) -> Result<Option<Shift>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let shift = shifts::fetch_shift(shift_id, &mut conn).await?;
        Ok(shift)
    }

    async fn credit_shift(&self, shift_id: i64, amount: Money) -> Result<(), MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        shifts::credit_shift(shift_id, amount, &mut conn).await
    }
}

impl ReviewManagement for SqliteDatabase {
    /// Review persistence and event derivation in one transaction: the review row, the chef rating event, and one
    /// dish rating event per distinct dish on the order commit together or not at all. Publishing before commit
    /// could deliver events for a review that never persisted; persisting without the outbox rows could silently
    /// lose rating updates to a crash. Both failure modes die here.
    async fn insert_review_with_events(&self, review: NewReview) -> Result<Review, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(review.order_id, &mut tx)
            .await?
            .ok_or(MarketplaceError::OrderNotFound(review.order_id))?;
        let reviewable =
            order.user_id == review.user_id && order.chef_id == review.chef_id && order.status == OrderStatusType::Delivered;
        if !reviewable {
            return Err(MarketplaceError::OrderNotReviewable(review.order_id));
        }
        if reviews::review_for_order(review.order_id, review.user_id, &mut tx).await?.is_some() {
            return Err(MarketplaceError::ReviewAlreadyExists { order_id: review.order_id, user_id: review.user_id });
        }
        let review = reviews::insert_review(review, &mut tx).await?;

        let chef_event =
            ChefReviewMessage { entity_id: review.chef_id, review_id: review.id, stars: review.stars };
        outbox::stage(chef_event.to_outbox_entry()?, &mut tx).await?;

        let items = orders::fetch_order_items(order.id, &mut tx).await?;
        let mut dish_ids: Vec<i64> = items.iter().map(|item| item.dish_id).collect();
        dish_ids.sort_unstable();
        dish_ids.dedup();
        let staged = dish_ids.len() + 1;
        for dish_id in dish_ids {
            let event = DishReviewMessage { dish_id, review_id: review.id, rating: review.stars };
            outbox::stage(event.to_outbox_entry()?, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Review #{} saved with {staged} rating events staged in the outbox", review.id);
        Ok(review)
    }

    async fn review_for_order(&self, order_id: OrderId, user_id: i64) -> Result<Option<Review>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let review = reviews::review_for_order(order_id, user_id, &mut conn).await?;
        Ok(review)
    }

    async fn reviews_for_chef(&self, chef_id: i64) -> Result<Vec<Review>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let reviews = reviews::reviews_for_chef(chef_id, &mut conn).await?;
        Ok(reviews)
    }
}

impl OutboxManagement for SqliteDatabase {
    async fn stage_entry(&self, entry: NewOutboxEntry) -> Result<OutboxEntry, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        outbox::stage(entry, &mut conn).await
    }

    async fn fetch_unpublished(&self, limit: i64) -> Result<Vec<OutboxEntry>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let entries = outbox::fetch_unpublished(limit, &mut conn).await?;
        Ok(entries)
    }

    async fn mark_published(&self, entry_id: i64) -> Result<(), MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        outbox::mark_published(entry_id, &mut conn).await
    }

    async fn record_publish_failure(&self, entry_id: i64, error: &str) -> Result<(), MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        outbox::record_failure(entry_id, error, &mut conn).await
    }
}

impl RatingStore for SqliteDatabase {
    async fn apply_rating(
        &self,
        kind: EntityKind,
        entity_id: i64,
        review_id: i64,
        stars: i32,
    ) -> Result<RatingOutcome, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        if !ratings::record_application(kind, entity_id, review_id, &mut tx).await? {
            trace!("🗃️ Review #{review_id} was already applied to {kind} #{entity_id}; skipping");
            return Ok(RatingOutcome::Duplicate);
        }
        let aggregate = ratings::fold_into_aggregate(kind, entity_id, stars, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ {kind} #{entity_id} is now rated {:.2} over {} reviews",
            aggregate.average_rating, aggregate.review_count
        );
        Ok(RatingOutcome::Applied(aggregate))
    }

    async fn fetch_aggregate(
        &self,
        kind: EntityKind,
        entity_id: i64,
    ) -> Result<Option<RatingAggregate>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let aggregate = ratings::fetch_aggregate(kind, entity_id, &mut conn).await?;
        Ok(aggregate)
    }
}

impl CartManagement for SqliteDatabase {
    async fn cart_items_for_user(&self, user_id: i64) -> Result<Vec<CartItem>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let items = customers::cart_items(user_id, &mut conn).await?;
        Ok(items)
    }

    async fn add_cart_item(&self, item: NewCartItem) -> Result<CartItem, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        customers::insert_cart_item(item, &mut conn).await
    }

    async fn clear_cart(&self, user_id: i64) -> Result<u64, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let removed = customers::clear_cart(user_id, &mut conn).await?;
        debug!("🗃️ Cleared {removed} cart line(s) for user #{user_id}");
        Ok(removed)
    }
}

impl AddressBook for SqliteDatabase {
    async fn last_updated_address_for_user(&self, user_id: i64) -> Result<Option<Address>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        let address = customers::last_updated_address(user_id, &mut conn).await?;
        Ok(address)
    }

    async fn add_address(&self, address: NewAddress) -> Result<Address, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        customers::insert_address(address, &mut conn).await
    }
}

use crate::{
    db_types::{NewReview, OrderId, Review},
    traits::MarketplaceError,
};

/// Review persistence, including the transactional staging of the derived rating events.
#[allow(async_fn_in_trait)]
pub trait ReviewManagement {
    /// Persists a review and stages its rating events, all in one transaction.
    ///
    /// Preconditions, checked inside the transaction:
    /// * the order exists, belongs to the reviewing user and the reviewed chef, and is `Delivered`
    ///   ([`MarketplaceError::OrderNotReviewable`]);
    /// * the user has not reviewed this order before ([`MarketplaceError::ReviewAlreadyExists`]).
    ///
    /// On success the transaction holds the review row plus one outbox entry for the chef rating event and one per
    /// distinct dish on the order. Committing them together is what makes the pipeline lossless: the events exist
    /// exactly when the review does.
    async fn insert_review_with_events(&self, review: NewReview) -> Result<Review, MarketplaceError>;

    async fn review_for_order(&self, order_id: OrderId, user_id: i64) -> Result<Option<Review>, MarketplaceError>;

    /// Fetches the chef's reviews, most recent first. Soft-deleted reviews are excluded.
    async fn reviews_for_chef(&self, chef_id: i64) -> Result<Vec<Review>, MarketplaceError>;
}

use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewReview, OrderId, Review},
    traits::{MarketplaceError, ReviewManagement},
};

/// `ReviewApi` accepts client reviews of completed orders and hands them to the rating pipeline.
///
/// Validation failures are rejected synchronously with no side effects. A successful submission commits the review
/// row and its derived rating events (one per affected chef, one per distinct dish on the order) in one
/// transaction; from that point the asynchronous pipeline owns them.
pub struct ReviewApi<B> {
    db: B,
}

impl<B> Debug for ReviewApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReviewApi")
    }
}

impl<B> ReviewApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> ReviewApi<B>
where B: ReviewManagement
{
    pub async fn submit_review(&self, review: NewReview) -> Result<Review, MarketplaceError> {
        if !(1..=5).contains(&review.stars) {
            return Err(MarketplaceError::InvalidRating(review.stars));
        }
        let review = self.db.insert_review_with_events(review).await?;
        debug!(
            "⭐️ Review #{} ({} stars) stored for chef #{} on order {}; rating events staged",
            review.id, review.stars, review.chef_id, review.order_id
        );
        Ok(review)
    }

    pub async fn review_for_order(&self, order_id: OrderId, user_id: i64) -> Result<Option<Review>, MarketplaceError> {
        self.db.review_for_order(order_id, user_id).await
    }

    pub async fn reviews_for_chef(&self, chef_id: i64) -> Result<Vec<Review>, MarketplaceError> {
        self.db.reviews_for_chef(chef_id).await
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

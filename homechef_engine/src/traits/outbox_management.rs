use crate::{
    db_types::{NewOutboxEntry, OutboxEntry},
    traits::MarketplaceError,
};

/// The durable staging table for rating events awaiting publication.
///
/// Entries are written by [`ReviewManagement::insert_review_with_events`](crate::traits::ReviewManagement) inside
/// the review transaction; the publisher worker drains them asynchronously. An entry is only ever marked published
/// after the transport has acknowledged it, which makes the pipeline at-least-once.
#[allow(async_fn_in_trait)]
pub trait OutboxManagement {
    /// Stages an entry outside of a review transaction. Used by operational tooling and tests; the review path
    /// stages its entries within its own transaction.
    async fn stage_entry(&self, entry: NewOutboxEntry) -> Result<OutboxEntry, MarketplaceError>;

    /// Fetches up to `limit` unpublished entries in creation order.
    async fn fetch_unpublished(&self, limit: i64) -> Result<Vec<OutboxEntry>, MarketplaceError>;

    /// Records transport acknowledgment. The entry will not be picked up again.
    async fn mark_published(&self, entry_id: i64) -> Result<(), MarketplaceError>;

    /// Records a failed publish attempt. The entry stays unpublished and will be retried.
    async fn record_publish_failure(&self, entry_id: i64, error: &str) -> Result<(), MarketplaceError>;
}

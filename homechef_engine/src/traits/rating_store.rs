use crate::{
    db_types::{EntityKind, RatingAggregate},
    traits::{MarketplaceError, RatingOutcome},
};

/// The consumer-side store for rating aggregates.
///
/// [`apply_rating`](Self::apply_rating) is the atomicity boundary that turns the transport's at-least-once delivery
/// into exactly-once effects: the idempotency insert and the aggregate update commit together, and a redelivered
/// event finds its idempotency record and becomes a no-op.
#[allow(async_fn_in_trait)]
pub trait RatingStore {
    /// Folds one review's stars into the aggregate for `(kind, entity_id)`.
    ///
    /// In a single transaction:
    /// 1. insert the idempotency record for `(kind, entity_id, review_id)`; if it already exists the event is a
    ///    duplicate delivery and [`RatingOutcome::Duplicate`] is returned without touching the aggregate;
    /// 2. otherwise apply `new_average = (old_average * old_count + stars) / (old_count + 1)` and bump the count as
    ///    one conditional upsert statement, so two events for the same entity arriving close together cannot lose
    ///    an update.
    ///
    /// Safe to retry: a retry after a failure re-attempts the idempotency insert, which the unique constraint makes
    /// idempotent itself.
    async fn apply_rating(
        &self,
        kind: EntityKind,
        entity_id: i64,
        review_id: i64,
        stars: i32,
    ) -> Result<RatingOutcome, MarketplaceError>;

    async fn fetch_aggregate(
        &self,
        kind: EntityKind,
        entity_id: i64,
    ) -> Result<Option<RatingAggregate>, MarketplaceError>;
}

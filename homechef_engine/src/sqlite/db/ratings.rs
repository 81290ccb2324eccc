use sqlx::SqliteConnection;

use crate::{
    db_types::{EntityKind, RatingAggregate},
    traits::MarketplaceError,
};

/// Claims the `(kind, entity, review)` triple in the idempotency ledger.
///
/// Returns `false` when the triple was already claimed, i.e. the event is a duplicate delivery. The insert itself
/// is idempotent under retry thanks to the primary-key constraint, which is what makes the whole apply path safe
/// to re-run after a failure.
pub(crate) async fn record_application(
    kind: EntityKind,
    entity_id: i64,
    review_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, MarketplaceError> {
    let result = sqlx::query(
        "INSERT INTO rating_events_applied (entity_kind, entity_id, review_id) VALUES ($1, $2, $3) ON CONFLICT \
         (entity_kind, entity_id, review_id) DO NOTHING",
    )
    .bind(kind)
    .bind(entity_id)
    .bind(review_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Folds one star rating into the running average as a single upsert.
///
/// The arithmetic runs inside the statement against the stored row, not against a value read earlier, so two
/// events for the same entity applied back to back both land — there is no read-then-write window to lose one in.
pub(crate) async fn fold_into_aggregate(
    kind: EntityKind,
    entity_id: i64,
    stars: i32,
    conn: &mut SqliteConnection,
) -> Result<RatingAggregate, MarketplaceError> {
    let aggregate = sqlx::query_as(
        r#"
            INSERT INTO rating_aggregates (entity_kind, entity_id, average_rating, review_count)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (entity_kind, entity_id) DO UPDATE SET
                average_rating = (average_rating * review_count + excluded.average_rating) / (review_count + 1.0),
                review_count = review_count + 1,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(kind)
    .bind(entity_id)
    .bind(f64::from(stars))
    .fetch_one(conn)
    .await?;
    Ok(aggregate)
}

pub(crate) async fn fetch_aggregate(
    kind: EntityKind,
    entity_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<RatingAggregate>, sqlx::Error> {
    let aggregate = sqlx::query_as("SELECT * FROM rating_aggregates WHERE entity_kind = $1 AND entity_id = $2")
        .bind(kind)
        .bind(entity_id)
        .fetch_optional(conn)
        .await?;
    Ok(aggregate)
}

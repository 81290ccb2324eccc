use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOutboxEntry, OutboxEntry},
    traits::MarketplaceError,
};

/// Stages an event for publication. Call inside the transaction that produces the event, so the entry exists
/// exactly when its originating business data does.
pub(crate) async fn stage(entry: NewOutboxEntry, conn: &mut SqliteConnection) -> Result<OutboxEntry, MarketplaceError> {
    let entry: OutboxEntry = sqlx::query_as(
        r#"
            INSERT INTO outbox (topic, key, payload)
            VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(entry.topic)
    .bind(entry.key)
    .bind(entry.payload)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Outbox entry #{} staged for topic {}", entry.id, entry.topic);
    Ok(entry)
}

/// Unpublished entries in creation order. `id` is monotonically assigned, so ordering by it preserves the order in
/// which events were staged.
pub(crate) async fn fetch_unpublished(
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OutboxEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM outbox WHERE published_at IS NULL ORDER BY id ASC LIMIT $1")
        .bind(limit)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}

pub(crate) async fn mark_published(entry_id: i64, conn: &mut SqliteConnection) -> Result<(), MarketplaceError> {
    let result = sqlx::query(
        "UPDATE outbox SET published_at = CURRENT_TIMESTAMP, attempts = attempts + 1 WHERE id = $1 AND published_at \
         IS NULL",
    )
    .bind(entry_id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(MarketplaceError::DatabaseError(format!("Outbox entry #{entry_id} missing or already published")));
    }
    Ok(())
}

pub(crate) async fn record_failure(
    entry_id: i64,
    error: &str,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceError> {
    sqlx::query("UPDATE outbox SET attempts = attempts + 1, last_error = $1 WHERE id = $2")
        .bind(error)
        .bind(entry_id)
        .execute(conn)
        .await?;
    Ok(())
}

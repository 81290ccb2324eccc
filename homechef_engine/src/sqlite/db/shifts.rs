use hc_common::Money;
use log::debug;
use sqlx::SqliteConnection;

use crate::{db_types::Shift, traits::MarketplaceError};

pub(crate) async fn active_shift_for_chef(
    chef_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Shift>, sqlx::Error> {
    let shift = sqlx::query_as("SELECT * FROM shifts WHERE chef_id = $1 AND is_active = 1")
        .bind(chef_id)
        .fetch_optional(conn)
        .await?;
    Ok(shift)
}

pub(crate) async fn fetch_shift(shift_id: i64, conn: &mut SqliteConnection) -> Result<Option<Shift>, sqlx::Error> {
    let shift = sqlx::query_as("SELECT * FROM shifts WHERE id = $1").bind(shift_id).fetch_optional(conn).await?;
    Ok(shift)
}

/// Opens a shift for the chef. The partial unique index on `(chef_id) WHERE is_active` backstops the
/// one-active-shift invariant, so a concurrent open loses with a unique violation, which is reported as
/// `ShiftAlreadyActive` just like the fast-path check.
pub(crate) async fn open_shift(chef_id: i64, conn: &mut SqliteConnection) -> Result<Shift, MarketplaceError> {
    if active_shift_for_chef(chef_id, conn).await?.is_some() {
        return Err(MarketplaceError::ShiftAlreadyActive(chef_id));
    }
    let result = sqlx::query_as("INSERT INTO shifts (chef_id) VALUES ($1) RETURNING *")
        .bind(chef_id)
        .fetch_one(conn)
        .await;
    match result {
        Ok(shift) => Ok(shift),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(MarketplaceError::ShiftAlreadyActive(chef_id))
        },
        Err(e) => Err(e.into()),
    }
}

/// Closes the chef's active shift, if any, freezing its profit total.
pub(crate) async fn close_shift(chef_id: i64, conn: &mut SqliteConnection) -> Result<Option<Shift>, sqlx::Error> {
    let shift = sqlx::query_as(
        "UPDATE shifts SET is_active = 0, closed_at = CURRENT_TIMESTAMP WHERE chef_id = $1 AND is_active = 1 \
         RETURNING *",
    )
    .bind(chef_id)
    .fetch_optional(conn)
    .await?;
    Ok(shift)
}

/// Adds `amount` to the shift's running profit as a single atomic increment. Orders delivered in parallel all
/// credit the same row without a lost update.
pub(crate) async fn credit_shift(
    shift_id: i64,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceError> {
    let result = sqlx::query("UPDATE shifts SET total_profit = total_profit + $1 WHERE id = $2")
        .bind(amount)
        .bind(shift_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(MarketplaceError::ShiftNotFound(shift_id));
    }
    debug!("🗃️ Shift #{shift_id} credited {amount}");
    Ok(())
}

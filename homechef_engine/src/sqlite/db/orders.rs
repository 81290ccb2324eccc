use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{CartItem, NewOrder, Order, OrderId, OrderItem, OrderTransition},
    order_objects::OrderQueryFilter,
    traits::MarketplaceError,
};

/// Inserts a new order using the given connection. This is not atomic on its own; embed the call in a transaction
/// and pass `&mut *tx` when the line items must land with it.
pub(crate) async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, MarketplaceError> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                chef_id,
                shift_id,
                user_id,
                address_id,
                total_price,
                leave_by_door,
                call_beforehand
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(order.chef_id)
    .bind(order.shift_id)
    .bind(order.user_id)
    .bind(order.address_id)
    .bind(order.total_price)
    .bind(order.leave_by_door)
    .bind(order.call_beforehand)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

/// Snapshots one cart line as an order item. Price and ingredient choices are copied, so later cart or dish edits
/// never reach back into order history.
pub(crate) async fn insert_order_item(
    order_id: OrderId,
    item: &CartItem,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, MarketplaceError> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO order_items (
                order_id,
                dish_id,
                size,
                quantity,
                unit_price,
                added_ingredients,
                removed_ingredients
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(item.dish_id)
    .bind(&item.size)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(&item.added_ingredients)
    .bind(&item.removed_ingredients)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub(crate) async fn fetch_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub(crate) async fn fetch_order_items(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`.
///
/// Resulting orders are ordered by `created_at` in ascending order.
pub(crate) async fn search_orders(
    filter: OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !filter.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(user_id) = filter.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(chef_id) = filter.chef_id {
        where_clause.push("chef_id = ");
        where_clause.push_bind_unseparated(chef_id);
    }
    if let Some(shift_id) = filter.shift_id {
        where_clause.push("shift_id = ");
        where_clause.push_bind_unseparated(shift_id);
    }
    if !filter.statuses.is_empty() {
        let statuses = filter.statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    if let Some(since) = filter.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = filter.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC");

    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    Ok(orders)
}

/// The compare-and-swap at the heart of the state machine.
///
/// The new status is written only if the persisted status is one of the operation's source states; otherwise no row
/// matches and `None` comes back, leaving the order exactly as it was. Concurrent callers racing on the same order
/// are serialised by the store — the loser sees `None`, never a clobbered status.
pub(crate) async fn try_transition(
    order_id: OrderId,
    op: OrderTransition,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, MarketplaceError> {
    let sources = op.source_states().iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
    let sql = format!(
        "UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status IN ({sources}) \
         RETURNING *"
    );
    let order = sqlx::query_as(&sql)
        .bind(op.target_state().to_string())
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

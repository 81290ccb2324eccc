use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{Address, CartItem, NewAddress, NewCartItem},
    traits::MarketplaceError,
};

/// The address a courier should head for: the most recently updated one on record.
pub(crate) async fn last_updated_address(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Address>, sqlx::Error> {
    let address =
        sqlx::query_as("SELECT * FROM addresses WHERE user_id = $1 ORDER BY updated_at DESC, id DESC LIMIT 1")
            .bind(user_id)
            .fetch_optional(conn)
            .await?;
    Ok(address)
}

pub(crate) async fn insert_address(
    address: NewAddress,
    conn: &mut SqliteConnection,
) -> Result<Address, MarketplaceError> {
    let address = sqlx::query_as(
        r#"
            INSERT INTO addresses (user_id, city, street, house, apartment, comment)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(address.user_id)
    .bind(address.city)
    .bind(address.street)
    .bind(address.house)
    .bind(address.apartment)
    .bind(address.comment)
    .fetch_one(conn)
    .await?;
    Ok(address)
}

pub(crate) async fn cart_items(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM cart_items WHERE user_id = $1 ORDER BY id")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub(crate) async fn insert_cart_item(
    item: NewCartItem,
    conn: &mut SqliteConnection,
) -> Result<CartItem, MarketplaceError> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO cart_items (
                user_id,
                chef_id,
                dish_id,
                size,
                quantity,
                unit_price,
                added_ingredients,
                removed_ingredients
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(item.user_id)
    .bind(item.chef_id)
    .bind(item.dish_id)
    .bind(item.size)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(Json(item.added_ingredients))
    .bind(Json(item.removed_ingredients))
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub(crate) async fn clear_cart(user_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id).execute(conn).await?;
    Ok(result.rows_affected())
}

use sqlx::SqliteConnection;

use crate::{
    db_types::{NewReview, OrderId, Review},
    traits::MarketplaceError,
};

/// Inserts the review row. New reviews are `verified` but not yet included in the public rating; the moderation
/// flow flips `include_in_rating` outside of this engine.
pub(crate) async fn insert_review(review: NewReview, conn: &mut SqliteConnection) -> Result<Review, MarketplaceError> {
    let review = sqlx::query_as(
        r#"
            INSERT INTO reviews (chef_id, user_id, order_id, stars, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(review.chef_id)
    .bind(review.user_id)
    .bind(review.order_id)
    .bind(review.stars)
    .bind(review.comment)
    .fetch_one(conn)
    .await?;
    Ok(review)
}

pub(crate) async fn review_for_order(
    order_id: OrderId,
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Review>, sqlx::Error> {
    let review = sqlx::query_as("SELECT * FROM reviews WHERE order_id = $1 AND user_id = $2 AND is_deleted = 0")
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(review)
}

pub(crate) async fn reviews_for_chef(chef_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Review>, sqlx::Error> {
    let reviews =
        sqlx::query_as("SELECT * FROM reviews WHERE chef_id = $1 AND is_deleted = 0 ORDER BY created_at DESC, id DESC")
            .bind(chef_id)
            .fetch_all(conn)
            .await?;
    Ok(reviews)
}

//! Fixture builders shared by the integration tests.
use hc_common::Money;

use crate::{
    db_types::{Address, CartItem, NewAddress, NewCartItem, Order, OrderId, Shift},
    traits::{AddressBook, CartManagement, MarketplaceError, ShiftManagement},
    OrderFlowApi,
    SqliteDatabase,
};

pub async fn seed_address(db: &SqliteDatabase, user_id: i64) -> Address {
    let address = NewAddress {
        user_id,
        city: "Kazan".to_string(),
        street: "Bauman st".to_string(),
        house: "12".to_string(),
        apartment: Some("4".to_string()),
        comment: None,
    };
    db.add_address(address).await.expect("Error seeding address")
}

/// Adds one cart line: `(chef_id, dish_id, quantity, unit_price)`.
pub async fn seed_cart_item(
    db: &SqliteDatabase,
    user_id: i64,
    chef_id: i64,
    dish_id: i64,
    quantity: i64,
    unit_price: Money,
) -> CartItem {
    let item = NewCartItem::new(user_id, chef_id, dish_id, quantity, unit_price);
    db.add_cart_item(item).await.expect("Error seeding cart item")
}

pub async fn open_shift_for(db: &SqliteDatabase, chef_id: i64) -> Shift {
    db.open_shift(chef_id).await.expect("Error opening shift")
}

/// Walks an order through the happy path to `Delivered`.
pub async fn deliver_order(api: &OrderFlowApi<SqliteDatabase>, order_id: OrderId) -> Result<Order, MarketplaceError> {
    api.accept_order(order_id).await?;
    api.call_delivery(order_id).await?;
    api.pick_up(order_id).await?;
    api.deliver(order_id).await
}

use crate::{
    db_types::{Address, CartItem, NewAddress, NewCartItem},
    traits::MarketplaceError,
};

/// The client cart, as consumed by the checkout flow. Clearing the cart after checkout is the caller's decision;
/// the assembler never does it implicitly.
#[allow(async_fn_in_trait)]
pub trait CartManagement {
    async fn cart_items_for_user(&self, user_id: i64) -> Result<Vec<CartItem>, MarketplaceError>;

    async fn add_cart_item(&self, item: NewCartItem) -> Result<CartItem, MarketplaceError>;

    /// Empties the user's cart, returning the number of removed lines.
    async fn clear_cart(&self, user_id: i64) -> Result<u64, MarketplaceError>;
}

/// Client delivery addresses. Checkout uses the most recently updated address.
#[allow(async_fn_in_trait)]
pub trait AddressBook {
    async fn last_updated_address_for_user(&self, user_id: i64) -> Result<Option<Address>, MarketplaceError>;

    async fn add_address(&self, address: NewAddress) -> Result<Address, MarketplaceError>;
}

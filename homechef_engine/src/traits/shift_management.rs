use hc_common::Money;

use crate::{db_types::Shift, traits::MarketplaceError};

/// The shift profit ledger. A chef has at most one active shift at any time; new orders attach to it and delivered
/// orders credit it.
#[allow(async_fn_in_trait)]
pub trait ShiftManagement {
    /// Opens a new working shift for the chef. Fails with [`MarketplaceError::ShiftAlreadyActive`] if one is
    /// already open.
    async fn open_shift(&self, chef_id: i64) -> Result<Shift, MarketplaceError>;

    /// Closes the chef's active shift, freezing its accumulated profit. Returns `None` (a no-op) when the chef has
    /// no active shift.
    async fn close_shift(&self, chef_id: i64) -> Result<Option<Shift>, MarketplaceError>;

    async fn active_shift_for_chef(&self, chef_id: i64) -> Result<Option<Shift>, MarketplaceError>;

    async fn fetch_shift(&self, shift_id: i64) -> Result<Option<Shift>, MarketplaceError>;

    /// Adds `amount` to the shift's accumulated profit.
    ///
    /// The increment is a single atomic `SET total_profit = total_profit + ?`, never a read-modify-write, so
    /// concurrent credits from orders delivered in parallel cannot lose updates.
    async fn credit_shift(&self, shift_id: i64, amount: Money) -> Result<(), MarketplaceError>;
}

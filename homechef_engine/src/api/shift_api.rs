use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, Shift},
    traits::{MarketplaceError, OrderManagement, ShiftManagement},
};

/// `ShiftApi` manages chef working shifts and their profit ledger.
pub struct ShiftApi<B> {
    db: B,
}

impl<B> Debug for ShiftApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ShiftApi")
    }
}

impl<B> ShiftApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> ShiftApi<B>
where B: ShiftManagement + OrderManagement
{
    pub async fn open_shift(&self, chef_id: i64) -> Result<Shift, MarketplaceError> {
        let shift = self.db.open_shift(chef_id).await?;
        info!("🕰️ Chef #{chef_id} opened shift #{}", shift.id);
        Ok(shift)
    }

    /// Closes the chef's active shift and freezes its profit total. A no-op when nothing is open.
    pub async fn close_shift(&self, chef_id: i64) -> Result<Option<Shift>, MarketplaceError> {
        let shift = self.db.close_shift(chef_id).await?;
        match &shift {
            Some(s) => info!("🕰️ Chef #{chef_id} closed shift #{} with total profit {}", s.id, s.total_profit),
            None => debug!("🕰️ Chef #{chef_id} asked to close a shift, but none was active"),
        }
        Ok(shift)
    }

    pub async fn active_shift_for_chef(&self, chef_id: i64) -> Result<Option<Shift>, MarketplaceError> {
        self.db.active_shift_for_chef(chef_id).await
    }

    pub async fn orders_for_shift(&self, shift_id: i64) -> Result<Vec<Order>, MarketplaceError> {
        self.db.orders_for_shift(shift_id).await
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

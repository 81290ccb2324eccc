use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderItem, OrderStatusType};

/// Criteria for the order read paths. Empty fields are not applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQueryFilter {
    pub user_id: Option<i64>,
    pub chef_id: Option<i64>,
    pub shift_id: Option<i64>,
    pub statuses: Vec<OrderStatusType>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_chef_id(mut self, chef_id: i64) -> Self {
        self.chef_id = Some(chef_id);
        self
    }

    pub fn with_shift_id(mut self, shift_id: i64) -> Self {
        self.shift_id = Some(shift_id);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.chef_id.is_none()
            && self.shift_id.is_none()
            && self.statuses.is_empty()
            && self.since.is_none()
            && self.until.is_none()
    }
}

/// An order together with its line items, as returned by the detail read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderWithItems {
    pub fn distinct_dish_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.items.iter().map(|i| i.dish_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

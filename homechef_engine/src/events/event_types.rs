use serde::{Deserialize, Serialize};

use crate::db_types::Order;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDeliveredEvent {
    pub order: Order,
}

impl OrderDeliveredEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRejectedEvent {
    pub order: Order,
}

impl OrderRejectedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

use serde::{Deserialize, Serialize};

use crate::{
    db_types::NewOutboxEntry,
    transport::{CHEF_REVIEWS_TOPIC, DISH_REVIEWS_TOPIC},
};

//--------------------------------------  ChefReviewMessage  ---------------------------------------------------------
/// Wire payload of the `chef_reviews` topic.
///
/// Keyed by chef id alone, so every event for one chef lands on the same partition and is applied in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChefReviewMessage {
    pub entity_id: i64,
    pub review_id: i64,
    pub stars: i32,
}

impl ChefReviewMessage {
    pub fn key(&self) -> String {
        self.entity_id.to_string()
    }

    pub fn to_outbox_entry(&self) -> Result<NewOutboxEntry, serde_json::Error> {
        Ok(NewOutboxEntry {
            topic: CHEF_REVIEWS_TOPIC.to_string(),
            key: self.key(),
            payload: serde_json::to_string(self)?,
        })
    }
}

//--------------------------------------  DishReviewMessage  ---------------------------------------------------------
/// Wire payload of the `dish_reviews` topic.
///
/// One review fans out to many dishes, so the key carries both ids to stay unique per (dish, review) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishReviewMessage {
    pub dish_id: i64,
    pub review_id: i64,
    pub rating: i32,
}

impl DishReviewMessage {
    pub fn key(&self) -> String {
        format!("{}:{}", self.dish_id, self.review_id)
    }

    pub fn to_outbox_entry(&self) -> Result<NewOutboxEntry, serde_json::Error> {
        Ok(NewOutboxEntry {
            topic: DISH_REVIEWS_TOPIC.to_string(),
            key: self.key(),
            payload: serde_json::to_string(self)?,
        })
    }
}

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use hc_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

//--------------------------------------       OrderId       ---------------------------------------------------------
/// A lightweight wrapper around the primary key of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub i64);

impl From<i64> for OrderId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been placed by the client and is waiting for the chef.
    Created,
    /// The chef has accepted the order and started cooking.
    Accepted,
    /// Cooking is finished and a courier has been called.
    Cooked,
    /// A courier has picked the order up.
    InDelivery,
    /// The order has reached the client. Terminal.
    Delivered,
    /// The order was turned down by the chef. Terminal.
    Rejected,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Delivered | OrderStatusType::Rejected)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Created => write!(f, "Created"),
            OrderStatusType::Accepted => write!(f, "Accepted"),
            OrderStatusType::Cooked => write!(f, "Cooked"),
            OrderStatusType::InDelivery => write!(f, "InDelivery"),
            OrderStatusType::Delivered => write!(f, "Delivered"),
            OrderStatusType::Rejected => write!(f, "Rejected"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(Self::Created),
            "Accepted" => Ok(Self::Accepted),
            "Cooked" => Ok(Self::Cooked),
            "InDelivery" => Ok(Self::InDelivery),
            "Delivered" => Ok(Self::Delivered),
            "Rejected" => Ok(Self::Rejected),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------   OrderTransition   ---------------------------------------------------------
/// The operations of the order state machine.
///
/// Each operation carries its own set of permitted source states and a single target state. The status write is a
/// compare-and-swap against the source set, so a caller holding a stale view of the order loses the race and
/// receives [`MarketplaceError::InvalidTransition`](crate::traits::MarketplaceError::InvalidTransition) instead of
/// clobbering the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderTransition {
    /// `Created` → `Accepted`. The chef takes the order.
    Accept,
    /// `Accepted` → `Cooked`. Cooking finished, a courier is requested.
    CallDelivery,
    /// `Cooked` → `InDelivery`. The courier collects the order.
    PickUp,
    /// `InDelivery` → `Delivered`. Also credits the shift with the order total.
    Deliver,
    /// `Created` or `Accepted` → `Rejected`.
    Reject,
}

impl OrderTransition {
    pub fn source_states(&self) -> &'static [OrderStatusType] {
        use OrderStatusType::*;
        match self {
            OrderTransition::Accept => &[Created],
            OrderTransition::CallDelivery => &[Accepted],
            OrderTransition::PickUp => &[Cooked],
            OrderTransition::Deliver => &[InDelivery],
            OrderTransition::Reject => &[Created, Accepted],
        }
    }

    pub fn target_state(&self) -> OrderStatusType {
        use OrderStatusType::*;
        match self {
            OrderTransition::Accept => Accepted,
            OrderTransition::CallDelivery => Cooked,
            OrderTransition::PickUp => InDelivery,
            OrderTransition::Deliver => Delivered,
            OrderTransition::Reject => Rejected,
        }
    }
}

impl Display for OrderTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderTransition::Accept => write!(f, "Accept"),
            OrderTransition::CallDelivery => write!(f, "CallDelivery"),
            OrderTransition::PickUp => write!(f, "PickUp"),
            OrderTransition::Deliver => write!(f, "Deliver"),
            OrderTransition::Reject => write!(f, "Reject"),
        }
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub chef_id: i64,
    /// The shift the order was sold under. Profit is credited here on delivery.
    pub shift_id: i64,
    pub user_id: i64,
    pub address_id: i64,
    /// Captured at order-creation time; immutable afterwards.
    pub total_price: Money,
    pub status: OrderStatusType,
    pub leave_by_door: bool,
    pub call_beforehand: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder      ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub chef_id: i64,
    pub shift_id: i64,
    pub user_id: i64,
    pub address_id: i64,
    pub total_price: Money,
    pub leave_by_door: bool,
    pub call_beforehand: bool,
}

//--------------------------------------   CheckoutOptions   ---------------------------------------------------------
/// Client-selected delivery preferences supplied at checkout.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CheckoutOptions {
    pub leave_by_door: bool,
    pub call_beforehand: bool,
}

//--------------------------------------      OrderItem      ---------------------------------------------------------
/// A line item on an order. `unit_price` is a snapshot taken when the order was assembled, so later price changes
/// to the underlying dish never affect historical orders.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub dish_id: i64,
    pub size: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub added_ingredients: Json<Vec<String>>,
    pub removed_ingredients: Json<Vec<String>>,
}

impl OrderItem {
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

//--------------------------------------      CartItem       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    pub user_id: i64,
    pub chef_id: i64,
    pub dish_id: i64,
    pub size: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub added_ingredients: Json<Vec<String>>,
    pub removed_ingredients: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }
}

#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub user_id: i64,
    pub chef_id: i64,
    pub dish_id: i64,
    pub size: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub added_ingredients: Vec<String>,
    pub removed_ingredients: Vec<String>,
}

impl NewCartItem {
    pub fn new(user_id: i64, chef_id: i64, dish_id: i64, quantity: i64, unit_price: Money) -> Self {
        Self {
            user_id,
            chef_id,
            dish_id,
            size: "standard".to_string(),
            quantity,
            unit_price,
            added_ingredients: Vec::new(),
            removed_ingredients: Vec::new(),
        }
    }
}

//--------------------------------------       Address       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Address {
    pub id: i64,
    pub user_id: i64,
    pub city: String,
    pub street: String,
    pub house: String,
    pub apartment: Option<String>,
    pub comment: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAddress {
    pub user_id: i64,
    pub city: String,
    pub street: String,
    pub house: String,
    pub apartment: Option<String>,
    pub comment: Option<String>,
}

//--------------------------------------        Shift        ---------------------------------------------------------
/// A chef's working window. `total_profit` accumulates the totals of delivered orders sold under the shift.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Shift {
    pub id: i64,
    pub chef_id: i64,
    pub is_active: bool,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub total_profit: Money,
}

//--------------------------------------       Review        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub chef_id: i64,
    pub user_id: i64,
    pub order_id: OrderId,
    pub stars: i32,
    pub comment: Option<String>,
    pub verified: bool,
    /// Stays false until moderation clears the review. Moderation itself lives outside the engine.
    pub include_in_rating: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub chef_id: i64,
    pub user_id: i64,
    pub order_id: OrderId,
    pub stars: i32,
    pub comment: Option<String>,
}

impl NewReview {
    pub fn new(chef_id: i64, user_id: i64, order_id: OrderId, stars: i32) -> Self {
        Self { chef_id, user_id, order_id, stars, comment: None }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

//--------------------------------------      EntityKind     ---------------------------------------------------------
/// The kind of entity a rating aggregate belongs to. Stored and transmitted in lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Chef,
    Dish,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Chef => write!(f, "chef"),
            EntityKind::Dish => write!(f, "dish"),
        }
    }
}

impl FromStr for EntityKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chef" => Ok(Self::Chef),
            "dish" => Ok(Self::Dish),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------   RatingAggregate   ---------------------------------------------------------
/// The running average rating of a chef or dish. Mutated only by the rating store's single-statement upsert, never
/// read-modify-written elsewhere.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct RatingAggregate {
    pub entity_kind: EntityKind,
    pub entity_id: i64,
    pub average_rating: f64,
    pub review_count: i64,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     OutboxEntry     ---------------------------------------------------------
/// A rating event staged for publication. Written in the same transaction as the review it derives from, so a
/// crash between commit and publish loses nothing: the publisher picks the row up on its next pass.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub id: i64,
    pub topic: String,
    pub key: String,
    pub payload: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl OutboxEntry {
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOutboxEntry {
    pub topic: String,
    pub key: String,
    pub payload: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transition_table_is_strict() {
        use OrderStatusType::*;
        assert_eq!(OrderTransition::Accept.source_states(), &[Created]);
        assert_eq!(OrderTransition::CallDelivery.source_states(), &[Accepted]);
        assert_eq!(OrderTransition::PickUp.source_states(), &[Cooked]);
        assert_eq!(OrderTransition::Deliver.source_states(), &[InDelivery]);
        assert_eq!(OrderTransition::Reject.source_states(), &[Created, Accepted]);
        // No operation ever leads out of a terminal state.
        for op in [
            OrderTransition::Accept,
            OrderTransition::CallDelivery,
            OrderTransition::PickUp,
            OrderTransition::Deliver,
            OrderTransition::Reject,
        ] {
            assert!(!op.source_states().iter().any(OrderStatusType::is_terminal));
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in
            [OrderStatusType::Created, OrderStatusType::InDelivery, OrderStatusType::Delivered, OrderStatusType::Rejected]
        {
            assert_eq!(status.to_string().parse::<OrderStatusType>().unwrap(), status);
        }
        assert!("Paid".parse::<OrderStatusType>().is_err());
    }
}

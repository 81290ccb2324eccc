//! HomeChef Marketplace Engine
//!
//! The engine contains the core logic of the HomeChef marketplace backend: assembling carts into orders, driving
//! the order status lifecycle, crediting chef shifts, and feeding submitted reviews through the asynchronous
//! rating-aggregation pipeline. It is transport- and server-agnostic.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@traits`] and the SQLite backend). You should never need to access the
//!    database directly. Instead, use the public APIs provided by the engine. The exception is the data types used
//!    in the database, which are defined in the `db_types` module and are public.
//! 2. The public APIs ([`OrderFlowApi`], [`ReviewApi`], [`ShiftApi`]). These provide the order checkout and status
//!    flows, review submission, and shift management. Specific backends need to implement the traits in
//!    [`mod@traits`] in order to act as a backend for the HomeChef server.
//! 3. The asynchronous pipeline ([`mod@transport`] and [`mod@workers`]): the outbox publisher that moves staged
//!    rating events onto the message transport, and the rating workers that fold them into per-chef and per-dish
//!    aggregates exactly once.
//!
//! The engine also provides a set of in-process events that can be subscribed to. These events are emitted when
//! certain actions occur, for example when an order is delivered. A simple actor framework is used so that you can
//! easily hook into these events and perform custom actions, such as sending notifications.
mod api;
#[cfg(feature = "sqlite")]
mod sqlite;

pub mod db_types;
pub mod events;
pub mod order_objects;
#[cfg(feature = "sqlite")]
pub mod test_utils;
pub mod traits;
pub mod transport;
pub mod workers;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use api::{OrderFlowApi, ReviewApi, ShiftApi};
pub use traits::{
    AddressBook,
    CartManagement,
    MarketplaceDatabase,
    MarketplaceError,
    OrderManagement,
    OutboxManagement,
    RatingOutcome,
    RatingStore,
    ReviewManagement,
    ShiftManagement,
};

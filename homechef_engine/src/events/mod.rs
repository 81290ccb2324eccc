//! In-process event hooks.
//!
//! These are fire-and-forget notifications emitted after a state change has committed, e.g. to tell a client their
//! order is at the door. They are not part of the durable rating pipeline (that goes through the outbox); a lost
//! hook loses a notification, never data.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::{OrderDeliveredEvent, OrderRejectedEvent};
pub use hooks::{EventHandlers, EventHooks, EventProducers};

//! Long-lived worker loops of the rating pipeline.
//!
//! The [`OutboxPublisher`] moves staged rating events from the outbox onto the message transport; the
//! [`RatingWorker`]s consume them and fold them into the aggregates. Workers share no in-process state — all
//! coordination goes through the durable store and the transport — so any number of them can run across
//! processes. Each worker takes a `tokio::sync::watch` receiver for graceful shutdown: it stops pulling new work
//! but finishes and commits whatever is in flight first.
mod outbox_worker;
mod rating_worker;

pub use outbox_worker::{OutboxPublisher, PublisherConfig};
pub use rating_worker::{RatingWorker, RatingWorkerConfig};
use thiserror::Error;

use crate::{traits::MarketplaceError, transport::TransportError};

#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    #[error("{0}")]
    Storage(#[from] MarketplaceError),
    #[error("{0}")]
    Transport(#[from] TransportError),
}

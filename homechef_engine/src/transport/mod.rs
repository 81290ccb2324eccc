//! The message transport boundary of the rating pipeline.
//!
//! The engine assumes an at-least-once, ordered-by-key transport as infrastructure. Everything it needs from that
//! transport is captured by two narrow traits: [`MessageTransport`] on the producing side and [`MessageSource`] on
//! the consuming side. The Kafka implementation lives behind the `kafka` feature; the in-process implementation in
//! [`memory`] backs tests and single-process deployments.
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod memory;

mod messages;

pub use messages::{ChefReviewMessage, DishReviewMessage};
use thiserror::Error;

/// Topic carrying one rating event per (chef, review) pair, keyed by chef id.
pub const CHEF_REVIEWS_TOPIC: &str = "chef_reviews";
/// Topic carrying one rating event per (dish, review) pair, keyed by `dish_id:review_id`.
pub const DISH_REVIEWS_TOPIC: &str = "dish_reviews";

/// Malformed payloads are parked on a sibling topic so they never block a partition.
pub fn dead_letter_topic(topic: &str) -> String {
    format!("{topic}_dlq")
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Invalid transport configuration: {0}")]
    ConfigurationError(String),
    #[error("Failed to publish to {topic}: {reason}")]
    PublishFailed { topic: String, reason: String },
    #[error("Failed to consume: {0}")]
    ConsumeError(String),
    #[error("The transport has been closed")]
    Closed,
}

/// A message handed to a consumer. `partition`/`offset` identify the message for commit purposes; the in-process
/// transport fills them with a single synthetic partition.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub key: Option<String>,
    pub payload: Vec<u8>,
    pub partition: i32,
    pub offset: i64,
}

/// The producing side of the transport. Publishing is keyed: the transport guarantees that messages sharing a key
/// are delivered in order to a single consumer at a time, which is what lets rating workers for the same entity
/// kind scale horizontally.
#[allow(async_fn_in_trait)]
pub trait MessageTransport: Clone + Send + Sync + 'static {
    /// Publishes one message and resolves once the transport has acknowledged it.
    fn publish(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;
}

/// The consuming side of the transport: a single subscription from which messages are pulled one at a time.
///
/// A message is redeliverable until [`commit`](Self::commit) is called for it; workers therefore commit only after
/// their effects have durably landed.
#[allow(async_fn_in_trait)]
pub trait MessageSource: Send {
    /// Waits for the next message. Returns `None` once the subscription is exhausted and closed.
    fn next_message(
        &mut self,
    ) -> impl std::future::Future<Output = Option<Result<InboundMessage, TransportError>>> + Send;

    /// Acknowledges the message so it will not be delivered again.
    fn commit(
        &mut self,
        message: &InboundMessage,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;
}

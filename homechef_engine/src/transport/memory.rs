//! An in-process transport backed by tokio channels.
//!
//! Per topic, messages are delivered in publication order to a single subscriber, which is exactly the ordering
//! guarantee the rating workers rely on. Publishes before any subscription exists are buffered and replayed on
//! subscribe, so tests can stage traffic up front. Used by the integration tests and by single-process server
//! deployments that have no Kafka at hand.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use log::warn;
use tokio::sync::mpsc;

use crate::transport::{InboundMessage, MessageSource, MessageTransport, TransportError};

#[derive(Default)]
struct TopicState {
    sender: Option<mpsc::UnboundedSender<InboundMessage>>,
    pending: Vec<InboundMessage>,
    next_offset: i64,
}

#[derive(Clone, Default)]
pub struct InMemoryTransport {
    topics: Arc<Mutex<HashMap<String, TopicState>>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the (single) subscription for a topic. Messages published before this call are delivered first.
    pub fn subscribe(&self, topic: &str) -> MemorySource {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut topics = self.topics.lock().expect("in-memory transport lock poisoned");
        let state = topics.entry(topic.to_string()).or_default();
        for message in state.pending.drain(..) {
            // The receiver is still in scope, so the send cannot fail here.
            let _ = sender.send(message);
        }
        if state.sender.replace(sender).is_some() {
            warn!("📬️ Topic {topic} was already subscribed; replacing the previous subscription");
        }
        MemorySource { receiver }
    }
}

impl MessageTransport for InMemoryTransport {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), TransportError> {
        let mut topics = self.topics.lock().expect("in-memory transport lock poisoned");
        let state = topics.entry(topic.to_string()).or_default();
        let message = InboundMessage {
            topic: topic.to_string(),
            key: Some(key.to_string()),
            payload: payload.to_vec(),
            partition: 0,
            offset: state.next_offset,
        };
        state.next_offset += 1;
        match &state.sender {
            Some(sender) => sender
                .send(message)
                .map_err(|_| TransportError::PublishFailed { topic: topic.to_string(), reason: "subscriber gone".into() }),
            None => {
                state.pending.push(message);
                Ok(())
            },
        }
    }
}

pub struct MemorySource {
    receiver: mpsc::UnboundedReceiver<InboundMessage>,
}

impl MessageSource for MemorySource {
    async fn next_message(&mut self) -> Option<Result<InboundMessage, TransportError>> {
        self.receiver.recv().await.map(Ok)
    }

    async fn commit(&mut self, _message: &InboundMessage) -> Result<(), TransportError> {
        // Channel delivery is destructive, so there is nothing to acknowledge.
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn publishes_before_subscribe_are_replayed_in_order() {
        let transport = InMemoryTransport::new();
        transport.publish("t", "a", b"one").await.unwrap();
        transport.publish("t", "b", b"two").await.unwrap();
        let mut source = transport.subscribe("t");
        transport.publish("t", "c", b"three").await.unwrap();

        for expected in [&b"one"[..], b"two", b"three"] {
            let msg = source.next_message().await.unwrap().unwrap();
            assert_eq!(msg.payload, expected);
            source.commit(&msg).await.unwrap();
        }
    }

    #[tokio::test]
    async fn offsets_are_per_topic_and_monotonic() {
        let transport = InMemoryTransport::new();
        transport.publish("x", "k", b"0").await.unwrap();
        transport.publish("y", "k", b"0").await.unwrap();
        transport.publish("x", "k", b"1").await.unwrap();
        let mut x = transport.subscribe("x");
        let first = x.next_message().await.unwrap().unwrap();
        let second = x.next_message().await.unwrap().unwrap();
        assert_eq!((first.offset, second.offset), (0, 1));
    }
}

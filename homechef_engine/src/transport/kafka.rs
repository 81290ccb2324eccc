//! Kafka implementation of the transport traits.
//!
//! The producer publishes keyed records and waits for broker acknowledgment before reporting success, so the outbox
//! publisher never marks an entry published that the broker has not accepted. Consumers run with auto-commit
//! disabled; offsets are committed explicitly by the worker once the message's effects are durable, which keeps
//! delivery at-least-once across restarts.
use std::time::Duration;

use rdkafka::{
    consumer::{CommitMode, Consumer, StreamConsumer},
    producer::{FutureProducer, FutureRecord},
    ClientConfig,
    Message,
    Offset,
    TopicPartitionList,
};

use crate::transport::{InboundMessage, MessageSource, MessageTransport, TransportError};

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct KafkaTransport {
    producer: FutureProducer,
}

impl KafkaTransport {
    pub fn new(brokers: &str) -> Result<Self, TransportError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| TransportError::ConfigurationError(e.to_string()))?;
        Ok(Self { producer })
    }
}

impl MessageTransport for KafkaTransport {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), TransportError> {
        let record = FutureRecord::to(topic).payload(payload).key(key);
        self.producer
            .send(record, PUBLISH_TIMEOUT)
            .await
            .map_err(|(e, _)| TransportError::PublishFailed { topic: topic.to_string(), reason: e.to_string() })?;
        Ok(())
    }
}

pub struct KafkaSource {
    consumer: StreamConsumer,
}

impl KafkaSource {
    /// Joins `group_id` and subscribes to `topic`. One consumer group per entity kind keeps the per-key ordering
    /// guarantee: two workers in the same group never hold the same partition at once.
    pub fn subscribe(brokers: &str, group_id: &str, topic: &str) -> Result<Self, TransportError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("group.id", group_id)
            .set("bootstrap.servers", brokers)
            .set("enable.partition.eof", "false")
            .set("session.timeout.ms", "6000")
            .set("enable.auto.commit", "false")
            .create()
            .map_err(|e| TransportError::ConfigurationError(e.to_string()))?;
        consumer.subscribe(&[topic]).map_err(|e| TransportError::ConfigurationError(e.to_string()))?;
        Ok(Self { consumer })
    }
}

impl MessageSource for KafkaSource {
    async fn next_message(&mut self) -> Option<Result<InboundMessage, TransportError>> {
        match self.consumer.recv().await {
            Ok(m) => Some(Ok(InboundMessage {
                topic: m.topic().to_string(),
                key: m.key().map(|k| String::from_utf8_lossy(k).into_owned()),
                payload: m.payload().map(<[u8]>::to_vec).unwrap_or_default(),
                partition: m.partition(),
                offset: m.offset(),
            })),
            Err(e) => Some(Err(TransportError::ConsumeError(e.to_string()))),
        }
    }

    async fn commit(&mut self, message: &InboundMessage) -> Result<(), TransportError> {
        let mut offsets = TopicPartitionList::new();
        offsets
            .add_partition_offset(&message.topic, message.partition, Offset::Offset(message.offset + 1))
            .map_err(|e| TransportError::ConsumeError(e.to_string()))?;
        self.consumer.commit(&offsets, CommitMode::Async).map_err(|e| TransportError::ConsumeError(e.to_string()))
    }
}

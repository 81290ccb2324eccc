//! Starts the asynchronous half of the system: the outbox publisher and the two rating workers.
//!
//! With `HC_KAFKA_BROKERS` configured, events travel through Kafka and any number of server processes can share
//! the consumer groups. Without it, a single in-process transport wires the publisher straight to the workers,
//! which keeps a one-process deployment fully functional.
use homechef_engine::{
    db_types::EntityKind,
    transport::{memory::InMemoryTransport, MessageSource, MessageTransport, CHEF_REVIEWS_TOPIC, DISH_REVIEWS_TOPIC},
    workers::{OutboxPublisher, PublisherConfig, RatingWorker, RatingWorkerConfig},
    SqliteDatabase,
};
use log::*;
use tokio::{sync::watch, task::JoinHandle};

use crate::{config::ServerConfig, errors::ServerError};

/// Starts the pipeline workers. Do not await the returned handles until shutdown has been signalled; they run
/// until then.
pub fn start_pipeline_workers(
    config: &ServerConfig,
    db: SqliteDatabase,
    shutdown: watch::Receiver<bool>,
) -> Result<Vec<JoinHandle<()>>, ServerError> {
    match &config.kafka_brokers {
        Some(brokers) => start_kafka_workers(config, brokers, db, shutdown),
        None => {
            info!("🕰️ Starting the rating pipeline on the in-process transport");
            let transport = InMemoryTransport::new();
            let chef_source = transport.subscribe(CHEF_REVIEWS_TOPIC);
            let dish_source = transport.subscribe(DISH_REVIEWS_TOPIC);
            Ok(spawn_workers(config, db, transport, chef_source, dish_source, shutdown))
        },
    }
}

#[cfg(feature = "kafka")]
fn start_kafka_workers(
    config: &ServerConfig,
    brokers: &str,
    db: SqliteDatabase,
    shutdown: watch::Receiver<bool>,
) -> Result<Vec<JoinHandle<()>>, ServerError> {
    use homechef_engine::transport::kafka::{KafkaSource, KafkaTransport};

    info!("🕰️ Starting the rating pipeline against Kafka at {brokers}");
    let transport = KafkaTransport::new(brokers).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let chef_group = format!("{}-chef-ratings", config.consumer_group_prefix);
    let dish_group = format!("{}-dish-ratings", config.consumer_group_prefix);
    let chef_source = KafkaSource::subscribe(brokers, &chef_group, CHEF_REVIEWS_TOPIC)
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let dish_source = KafkaSource::subscribe(brokers, &dish_group, DISH_REVIEWS_TOPIC)
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    Ok(spawn_workers(config, db, transport, chef_source, dish_source, shutdown))
}

#[cfg(not(feature = "kafka"))]
fn start_kafka_workers(
    _config: &ServerConfig,
    brokers: &str,
    _db: SqliteDatabase,
    _shutdown: watch::Receiver<bool>,
) -> Result<Vec<JoinHandle<()>>, ServerError> {
    Err(ServerError::InitializeError(format!(
        "HC_KAFKA_BROKERS is set to {brokers}, but this binary was built without the kafka feature"
    )))
}

fn spawn_workers<T, S>(
    config: &ServerConfig,
    db: SqliteDatabase,
    transport: T,
    chef_source: S,
    dish_source: S,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>>
where
    T: MessageTransport,
    S: MessageSource + 'static,
{
    let publisher_config = PublisherConfig { poll_interval: config.outbox_poll_interval, ..Default::default() };
    let publisher = OutboxPublisher::new(db.clone(), transport.clone(), publisher_config, shutdown.clone());
    let chef_worker = RatingWorker::new(
        EntityKind::Chef,
        db.clone(),
        chef_source,
        transport.clone(),
        RatingWorkerConfig::default(),
        shutdown.clone(),
    );
    let dish_worker =
        RatingWorker::new(EntityKind::Dish, db, dish_source, transport, RatingWorkerConfig::default(), shutdown);
    vec![
        tokio::spawn(publisher.run()),
        tokio::spawn(chef_worker.run()),
        tokio::spawn(dish_worker.run()),
    ]
}

use std::{env, time::Duration};

use log::*;

const DEFAULT_HC_HOST: &str = "127.0.0.1";
const DEFAULT_HC_PORT: u16 = 8480;
const DEFAULT_OUTBOX_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_CONSUMER_GROUP_PREFIX: &str = "homechef";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Kafka bootstrap servers. When unset, the rating pipeline runs over the in-process transport instead —
    /// fine for a single-process deployment, but events do not survive beyond it.
    pub kafka_brokers: Option<String>,
    /// How often the outbox publisher scans for unpublished entries.
    pub outbox_poll_interval: Duration,
    /// Consumer group ids are derived from this prefix, one group per entity kind.
    pub consumer_group_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HC_HOST.to_string(),
            port: DEFAULT_HC_PORT,
            database_url: String::default(),
            kafka_brokers: None,
            outbox_poll_interval: DEFAULT_OUTBOX_INTERVAL,
            consumer_group_prefix: DEFAULT_CONSUMER_GROUP_PREFIX.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("HC_HOST").ok().unwrap_or_else(|| DEFAULT_HC_HOST.into());
        let port = env::var("HC_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for HC_PORT. {e} Using the default, {DEFAULT_HC_PORT}, instead.");
                    DEFAULT_HC_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_HC_PORT);
        let database_url = env::var("HC_DATABASE_URL").unwrap_or_else(|_| {
            warn!("🪛️ HC_DATABASE_URL is not set. Using the engine default.");
            String::default()
        });
        let kafka_brokers = env::var("HC_KAFKA_BROKERS").ok().filter(|s| !s.trim().is_empty());
        if kafka_brokers.is_none() {
            warn!("🪛️ HC_KAFKA_BROKERS is not set. The rating pipeline will run on the in-process transport.");
        }
        let outbox_poll_interval = env::var("HC_OUTBOX_INTERVAL_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| {
                        error!("🪛️ {s} is not a valid value for HC_OUTBOX_INTERVAL_SECS. {e} Using the default.");
                        e
                    })
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_OUTBOX_INTERVAL);
        let consumer_group_prefix =
            env::var("HC_CONSUMER_GROUP_PREFIX").ok().unwrap_or_else(|| DEFAULT_CONSUMER_GROUP_PREFIX.into());
        Self { host, port, database_url, kafka_brokers, outbox_poll_interval, consumer_group_prefix }
    }
}

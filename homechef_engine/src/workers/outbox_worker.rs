use std::time::Duration;

use log::*;
use tokio::sync::watch;

use crate::{
    traits::OutboxManagement,
    transport::MessageTransport,
    workers::WorkerError,
};

#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// How often the outbox is scanned when everything is healthy.
    pub poll_interval: Duration,
    /// Maximum entries drained per pass.
    pub batch_size: i64,
    /// Upper bound for the failure backoff.
    pub max_backoff: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self { poll_interval: Duration::from_secs(5), batch_size: 100, max_backoff: Duration::from_secs(60) }
    }
}

/// Drains the outbox onto the message transport, at least once.
///
/// Entries are published in creation order and marked published only after the transport acknowledges them. A
/// publish failure is recorded on the entry (attempts / last_error), the pass stops so ordering is preserved, and
/// the next pass is delayed by an exponential backoff. An entry is therefore retried until it goes through —
/// publishing can duplicate but never lose, which is why the consumers deduplicate.
pub struct OutboxPublisher<B, T> {
    db: B,
    transport: T,
    config: PublisherConfig,
    shutdown: watch::Receiver<bool>,
}

impl<B, T> OutboxPublisher<B, T>
where
    B: OutboxManagement + Clone,
    T: MessageTransport,
{
    pub fn new(db: B, transport: T, config: PublisherConfig, shutdown: watch::Receiver<bool>) -> Self {
        Self { db, transport, config, shutdown }
    }

    pub async fn run(mut self) {
        info!("📦️ Outbox publisher started");
        let mut consecutive_failures: u32 = 0;
        loop {
            let delay = backoff_delay(self.config.poll_interval, consecutive_failures, self.config.max_backoff);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {},
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                    continue;
                },
            }
            match self.drain_once().await {
                Ok(published) => {
                    consecutive_failures = 0;
                    if published > 0 {
                        debug!("📦️ Published {published} outbox entries");
                    }
                },
                Err(e) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    warn!("📦️ Outbox pass failed ({consecutive_failures} in a row), backing off: {e}");
                },
            }
        }
        info!("📦️ Outbox publisher shut down");
    }

    /// One pass over the unpublished entries. Stops at the first failure so that entries keep leaving in creation
    /// order.
    pub async fn drain_once(&self) -> Result<usize, WorkerError> {
        let entries = self.db.fetch_unpublished(self.config.batch_size).await?;
        let mut published = 0usize;
        for entry in entries {
            match self.transport.publish(&entry.topic, &entry.key, entry.payload.as_bytes()).await {
                Ok(()) => {
                    self.db.mark_published(entry.id).await?;
                    trace!("📦️ Outbox entry #{} published to {}", entry.id, entry.topic);
                    published += 1;
                },
                Err(e) => {
                    self.db.record_publish_failure(entry.id, &e.to_string()).await?;
                    return Err(e.into());
                },
            }
        }
        Ok(published)
    }
}

fn backoff_delay(base: Duration, failures: u32, max: Duration) -> Duration {
    if failures == 0 {
        return base;
    }
    let factor = 2u32.saturating_pow(failures.min(16));
    base.saturating_mul(factor).min(max)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_secs(5);
        let max = Duration::from_secs(60);
        assert_eq!(backoff_delay(base, 0, max), Duration::from_secs(5));
        assert_eq!(backoff_delay(base, 1, max), Duration::from_secs(10));
        assert_eq!(backoff_delay(base, 2, max), Duration::from_secs(20));
        assert_eq!(backoff_delay(base, 3, max), Duration::from_secs(40));
        assert_eq!(backoff_delay(base, 4, max), Duration::from_secs(60));
        assert_eq!(backoff_delay(base, 30, max), Duration::from_secs(60));
    }
}

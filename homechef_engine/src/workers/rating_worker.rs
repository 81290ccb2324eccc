use std::time::Duration;

use log::*;
use tokio::sync::watch;

use crate::{
    db_types::EntityKind,
    traits::{RatingOutcome, RatingStore},
    transport::{dead_letter_topic, ChefReviewMessage, DishReviewMessage, InboundMessage, MessageSource, MessageTransport},
};

#[derive(Debug, Clone)]
pub struct RatingWorkerConfig {
    /// First retry delay after a store failure.
    pub retry_initial: Duration,
    /// Ceiling for the retry backoff.
    pub retry_max: Duration,
}

impl Default for RatingWorkerConfig {
    fn default() -> Self {
        Self { retry_initial: Duration::from_millis(500), retry_max: Duration::from_secs(30) }
    }
}

/// Consumes rating events for one entity kind and folds them into the aggregates.
///
/// Correctness under the transport's at-least-once delivery rests on two things, neither of which is an in-process
/// lock: the transport partitions by key, so events for the same entity are never handled by two workers at once,
/// and [`RatingStore::apply_rating`] is idempotent and atomic, so a redelivered or concurrently retried event
/// cannot double-count.
///
/// Per message:
/// * a payload that does not parse goes to the dead-letter topic and is acknowledged, so one bad message never
///   blocks its partition;
/// * a duplicate is acknowledged and skipped;
/// * a store failure is retried in place with exponential backoff, without acknowledging, so the message survives
///   a worker crash and is redelivered.
///
/// The offset is committed only after the apply outcome has durably committed.
pub struct RatingWorker<B, S, T> {
    kind: EntityKind,
    db: B,
    source: S,
    dlq: T,
    config: RatingWorkerConfig,
    shutdown: watch::Receiver<bool>,
}

impl<B, S, T> RatingWorker<B, S, T>
where
    B: RatingStore + Clone,
    S: MessageSource,
    T: MessageTransport,
{
    pub fn new(
        kind: EntityKind,
        db: B,
        source: S,
        dlq: T,
        config: RatingWorkerConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self { kind, db, source, dlq, config, shutdown }
    }

    pub async fn run(mut self) {
        info!("⭐️ Rating worker for {} reviews started", self.kind);
        loop {
            let message = tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                    continue;
                },
                next = self.source.next_message() => match next {
                    None => break,
                    Some(Err(e)) => {
                        warn!("⭐️ {} consumer error: {e}", self.kind);
                        continue;
                    },
                    Some(Ok(message)) => message,
                },
            };
            // The in-flight message is finished and committed even when shutdown is requested meanwhile;
            // only a store that keeps failing lets a shutdown interrupt (and the message is then redelivered).
            self.process_message(message).await;
        }
        info!("⭐️ Rating worker for {} reviews shut down", self.kind);
    }

    async fn process_message(&mut self, message: InboundMessage) {
        let update = match decode_rating_event(self.kind, &message.payload) {
            Ok(update) => update,
            Err(e) => {
                warn!("⭐️ Malformed payload on {}, dead-lettering it: {e}", message.topic);
                let topic = dead_letter_topic(&message.topic);
                let key = message.key.as_deref().unwrap_or_default();
                if let Err(e) = self.dlq.publish(&topic, key, &message.payload).await {
                    error!("⭐️ Could not dead-letter the message, dropping it: {e}");
                }
                self.ack(&message).await;
                return;
            },
        };

        let mut delay = self.config.retry_initial;
        loop {
            match self.db.apply_rating(self.kind, update.entity_id, update.review_id, update.stars).await {
                Ok(RatingOutcome::Applied(aggregate)) => {
                    debug!(
                        "⭐️ {} #{} now averages {:.2} over {} reviews",
                        self.kind, update.entity_id, aggregate.average_rating, aggregate.review_count
                    );
                    break;
                },
                Ok(RatingOutcome::Duplicate) => {
                    debug!(
                        "⭐️ Duplicate delivery of review #{} for {} #{}; acknowledged without changes",
                        update.review_id, self.kind, update.entity_id
                    );
                    break;
                },
                Err(e) => {
                    warn!("⭐️ Applying review #{} to {} #{} failed, retrying in {delay:?}: {e}",
                        update.review_id, self.kind, update.entity_id);
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {},
                        changed = self.shutdown.changed() => {
                            if changed.is_err() || *self.shutdown.borrow() {
                                // Not acknowledged: the transport will redeliver after restart.
                                return;
                            }
                        },
                    }
                    delay = (delay * 2).min(self.config.retry_max);
                },
            }
        }
        self.ack(&message).await;
    }

    async fn ack(&mut self, message: &InboundMessage) {
        if let Err(e) = self.source.commit(message).await {
            // The effect is already durable; at worst the message comes back and dedups.
            warn!("⭐️ Could not commit offset {} on {}: {e}", message.offset, message.topic);
        }
    }
}

struct RatingUpdate {
    entity_id: i64,
    review_id: i64,
    stars: i32,
}

fn decode_rating_event(kind: EntityKind, payload: &[u8]) -> Result<RatingUpdate, serde_json::Error> {
    match kind {
        EntityKind::Chef => {
            let message: ChefReviewMessage = serde_json::from_slice(payload)?;
            Ok(RatingUpdate { entity_id: message.entity_id, review_id: message.review_id, stars: message.stars })
        },
        EntityKind::Dish => {
            let message: DishReviewMessage = serde_json::from_slice(payload)?;
            Ok(RatingUpdate { entity_id: message.dish_id, review_id: message.review_id, stars: message.rating })
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decodes_both_wire_formats() {
        let update =
            decode_rating_event(EntityKind::Chef, br#"{"entity_id":9,"review_id":4,"stars":5}"#).unwrap();
        assert_eq!((update.entity_id, update.review_id, update.stars), (9, 4, 5));

        let update =
            decode_rating_event(EntityKind::Dish, br#"{"dish_id":11,"review_id":4,"rating":3}"#).unwrap();
        assert_eq!((update.entity_id, update.review_id, update.stars), (11, 4, 3));

        assert!(decode_rating_event(EntityKind::Chef, b"not json").is_err());
        // A chef payload on the dish topic is malformed too: the field names do not line up.
        assert!(decode_rating_event(EntityKind::Dish, br#"{"entity_id":9,"review_id":4,"stars":5}"#).is_err());
    }
}

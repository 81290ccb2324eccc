use std::time::Duration;

use hc_common::Money;
use homechef_engine::{
    db_types::{CheckoutOptions, EntityKind, NewReview},
    events::EventProducers,
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed,
    },
    transport::{
        dead_letter_topic,
        memory::InMemoryTransport,
        ChefReviewMessage,
        MessageSource,
        MessageTransport,
        CHEF_REVIEWS_TOPIC,
        DISH_REVIEWS_TOPIC,
    },
    workers::{OutboxPublisher, PublisherConfig, RatingWorker, RatingWorkerConfig},
    OrderFlowApi,
    RatingOutcome,
    RatingStore,
    ReviewApi,
    SqliteDatabase,
};
use tokio::{sync::watch, time::timeout};

async fn new_db(prefix: &str) -> SqliteDatabase {
    let url = random_db_path(prefix);
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

/// Waits until the aggregate for `(kind, entity_id)` reaches `count` reviews, or panics after a few seconds.
async fn await_review_count(db: &SqliteDatabase, kind: EntityKind, entity_id: i64, count: i64) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(aggregate) = db.fetch_aggregate(kind, entity_id).await.unwrap() {
            if aggregate.review_count >= count {
                return;
            }
        }
        if tokio::time::Instant::now() > deadline {
            panic!("aggregate for {kind} #{entity_id} never reached {count} reviews");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn applying_the_same_event_twice_equals_applying_it_once() {
    let db = new_db("rating_dedup").await;

    let first = db.apply_rating(EntityKind::Chef, 7, 42, 5).await.unwrap();
    let RatingOutcome::Applied(aggregate) = first else {
        panic!("the first application must not be a duplicate");
    };
    assert_eq!(aggregate.review_count, 1);
    assert_eq!(aggregate.average_rating, 5.0);

    // Simulated at-least-once redelivery.
    let second = db.apply_rating(EntityKind::Chef, 7, 42, 5).await.unwrap();
    assert!(second.is_duplicate());

    let aggregate = db.fetch_aggregate(EntityKind::Chef, 7).await.unwrap().unwrap();
    assert_eq!(aggregate.review_count, 1);
    assert_eq!(aggregate.average_rating, 5.0);
}

#[tokio::test]
async fn sequential_events_converge_to_the_mean() {
    let db = new_db("rating_mean").await;
    let stars = [5, 3, 4, 1, 5, 2];
    for (review_id, s) in stars.iter().enumerate() {
        let outcome = db.apply_rating(EntityKind::Dish, 33, review_id as i64, *s).await.unwrap();
        assert!(!outcome.is_duplicate());
    }
    let aggregate = db.fetch_aggregate(EntityKind::Dish, 33).await.unwrap().unwrap();
    assert_eq!(aggregate.review_count, stars.len() as i64);
    let mean = f64::from(stars.iter().sum::<i32>()) / stars.len() as f64;
    assert!((aggregate.average_rating - mean).abs() < 1e-9);

    // Different entities do not interfere.
    assert!(db.fetch_aggregate(EntityKind::Dish, 34).await.unwrap().is_none());
    assert!(db.fetch_aggregate(EntityKind::Chef, 33).await.unwrap().is_none());
}

#[tokio::test]
async fn the_pipeline_runs_end_to_end_from_review_to_aggregates() {
    let db = new_db("pipeline_e2e").await;
    let order_api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let review_api = ReviewApi::new(db.clone());

    // A delivered two-dish order, reviewed with 5 stars.
    seed::seed_address(&db, 1).await;
    seed::open_shift_for(&db, 10).await;
    seed::seed_cart_item(&db, 1, 10, 100, 2, Money::from(10_000)).await;
    seed::seed_cart_item(&db, 1, 10, 101, 1, Money::from(5_000)).await;
    let order = order_api.create_order(1, CheckoutOptions::default()).await.unwrap();
    seed::deliver_order(&order_api, order.id).await.unwrap();
    let review = review_api.submit_review(NewReview::new(10, 1, order.id, 5)).await.unwrap();

    let transport = InMemoryTransport::new();
    let chef_source = transport.subscribe(CHEF_REVIEWS_TOPIC);
    let dish_source = transport.subscribe(DISH_REVIEWS_TOPIC);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let chef_worker = RatingWorker::new(
        EntityKind::Chef,
        db.clone(),
        chef_source,
        transport.clone(),
        RatingWorkerConfig::default(),
        shutdown_rx.clone(),
    );
    let dish_worker = RatingWorker::new(
        EntityKind::Dish,
        db.clone(),
        dish_source,
        transport.clone(),
        RatingWorkerConfig::default(),
        shutdown_rx.clone(),
    );
    let chef_handle = tokio::spawn(chef_worker.run());
    let dish_handle = tokio::spawn(dish_worker.run());

    let publisher =
        OutboxPublisher::new(db.clone(), transport.clone(), PublisherConfig::default(), shutdown_rx.clone());
    assert_eq!(publisher.drain_once().await.unwrap(), 3);

    await_review_count(&db, EntityKind::Chef, 10, 1).await;
    await_review_count(&db, EntityKind::Dish, 100, 1).await;
    await_review_count(&db, EntityKind::Dish, 101, 1).await;

    let chef = db.fetch_aggregate(EntityKind::Chef, 10).await.unwrap().unwrap();
    assert_eq!((chef.average_rating, chef.review_count), (5.0, 1));

    // Redeliver the chef event verbatim: the worker must absorb it without double-counting.
    let replay = ChefReviewMessage { entity_id: 10, review_id: review.id, stars: 5 };
    transport
        .publish(CHEF_REVIEWS_TOPIC, &replay.key(), serde_json::to_string(&replay).unwrap().as_bytes())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let chef = db.fetch_aggregate(EntityKind::Chef, 10).await.unwrap().unwrap();
    assert_eq!((chef.average_rating, chef.review_count), (5.0, 1));

    // Graceful shutdown: both workers drain and exit.
    shutdown_tx.send(true).unwrap();
    timeout(Duration::from_secs(5), chef_handle).await.expect("chef worker did not shut down").unwrap();
    timeout(Duration::from_secs(5), dish_handle).await.expect("dish worker did not shut down").unwrap();
}

#[tokio::test]
async fn malformed_payloads_are_dead_lettered_and_do_not_block_the_partition() {
    let db = new_db("pipeline_dlq").await;
    let transport = InMemoryTransport::new();
    let chef_source = transport.subscribe(CHEF_REVIEWS_TOPIC);
    let mut dlq_source = transport.subscribe(&dead_letter_topic(CHEF_REVIEWS_TOPIC));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = RatingWorker::new(
        EntityKind::Chef,
        db.clone(),
        chef_source,
        transport.clone(),
        RatingWorkerConfig::default(),
        shutdown_rx,
    );
    let handle = tokio::spawn(worker.run());

    // Garbage first, then a valid event behind it.
    transport.publish(CHEF_REVIEWS_TOPIC, "7", b"{definitely not json").await.unwrap();
    let event = ChefReviewMessage { entity_id: 7, review_id: 1, stars: 4 };
    transport
        .publish(CHEF_REVIEWS_TOPIC, &event.key(), serde_json::to_string(&event).unwrap().as_bytes())
        .await
        .unwrap();

    // The good event lands even though the bad one arrived first.
    await_review_count(&db, EntityKind::Chef, 7, 1).await;
    let aggregate = db.fetch_aggregate(EntityKind::Chef, 7).await.unwrap().unwrap();
    assert_eq!((aggregate.average_rating, aggregate.review_count), (4.0, 1));

    // And the garbage is waiting in the dead-letter topic.
    let parked = timeout(Duration::from_secs(5), dlq_source.next_message())
        .await
        .expect("no dead letter arrived")
        .unwrap()
        .unwrap();
    assert_eq!(parked.payload, b"{definitely not json");

    shutdown_tx.send(true).unwrap();
    timeout(Duration::from_secs(5), handle).await.expect("worker did not shut down").unwrap();
}

#[tokio::test]
async fn out_of_order_delivery_still_converges_to_the_mean() {
    let db = new_db("pipeline_unordered").await;
    let transport = InMemoryTransport::new();
    let dish_source = transport.subscribe(DISH_REVIEWS_TOPIC);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = RatingWorker::new(
        EntityKind::Dish,
        db.clone(),
        dish_source,
        transport.clone(),
        RatingWorkerConfig::default(),
        shutdown_rx,
    );
    let handle = tokio::spawn(worker.run());

    // Reviews published newest-first, with one duplicate sprinkled in.
    for (review_id, rating) in [(3_i64, 2), (2, 5), (2, 5), (1, 5)] {
        let payload = format!(r#"{{"dish_id":55,"review_id":{review_id},"rating":{rating}}}"#);
        transport.publish(DISH_REVIEWS_TOPIC, &format!("55:{review_id}"), payload.as_bytes()).await.unwrap();
    }

    await_review_count(&db, EntityKind::Dish, 55, 3).await;
    let aggregate = db.fetch_aggregate(EntityKind::Dish, 55).await.unwrap().unwrap();
    assert_eq!(aggregate.review_count, 3);
    let mean = (2.0 + 5.0 + 5.0) / 3.0;
    assert!((aggregate.average_rating - mean).abs() < 1e-9);

    shutdown_tx.send(true).unwrap();
    timeout(Duration::from_secs(5), handle).await.expect("worker did not shut down").unwrap();
}

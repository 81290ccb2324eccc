use hc_common::Money;
use homechef_engine::{
    db_types::{CheckoutOptions, NewReview, Order},
    events::EventProducers,
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed,
    },
    transport::{memory::InMemoryTransport, MessageSource, MessageTransport, TransportError, CHEF_REVIEWS_TOPIC, DISH_REVIEWS_TOPIC},
    workers::{OutboxPublisher, PublisherConfig},
    MarketplaceError,
    OrderFlowApi,
    OutboxManagement,
    ReviewApi,
    SqliteDatabase,
};
use tokio::sync::watch;

async fn new_db(prefix: &str) -> SqliteDatabase {
    let url = random_db_path(prefix);
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

/// Seeds user 1 with an address and a two-dish cart from chef 10, then walks the order to `Delivered`.
async fn delivered_order(db: &SqliteDatabase) -> Order {
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    seed::seed_address(db, 1).await;
    seed::open_shift_for(db, 10).await;
    seed::seed_cart_item(db, 1, 10, 100, 2, Money::from(10_000)).await;
    seed::seed_cart_item(db, 1, 10, 101, 1, Money::from(5_000)).await;
    let order = api.create_order(1, CheckoutOptions::default()).await.expect("Error creating order");
    seed::deliver_order(&api, order.id).await.expect("Error delivering order")
}

#[tokio::test]
async fn star_ratings_are_bounded() {
    let db = new_db("review_bounds").await;
    let api = ReviewApi::new(db.clone());
    let order = delivered_order(&db).await;

    for stars in [0, 6, -1] {
        let err = api.submit_review(NewReview::new(10, 1, order.id, stars)).await.unwrap_err();
        assert!(matches!(err, MarketplaceError::InvalidRating(s) if s == stars), "got {err}");
    }
    // The rejected submissions left nothing behind.
    assert!(api.review_for_order(order.id, 1).await.unwrap().is_none());
    assert!(db.fetch_unpublished(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn only_the_buyer_of_a_delivered_order_may_review() {
    let db = new_db("review_eligibility").await;
    let api = ReviewApi::new(db.clone());
    let order_api = OrderFlowApi::new(db.clone(), EventProducers::default());

    // An order that is still in flight is not reviewable.
    seed::seed_address(&db, 1).await;
    seed::open_shift_for(&db, 10).await;
    seed::seed_cart_item(&db, 1, 10, 100, 1, Money::from(10_000)).await;
    let order = order_api.create_order(1, CheckoutOptions::default()).await.unwrap();
    let err = api.submit_review(NewReview::new(10, 1, order.id, 5)).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::OrderNotReviewable(_)), "got {err}");

    seed::deliver_order(&order_api, order.id).await.unwrap();

    // Somebody else's order is not reviewable either.
    let err = api.submit_review(NewReview::new(10, 99, order.id, 5)).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::OrderNotReviewable(_)), "got {err}");

    // The buyer reviews once; the second attempt is rejected at the application layer.
    api.submit_review(NewReview::new(10, 1, order.id, 4).with_comment("tasty")).await.unwrap();
    let err = api.submit_review(NewReview::new(10, 1, order.id, 5)).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::ReviewAlreadyExists { .. }), "got {err}");

    let reviews = api.reviews_for_chef(10).await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].stars, 4);
    assert!(reviews[0].verified);
    assert!(!reviews[0].include_in_rating);
}

#[tokio::test]
async fn a_review_stages_one_chef_event_and_one_per_distinct_dish() {
    let db = new_db("review_outbox").await;
    let api = ReviewApi::new(db.clone());
    let order = delivered_order(&db).await;

    let review = api.submit_review(NewReview::new(10, 1, order.id, 5)).await.unwrap();

    let entries = db.fetch_unpublished(10).await.unwrap();
    assert_eq!(entries.len(), 3);

    let chef: Vec<_> = entries.iter().filter(|e| e.topic == CHEF_REVIEWS_TOPIC).collect();
    assert_eq!(chef.len(), 1);
    assert_eq!(chef[0].key, "10");
    assert_eq!(chef[0].payload, format!(r#"{{"entity_id":10,"review_id":{},"stars":5}}"#, review.id));

    let mut dish_keys: Vec<_> = entries.iter().filter(|e| e.topic == DISH_REVIEWS_TOPIC).map(|e| e.key.clone()).collect();
    dish_keys.sort();
    assert_eq!(dish_keys, vec![format!("100:{}", review.id), format!("101:{}", review.id)]);
}

#[tokio::test]
async fn the_publisher_drains_entries_in_order_and_marks_them_published() {
    let db = new_db("outbox_drain").await;
    let api = ReviewApi::new(db.clone());
    let order = delivered_order(&db).await;
    api.submit_review(NewReview::new(10, 1, order.id, 5)).await.unwrap();

    let transport = InMemoryTransport::new();
    let mut chef_source = transport.subscribe(CHEF_REVIEWS_TOPIC);
    let mut dish_source = transport.subscribe(DISH_REVIEWS_TOPIC);

    let (_tx, rx) = watch::channel(false);
    let publisher = OutboxPublisher::new(db.clone(), transport.clone(), PublisherConfig::default(), rx);
    let published = publisher.drain_once().await.expect("Error draining outbox");
    assert_eq!(published, 3);

    assert!(db.fetch_unpublished(10).await.unwrap().is_empty());

    let chef_msg = chef_source.next_message().await.unwrap().unwrap();
    assert_eq!(chef_msg.key.as_deref(), Some("10"));
    let first_dish = dish_source.next_message().await.unwrap().unwrap();
    let second_dish = dish_source.next_message().await.unwrap().unwrap();
    assert!(first_dish.offset < second_dish.offset);

    // A second pass finds nothing: at-least-once, but not gratuitously more.
    assert_eq!(publisher.drain_once().await.unwrap(), 0);
}

/// A transport whose broker is down.
#[derive(Clone)]
struct DeadTransport;

impl MessageTransport for DeadTransport {
    async fn publish(&self, topic: &str, _key: &str, _payload: &[u8]) -> Result<(), TransportError> {
        Err(TransportError::PublishFailed { topic: topic.to_string(), reason: "broker unreachable".to_string() })
    }
}

#[tokio::test]
async fn failed_publishes_stay_unpublished_and_are_recorded() {
    let db = new_db("outbox_failure").await;
    let api = ReviewApi::new(db.clone());
    let order = delivered_order(&db).await;
    api.submit_review(NewReview::new(10, 1, order.id, 5)).await.unwrap();

    let (_tx, rx) = watch::channel(false);
    let publisher = OutboxPublisher::new(db.clone(), DeadTransport, PublisherConfig::default(), rx);
    publisher.drain_once().await.expect_err("the pass should fail");

    let entries = db.fetch_unpublished(10).await.unwrap();
    assert_eq!(entries.len(), 3, "nothing may be lost on publish failure");
    // The pass stops at the first failure, so exactly one entry carries the attempt.
    let attempted: Vec<_> = entries.iter().filter(|e| e.attempts > 0).collect();
    assert_eq!(attempted.len(), 1);
    assert!(attempted[0].last_error.as_deref().unwrap_or_default().contains("broker unreachable"));

    // Once the broker is back, the same entries go out.
    let transport = InMemoryTransport::new();
    let (_tx, rx) = watch::channel(false);
    let publisher = OutboxPublisher::new(db.clone(), transport, PublisherConfig::default(), rx);
    assert_eq!(publisher.drain_once().await.unwrap(), 3);
    assert!(db.fetch_unpublished(10).await.unwrap().is_empty());
}

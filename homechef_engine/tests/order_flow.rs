use hc_common::Money;
use homechef_engine::{
    db_types::{CheckoutOptions, OrderStatusType},
    events::EventProducers,
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed,
    },
    MarketplaceError,
    CartManagement,
    OrderFlowApi,
    OrderManagement,
    ShiftManagement,
    SqliteDatabase,
};

async fn new_db(prefix: &str) -> SqliteDatabase {
    let url = random_db_path(prefix);
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

fn order_api(db: &SqliteDatabase) -> OrderFlowApi<SqliteDatabase> {
    OrderFlowApi::new(db.clone(), EventProducers::default())
}

#[tokio::test]
async fn checkout_totals_and_price_snapshots() {
    let db = new_db("checkout_totals").await;
    let api = order_api(&db);
    seed::seed_address(&db, 1).await;
    seed::open_shift_for(&db, 10).await;
    // dish A: qty 2 at 100.00, dish B: qty 1 at 50.00
    seed::seed_cart_item(&db, 1, 10, 100, 2, Money::from(10_000)).await;
    seed::seed_cart_item(&db, 1, 10, 101, 1, Money::from(5_000)).await;

    let order = api.create_order(1, CheckoutOptions::default()).await.expect("Error creating order");
    assert_eq!(order.total_price, Money::from(25_000));
    assert_eq!(order.status, OrderStatusType::Created);
    assert_eq!(order.user_id, 1);
    assert_eq!(order.chef_id, 10);

    let items = db.fetch_order_items(order.id).await.unwrap();
    assert_eq!(items.len(), 2);
    let computed: Money = items.iter().map(|i| i.line_total()).sum();
    assert_eq!(computed, order.total_price);

    // Checkout never clears the cart; that is the caller's step.
    assert_eq!(db.cart_items_for_user(1).await.unwrap().len(), 2);

    // Re-pricing the dish later must not reach back into order history.
    db.clear_cart(1).await.unwrap();
    seed::seed_cart_item(&db, 1, 10, 100, 2, Money::from(99_900)).await;
    let unchanged = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(unchanged.total_price, Money::from(25_000));
}

#[tokio::test]
async fn checkout_preconditions_leave_no_rows_behind() {
    let db = new_db("checkout_preconditions").await;
    let api = order_api(&db);

    // No address on record.
    seed::seed_cart_item(&db, 2, 10, 100, 1, Money::from(1_000)).await;
    let err = api.create_order(2, CheckoutOptions::default()).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::NoDeliveryAddress(2)), "got {err}");

    // Empty cart.
    seed::seed_address(&db, 3).await;
    let err = api.create_order(3, CheckoutOptions::default()).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::EmptyCart(3)), "got {err}");

    // A cart spanning two chefs is rejected outright rather than attributed to one of them.
    seed::seed_address(&db, 4).await;
    seed::seed_cart_item(&db, 4, 10, 100, 1, Money::from(1_000)).await;
    seed::seed_cart_item(&db, 4, 11, 200, 1, Money::from(2_000)).await;
    let err = api.create_order(4, CheckoutOptions::default()).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::MixedChefCart(4)), "got {err}");

    // Chef has not opened a shift.
    seed::seed_address(&db, 5).await;
    seed::seed_cart_item(&db, 5, 12, 100, 1, Money::from(1_000)).await;
    let err = api.create_order(5, CheckoutOptions::default()).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::ChefOffline(12)), "got {err}");

    // None of the failed checkouts left an order behind.
    for user_id in [2, 3, 4, 5] {
        assert!(db.orders_for_user(user_id).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn the_transition_table_is_strict() {
    let db = new_db("transitions").await;
    let api = order_api(&db);
    seed::seed_address(&db, 1).await;
    seed::open_shift_for(&db, 10).await;
    seed::seed_cart_item(&db, 1, 10, 100, 1, Money::from(10_000)).await;
    let order = api.create_order(1, CheckoutOptions::default()).await.unwrap();

    // Deliver straight from Created fails and changes nothing.
    let err = api.deliver(order.id).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::InvalidTransition { from: OrderStatusType::Created, .. }), "got {err}");
    assert_eq!(db.fetch_order(order.id).await.unwrap().unwrap().status, OrderStatusType::Created);

    // Accept, then skipping Cooked/InDelivery still fails.
    api.accept_order(order.id).await.unwrap();
    let err = api.deliver(order.id).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::InvalidTransition { from: OrderStatusType::Accepted, .. }), "got {err}");
    assert_eq!(db.fetch_order(order.id).await.unwrap().unwrap().status, OrderStatusType::Accepted);

    // The full happy path goes through.
    api.call_delivery(order.id).await.unwrap();
    api.pick_up(order.id).await.unwrap();
    let delivered = api.deliver(order.id).await.unwrap();
    assert_eq!(delivered.status, OrderStatusType::Delivered);

    // Delivered is terminal.
    assert!(api.accept_order(order.id).await.is_err());
    assert!(api.reject_order(order.id).await.is_err());
    assert_eq!(db.fetch_order(order.id).await.unwrap().unwrap().status, OrderStatusType::Delivered);
}

#[tokio::test]
async fn rejection_is_only_possible_before_cooking_finishes() {
    let db = new_db("rejections").await;
    let api = order_api(&db);
    seed::seed_address(&db, 1).await;
    seed::open_shift_for(&db, 10).await;

    seed::seed_cart_item(&db, 1, 10, 100, 1, Money::from(1_000)).await;
    let order = api.create_order(1, CheckoutOptions::default()).await.unwrap();
    let rejected = api.reject_order(order.id).await.unwrap();
    assert_eq!(rejected.status, OrderStatusType::Rejected);

    seed::seed_cart_item(&db, 1, 10, 100, 1, Money::from(1_000)).await;
    let order = api.create_order(1, CheckoutOptions::default()).await.unwrap();
    api.accept_order(order.id).await.unwrap();
    let rejected = api.reject_order(order.id).await.unwrap();
    assert_eq!(rejected.status, OrderStatusType::Rejected);

    seed::seed_cart_item(&db, 1, 10, 100, 1, Money::from(1_000)).await;
    let order = api.create_order(1, CheckoutOptions::default()).await.unwrap();
    api.accept_order(order.id).await.unwrap();
    api.call_delivery(order.id).await.unwrap();
    let err = api.reject_order(order.id).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::InvalidTransition { from: OrderStatusType::Cooked, .. }), "got {err}");
}

#[tokio::test]
async fn delivery_credits_the_shift_exactly_once() {
    let db = new_db("shift_credit").await;
    let api = order_api(&db);
    seed::seed_address(&db, 1).await;
    let shift = seed::open_shift_for(&db, 10).await;
    assert_eq!(shift.total_profit, Money::from(0));

    seed::seed_cart_item(&db, 1, 10, 100, 2, Money::from(10_000)).await;
    seed::seed_cart_item(&db, 1, 10, 101, 1, Money::from(5_000)).await;
    let order = api.create_order(1, CheckoutOptions::default()).await.unwrap();
    assert_eq!(order.shift_id, shift.id);

    seed::deliver_order(&api, order.id).await.unwrap();
    let credited = db.fetch_shift(shift.id).await.unwrap().unwrap();
    assert_eq!(credited.total_profit, Money::from(25_000));

    // A replayed Deliver loses the status CAS, so the credit cannot apply twice.
    let err = api.deliver(order.id).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::InvalidTransition { from: OrderStatusType::Delivered, .. }), "got {err}");
    let unchanged = db.fetch_shift(shift.id).await.unwrap().unwrap();
    assert_eq!(unchanged.total_profit, Money::from(25_000));
}

#[tokio::test]
async fn one_active_shift_per_chef() {
    let db = new_db("shift_invariant").await;
    let shift = db.open_shift(21).await.unwrap();
    assert!(shift.is_active);

    let err = db.open_shift(21).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::ShiftAlreadyActive(21)), "got {err}");

    let closed = db.close_shift(21).await.unwrap().expect("a shift should have been closed");
    assert!(!closed.is_active);
    assert!(closed.closed_at.is_some());

    // Closing again is a no-op, and a fresh shift can now be opened.
    assert!(db.close_shift(21).await.unwrap().is_none());
    let reopened = db.open_shift(21).await.unwrap();
    assert_ne!(reopened.id, shift.id);
}

#[tokio::test]
async fn shift_read_paths_see_their_orders() {
    let db = new_db("shift_reads").await;
    let api = order_api(&db);
    seed::seed_address(&db, 1).await;
    seed::seed_address(&db, 2).await;
    let shift = seed::open_shift_for(&db, 10).await;

    seed::seed_cart_item(&db, 1, 10, 100, 1, Money::from(1_000)).await;
    let first = api.create_order(1, CheckoutOptions { leave_by_door: true, call_beforehand: false }).await.unwrap();
    seed::seed_cart_item(&db, 2, 10, 101, 1, Money::from(2_000)).await;
    let second = api.create_order(2, CheckoutOptions::default()).await.unwrap();

    let on_shift = db.orders_for_shift(shift.id).await.unwrap();
    assert_eq!(on_shift.len(), 2);
    assert!(on_shift.iter().any(|o| o.id == first.id && o.leave_by_door));
    assert!(on_shift.iter().any(|o| o.id == second.id));

    let mine = db.orders_for_user(1).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, first.id);
}

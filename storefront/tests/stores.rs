//! Store behaviour as screens see it: snapshots, notifications, progression.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use freshcart::{
    CartLine, CartState, CartStore, FavoritesState, FavoritesStore, Money, OrderEnvironment,
    OrderSettings, OrderState, OrderStatus, OrderStore, Product, orders::sample_history,
};
use freshcart_runtime::{StoreConfig, StoreError, Subscription};
use freshcart_testing::{SequentialIds, SnapshotRecorder, test_clock};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn milk() -> Product {
    Product::new("Milk", Money::parse_lenient("₹70"), "1 L")
}

fn avocado() -> Product {
    Product::new("Avocado", Money::parse_lenient("₹120"), "each")
}

fn order_store() -> OrderStore {
    OrderStore::new(order_env())
}

fn order_env() -> OrderEnvironment {
    OrderEnvironment::new(
        Arc::new(test_clock()),
        Arc::new(SequentialIds::starting_at(500_000)),
        OrderSettings::default(),
    )
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
async fn cart_counts_and_totals() {
    let cart = CartStore::new();

    cart.add_item(milk()).await.unwrap();
    assert_eq!(cart.item_count().await, 1);
    assert_eq!(cart.total().await, Money::from_rupees(70));

    cart.add_item(milk()).await.unwrap();
    let lines = cart.cart().await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 2);
    assert_eq!(cart.item_count().await, 2);

    cart.update_quantity("Milk", 0).await.unwrap();
    assert!(cart.cart().await.is_empty());
}

#[tokio::test]
async fn total_is_stable_between_mutations() {
    let cart = CartStore::new();
    cart.add_item(milk()).await.unwrap();
    cart.add_item(avocado()).await.unwrap();

    let first = cart.total().await;
    let second = cart.total().await;

    assert_eq!(first, second);
    assert_eq!(first, Money::from_rupees(190));
}

#[tokio::test]
async fn cart_subscriber_gets_initial_snapshot_then_each_change() {
    let cart = CartStore::new();
    cart.add_item(milk()).await.unwrap();

    let recorder = SnapshotRecorder::new();
    let _subscription = cart
        .subscribe(recorder.listener(|cart: &CartState| cart.item_count()))
        .await;

    cart.add_item(milk()).await.unwrap();
    cart.remove_item("Milk").await.unwrap();

    assert_eq!(recorder.snapshots(), vec![1, 2, 0]);
}

#[tokio::test]
async fn add_items_notifies_once() {
    let cart = CartStore::new();
    let recorder = SnapshotRecorder::new();
    let _subscription = cart
        .subscribe(recorder.listener(|cart: &CartState| cart.lines().len()))
        .await;

    cart.add_items(vec![CartLine::new(milk(), 2), CartLine::new(avocado(), 1)])
        .await
        .unwrap();

    assert_eq!(recorder.snapshots(), vec![0, 2]);
}

#[tokio::test]
async fn removing_missing_line_still_notifies() {
    let cart = CartStore::new();
    let recorder = SnapshotRecorder::new();
    let _subscription = cart
        .subscribe(recorder.listener(|cart: &CartState| cart.item_count()))
        .await;

    cart.remove_item("Durian").await.unwrap();

    assert_eq!(recorder.len(), 2);
}

#[tokio::test]
async fn unsubscribing_one_listener_keeps_the_others() {
    let cart = CartStore::new();
    let kept = SnapshotRecorder::new();
    let dropped = SnapshotRecorder::new();

    let _kept_sub = cart
        .subscribe(kept.listener(|cart: &CartState| cart.item_count()))
        .await;
    let dropped_sub = cart
        .subscribe(dropped.listener(|cart: &CartState| cart.item_count()))
        .await;

    dropped_sub.unsubscribe();
    cart.add_item(milk()).await.unwrap();

    assert_eq!(kept.snapshots(), vec![0, 1]);
    assert_eq!(dropped.snapshots(), vec![0]);
}

#[tokio::test]
async fn listener_can_unsubscribe_itself_mid_notification() {
    let cart = CartStore::new();
    let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
    let calls = SnapshotRecorder::new();
    let other = SnapshotRecorder::new();

    let slot_in_listener = Arc::clone(&slot);
    let record = calls.listener(|cart: &CartState| cart.item_count());
    let once = cart
        .subscribe(move |state: &CartState| {
            record(state);
            if state.item_count() > 0 {
                if let Some(subscription) = slot_in_listener.lock().unwrap().take() {
                    subscription.unsubscribe();
                }
            }
        })
        .await;
    *slot.lock().unwrap() = Some(once);
    let _other = cart
        .subscribe(other.listener(|cart: &CartState| cart.item_count()))
        .await;

    cart.add_item(milk()).await.unwrap();
    cart.add_item(milk()).await.unwrap();

    assert_eq!(calls.snapshots(), vec![0, 1]);
    assert_eq!(other.snapshots(), vec![0, 1, 2]);
}

#[tokio::test]
async fn take_lines_empties_the_cart() {
    let cart = CartStore::new();
    cart.add_item(milk()).await.unwrap();
    cart.add_item(avocado()).await.unwrap();
    cart.add_item(milk()).await.unwrap();
    let recorder = SnapshotRecorder::new();
    let _subscription = cart
        .subscribe(recorder.listener(|state: &CartState| state.item_count()))
        .await;

    let lines = cart.take_lines().await.unwrap();

    let taken: Vec<_> = lines.iter().map(|line| (line.name().to_string(), line.quantity)).collect();
    assert_eq!(taken, vec![("Milk".to_string(), 2), ("Avocado".to_string(), 1)]);
    assert!(cart.cart().await.is_empty());
    assert_eq!(recorder.snapshots(), vec![3, 0]);
    assert!(cart.take_lines().await.unwrap().is_empty());
}

#[tokio::test]
async fn mutations_after_shutdown_are_rejected() {
    let cart = CartStore::new();
    cart.shutdown(Duration::from_secs(1)).await.unwrap();

    let result = cart.add_item(milk()).await;

    assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
}

// ============================================================================
// Favorites
// ============================================================================

#[tokio::test]
async fn favorites_subscriber_gets_initial_snapshot() {
    let favorites = FavoritesStore::new();
    let recorder = SnapshotRecorder::new();
    let _subscription = favorites
        .subscribe(recorder.listener(|favorites: &FavoritesState| favorites.len()))
        .await;

    assert!(favorites.toggle_favorite(avocado()).await.unwrap());
    assert!(!favorites.toggle_favorite(avocado()).await.unwrap());

    assert_eq!(recorder.snapshots(), vec![0, 1, 0]);
}

#[tokio::test]
async fn concurrent_toggles_each_see_their_own_outcome() {
    let favorites = FavoritesStore::new();

    let (first, second) = tokio::join!(
        favorites.toggle_favorite(avocado()),
        favorites.toggle_favorite(avocado()),
    );

    let mut outcomes = vec![first.unwrap(), second.unwrap()];
    outcomes.sort_unstable();
    assert_eq!(outcomes, vec![false, true]);
    assert!(favorites.favorites().await.is_empty());
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test(start_paused = true)]
async fn placed_order_progresses_to_delivered_and_stops() {
    let orders = order_store();
    let recorder = SnapshotRecorder::new();
    let _subscription = orders
        .subscribe(recorder.listener(|state: &OrderState| {
            state.orders().first().map(|order| order.status)
        }))
        .await;

    let id = orders
        .place_order(
            &[CartLine::new(milk(), 2)],
            Money::parse_lenient("140.00"),
            None,
            None,
        )
        .await
        .unwrap();
    assert_eq!(id.as_str(), "ORD500000");
    assert_eq!(orders.order(&id).await.unwrap().status, OrderStatus::Pending);

    tokio::time::sleep(Duration::from_millis(15_100)).await;

    let order = orders.order(&id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);
    assert_eq!(order.delivery_time, "Just now");
    assert!(!orders.is_progressing(&id));

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(
        recorder.snapshots(),
        vec![
            None,
            Some(OrderStatus::Pending),
            Some(OrderStatus::Accepted),
            Some(OrderStatus::OutForDelivery),
            Some(OrderStatus::Delivered),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn each_step_waits_one_interval() {
    let orders = order_store();
    let id = orders
        .place_order(&[CartLine::new(milk(), 1)], Money::from_rupees(70), None, None)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert_eq!(orders.order(&id).await.unwrap().status, OrderStatus::Pending);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(orders.order(&id).await.unwrap().status, OrderStatus::Accepted);

    tokio::time::sleep(Duration::from_secs(5)).await;
    let order = orders.order(&id).await.unwrap();
    assert_eq!(order.status, OrderStatus::OutForDelivery);
    assert_eq!(order.delivery_time, "15 mins");
}

#[tokio::test(start_paused = true)]
async fn order_items_are_a_copy() {
    let orders = order_store();
    let mut items = vec![CartLine::new(milk(), 2)];

    let id = orders
        .place_order(&items, Money::from_rupees(140), Some("42 Lake Road".into()), Some("UPI".into()))
        .await
        .unwrap();
    items[0].quantity = 9;
    items.push(CartLine::new(avocado(), 1));

    let order = orders.order(&id).await.unwrap();
    assert_eq!(order.items, vec![CartLine::new(milk(), 2)]);
    assert_eq!(order.delivery_address, "42 Lake Road");
    assert_eq!(order.payment_method.as_deref(), Some("UPI"));
}

#[tokio::test(start_paused = true)]
async fn stopping_progressions_freezes_statuses() {
    let orders = order_store();
    let first = orders
        .place_order(&[CartLine::new(milk(), 1)], Money::from_rupees(70), None, None)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5_100)).await;
    let second = orders
        .place_order(&[CartLine::new(avocado(), 1)], Money::from_rupees(120), None, None)
        .await
        .unwrap();

    assert_eq!(orders.stop_progressions(), 2);
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(orders.order(&first).await.unwrap().status, OrderStatus::Accepted);
    assert_eq!(orders.order(&second).await.unwrap().status, OrderStatus::Pending);
}

#[tokio::test(start_paused = true)]
async fn stopping_one_progression_leaves_the_rest() {
    let orders = order_store();
    let frozen = orders
        .place_order(&[CartLine::new(milk(), 1)], Money::from_rupees(70), None, None)
        .await
        .unwrap();
    let moving = orders
        .place_order(&[CartLine::new(avocado(), 1)], Money::from_rupees(120), None, None)
        .await
        .unwrap();

    orders.stop_progression(&frozen).await.unwrap();
    tokio::time::sleep(Duration::from_secs(20)).await;

    assert_eq!(orders.order(&frozen).await.unwrap().status, OrderStatus::Pending);
    assert_eq!(orders.order(&moving).await.unwrap().status, OrderStatus::Delivered);
    let listed: Vec<_> = orders.orders().await.into_iter().map(|o| o.id).collect();
    assert_eq!(listed, vec![moving, frozen]);
}

#[tokio::test(start_paused = true)]
async fn seeded_history_does_not_progress() {
    let orders = OrderStore::with_history(sample_history(), order_env(), StoreConfig::default());

    tokio::time::sleep(Duration::from_secs(60)).await;

    let statuses: Vec<_> = orders.orders().await.into_iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Processing
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_progressions() {
    let orders = order_store();
    let id = orders
        .place_order(&[CartLine::new(milk(), 1)], Money::from_rupees(70), None, None)
        .await
        .unwrap();

    orders.shutdown(Duration::from_secs(1)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(orders.order(&id).await.unwrap().status, OrderStatus::Pending);
    assert!(!orders.is_progressing(&id));
}

#[tokio::test]
async fn update_status_sets_directly() {
    let orders = OrderStore::with_history(sample_history(), order_env(), StoreConfig::default());
    let id = freshcart::OrderId::new("ORD003");

    orders.update_status(&id, OrderStatus::Delivered).await.unwrap();

    assert_eq!(orders.order(&id).await.unwrap().status, OrderStatus::Delivered);
}

//! FreshCart demo binary
//!
//! Drives a scripted shopping session against the stores: browse, search,
//! fill the cart, favorite, check out, watch the order get delivered, and
//! repeat it.

use anyhow::Context;
use freshcart::{App, AppConfig, OrderStatus, catalog::ALL_CATEGORIES, storage::JsonFileStorage};
use freshcart_core::environment::{RandomIds, SystemClock};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "freshcart=debug,freshcart_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    freshcart::metrics::register_storefront_metrics();

    let config = AppConfig::from_env();
    tracing::info!(storage = %config.storage_path.display(), "Loaded configuration");
    let interval = config.progression_interval;

    let storage = Arc::new(JsonFileStorage::new(config.storage_path.clone()));
    let app = App::new(
        config,
        storage,
        Arc::new(SystemClock),
        Arc::new(RandomIds::default()),
    )
    .await;

    println!("=== FreshCart ===\n");
    println!("Categories: {}", app.catalog().categories().join(" | "));

    println!("\n>>> Search \"an\" in {ALL_CATEGORIES}");
    for section in app.catalog().filter(ALL_CATEGORIES, "an") {
        let names: Vec<&str> = section.products.iter().map(|p| p.name.as_str()).collect();
        println!("  {}: {}", section.title, names.join(", "));
    }

    let _cart_badge = app
        .cart()
        .subscribe(|cart| println!("  [cart] {} items, {}", cart.item_count(), cart.total()))
        .await;
    let _order_feed = app
        .orders()
        .subscribe(|orders| {
            if let Some(latest) = orders.orders().first() {
                println!("  [orders] #{} {} ({})", latest.id, latest.status, latest.delivery_time);
            }
        })
        .await;

    println!("\n>>> Filling the cart");
    for name in ["Milk", "Milk", "Avocado", "Bread"] {
        let product = app
            .catalog()
            .find(name)
            .cloned()
            .with_context(|| format!("{name} missing from catalog"))?;
        app.cart().add_item(product).await?;
    }
    app.cart().decrease_item("Bread").await?;

    if let Some(avocado) = app.catalog().find("Avocado").cloned() {
        let added = app.favorites().toggle_favorite(avocado).await?;
        println!("\n>>> Avocado favorited: {added}");
    }

    println!("\n>>> Checking out to {}", app.delivery_address());
    let order_id = app.checkout(None).await?;

    println!("\n>>> Waiting for delivery");
    let (status_tx, mut status_rx) = tokio::sync::watch::channel(None);
    let watched = order_id.clone();
    let _delivery = app
        .orders()
        .subscribe(move |orders| {
            let _ = status_tx.send(orders.order(&watched).map(|order| order.status));
        })
        .await;
    let delivered = tokio::time::timeout(
        interval * 4,
        status_rx.wait_for(|status| *status == Some(OrderStatus::Delivered)),
    )
    .await
    .is_ok_and(|seen| seen.is_ok());

    if delivered {
        println!("\n>>> Repeating #{order_id}");
        let lines = app.repeat_order(&order_id).await?;
        println!("  {lines} lines back in the cart");
    } else {
        println!("\n>>> #{order_id} was not delivered in time");
    }

    app.flush_orders().await;
    let profile = app.profile();
    println!(
        "\nProfile: {} <{}>, {} orders on record",
        profile.name, profile.email, profile.order_count
    );

    app.shutdown().await?;
    println!("\n=== Done ===");
    Ok(())
}

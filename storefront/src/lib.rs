//! # FreshCart
//!
//! Observable stores behind a grocery storefront: a cart, favorites, and
//! an order history whose orders move through delivery statuses on a timer.
//!
//! Every store is a [`freshcart_runtime::Store`] driven by a reducer. Screens
//! read a snapshot, subscribe for changes, and call mutation methods; all
//! subscribers have seen the new state by the time a mutation returns.
//!
//! - [`cart`] - line items keyed by product name, totals
//! - [`favorites`] - favorited products with toggle semantics
//! - [`orders`] - placed orders and cancellable status progression
//! - [`catalog`] - bundled sectioned catalog with category and text filters
//! - [`account`] - signup validation and stored profile
//! - [`storage`] - JSON key-value persistence that degrades to defaults
//! - [`app`] - application root wiring the stores to storage
//!
//! # Quick Start
//!
//! ```no_run
//! use freshcart::{App, AppConfig, storage::JsonFileStorage};
//! use freshcart_core::environment::{RandomIds, SystemClock};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::from_env();
//! let storage = Arc::new(JsonFileStorage::new(config.storage_path.clone()));
//! let app = App::new(config, storage, Arc::new(SystemClock), Arc::new(RandomIds::default())).await;
//!
//! if let Some(milk) = app.catalog().find("Milk").cloned() {
//!     app.cart().add_item(milk).await?;
//! }
//! let order_id = app.checkout(None).await?;
//! println!("Placed {order_id}");
//!
//! app.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod app;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod favorites;
pub mod metrics;
pub mod money;
pub mod orders;
pub mod storage;
pub mod types;

pub use app::{App, CheckoutError};
pub use cart::{CartAction, CartReducer, CartState, CartStore};
pub use catalog::{Catalog, Section};
pub use config::AppConfig;
pub use favorites::{FavoritesAction, FavoritesReducer, FavoritesState, FavoritesStore};
pub use money::Money;
pub use orders::{OrderAction, OrderEnvironment, OrderReducer, OrderSettings, OrderState, OrderStore, RepeatOrderError};
pub use types::{CartLine, Order, OrderId, OrderStatus, Product};

//! Application root.
//!
//! Owns the catalog and the three stores, wires them to local storage, and
//! implements the flows that span stores (checkout, repeat order).

use crate::account::{self, SignupForm, UserProfile, ValidationError};
use crate::cart::{CartState, CartStore};
use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::favorites::FavoritesStore;
use crate::money::Money;
use crate::orders::{OrderEnvironment, OrderStore, RepeatOrderError, sample_history};
use crate::storage::{LatestValueWriter, keys, load_json, save_json};
use crate::types::{CartLine, Order, OrderId};
use freshcart_core::environment::{Clock, IdGenerator, KeyValueStore};
use freshcart_runtime::{StoreConfig, StoreError, Subscription};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

/// Why a checkout did not place an order
#[derive(Error, Debug)]
pub enum CheckoutError {
    /// Nothing to order
    #[error("Cart is empty")]
    EmptyCart,

    /// A store rejected the request
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The storefront: catalog, stores and storage, built once and handed to screens
pub struct App {
    config: AppConfig,
    storage: Arc<dyn KeyValueStore>,
    catalog: Catalog,
    cart: CartStore,
    favorites: FavoritesStore,
    orders: OrderStore,
    delivery_address: RwLock<String>,
    order_writer: Arc<LatestValueWriter<Vec<Order>>>,
    _persist_orders: Subscription,
}

impl App {
    /// Build the stores and restore what local storage remembers
    ///
    /// Order history comes from `userOrders`; when the key has never been
    /// written the bundled sample history is shown instead. Restored orders
    /// keep their status. A saved `deliveryAddress` replaces the configured
    /// default. From then on every change to the orders is written back from
    /// a background task; store listeners only hand over the new snapshot.
    pub async fn new(
        config: AppConfig,
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let saved_address: Option<String> = load_json(storage.as_ref(), keys::DELIVERY_ADDRESS);
        let history = Self::restore_history(storage.as_ref());
        tracing::info!(
            restored_orders = history.len(),
            saved_address = saved_address.is_some(),
            "Starting storefront"
        );

        let store_config = StoreConfig::default().with_shutdown_timeout(config.shutdown_timeout);
        let environment = OrderEnvironment::new(clock, ids, config.order_settings(saved_address.clone()));
        let order_writer = Arc::new(LatestValueWriter::spawn(
            Arc::clone(&storage),
            keys::USER_ORDERS,
            history.clone(),
        ));
        let orders = OrderStore::with_history(history, environment, store_config.clone());

        let publisher = Arc::clone(&order_writer);
        let persist_orders = orders
            .subscribe(move |state| publisher.publish(state.orders().to_vec()))
            .await;

        let delivery_address = saved_address.unwrap_or_else(|| config.default_address.clone());

        Self {
            catalog: Catalog::grocery(),
            cart: CartStore::with_state(CartState::default(), store_config.clone()),
            favorites: FavoritesStore::with_config(store_config),
            orders,
            delivery_address: RwLock::new(delivery_address),
            order_writer,
            _persist_orders: persist_orders,
            config,
            storage,
        }
    }

    fn restore_history(storage: &dyn KeyValueStore) -> Vec<Order> {
        match storage.get(keys::USER_ORDERS) {
            Ok(None) => sample_history(),
            Ok(Some(_)) => load_json(storage, keys::USER_ORDERS).unwrap_or_default(),
            Err(error) => {
                tracing::warn!(%error, "Order history unavailable, starting empty");
                Vec::new()
            },
        }
    }

    /// Place an order for everything in the cart, emptying it
    ///
    /// The cart is drained in one step, so items added while the order is
    /// being placed stay in the cart for the next checkout. The order goes
    /// to the current delivery address; `payment_method` falls back to the
    /// configured one.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] when there is nothing to order.
    pub async fn checkout(&self, payment_method: Option<String>) -> Result<OrderId, CheckoutError> {
        let lines = self.cart.take_lines().await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let total: Money = lines.iter().map(CartLine::subtotal).sum();

        let placed = self
            .orders
            .place_order(&lines, total, Some(self.delivery_address()), payment_method)
            .await;
        let id = match placed {
            Ok(id) => id,
            Err(error) => {
                if let Err(restore) = self.cart.add_items(lines).await {
                    tracing::warn!(%restore, "Could not return lines to the cart");
                }
                return Err(error.into());
            },
        };

        metrics::counter!("storefront.checkout.completed").increment(1);
        Ok(id)
    }

    /// Put the lines of a delivered order back into the cart
    ///
    /// Returns how many lines were added.
    ///
    /// # Errors
    ///
    /// Returns [`RepeatOrderError`] when the order is unknown or not delivered.
    pub async fn repeat_order(&self, order_id: &OrderId) -> Result<usize, RepeatOrderError> {
        let items = self.orders.repeatable_items(order_id).await?;
        let added = items.len();
        self.cart.add_items(items).await?;

        tracing::info!(%order_id, lines = added, "Repeated order");
        metrics::counter!("storefront.orders.repeated").increment(1);
        Ok(added)
    }

    /// Address used for the next checkout
    #[must_use]
    pub fn delivery_address(&self) -> String {
        self.delivery_address
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Save `address` for later checkouts
    pub fn set_delivery_address(&self, address: impl Into<String>) {
        let address = address.into();
        save_json(self.storage.as_ref(), keys::DELIVERY_ADDRESS, &address);
        *self
            .delivery_address
            .write()
            .unwrap_or_else(PoisonError::into_inner) = address;
    }

    /// Validate and store signup details
    ///
    /// # Errors
    ///
    /// Returns the [`ValidationError`] for the first invalid field.
    pub fn register(&self, form: &SignupForm) -> Result<UserProfile, ValidationError> {
        account::register(form, self.storage.as_ref())
    }

    /// Profile as stored
    #[must_use]
    pub fn profile(&self) -> UserProfile {
        UserProfile::load(self.storage.as_ref())
    }

    /// Write the current order history now
    ///
    /// Order changes are saved in the background; this waits until the
    /// newest history is in storage. Returns whether the write happened.
    pub async fn flush_orders(&self) -> bool {
        self.order_writer.flush().await
    }

    /// Stop order progressions, shut every store down and save the final
    /// order history
    ///
    /// # Errors
    ///
    /// Returns the first store error encountered.
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        let timeout = self.config.shutdown_timeout;
        self.orders.stop_progressions();

        let (orders, cart, favorites) = tokio::join!(
            self.orders.shutdown(timeout),
            self.cart.shutdown(timeout),
            self.favorites.shutdown(timeout),
        );
        if !self.flush_orders().await {
            tracing::warn!("Final order history was not saved");
        }
        orders.and(cart).and(favorites)
    }

    /// Product catalog
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Cart store
    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    /// Favorites store
    #[must_use]
    pub const fn favorites(&self) -> &FavoritesStore {
        &self.favorites
    }

    /// Order store
    #[must_use]
    pub const fn orders(&self) -> &OrderStore {
        &self.orders
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }
}

//! Order store and delivery status progression.
//!
//! Placing an order starts a timer chain: every progression interval the
//! order moves one status forward until it is delivered. Each chain is a
//! cancellable effect keyed by order id, so it can be stopped per order or
//! all at once.

use crate::money::Money;
use crate::types::{CartLine, Order, OrderId, OrderStatus, Product};
use chrono::NaiveDate;
use freshcart_core::{
    SmallVec, cancellable_delay,
    effect::{Effect, EffectId},
    environment::{Clock, IdGenerator},
    reducer::Reducer,
    smallvec,
};
use freshcart_runtime::{Store, StoreConfig, StoreError, Subscription};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Delivery time label once an order is delivered
pub const DELIVERED_JUST_NOW: &str = "Just now";

/// Effect id of the progression timer for `order_id`
#[must_use]
pub fn progression_id(order_id: &OrderId) -> EffectId {
    EffectId::new(format!("progression-{order_id}"))
}

/// Placed orders, most recent first
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderState {
    orders: Vec<Order>,
}

impl OrderState {
    /// State seeded with existing orders (kept in the given order)
    #[must_use]
    pub const fn with_orders(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    /// All orders, most recent first
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Order with this id
    #[must_use]
    pub fn order(&self, id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| order.id == *id)
    }

    fn order_mut(&mut self, id: &OrderId) -> Option<&mut Order> {
        self.orders.iter_mut().find(|order| order.id == *id)
    }
}

/// Order mutations
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderAction {
    /// Record a new order and start its progression
    PlaceOrder {
        /// Identifier chosen by the caller
        id: OrderId,
        /// Owned copy of the cart lines
        items: Vec<CartLine>,
        /// Amount charged
        total: Money,
        /// Delivery address, configured default when `None`
        delivery_address: Option<String>,
        /// Payment method, configured default when `None`
        payment_method: Option<String>,
    },
    /// Progression tick: move one status forward
    AdvanceStatus {
        /// Order to advance
        order_id: OrderId,
    },
    /// Set a status directly
    UpdateStatus {
        /// Order to update
        order_id: OrderId,
        /// New status
        status: OrderStatus,
    },
    /// Cancel the progression timer of one order
    StopProgression {
        /// Order whose timer stops
        order_id: OrderId,
    },
}

/// Order defaults and timing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderSettings {
    /// Time between progression steps
    pub progression_interval: Duration,
    /// Delivery time label for a new order
    pub delivery_estimate: String,
    /// Address used when none is given
    pub default_address: String,
    /// Payment method used when none is given
    pub default_payment_method: Option<String>,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            progression_interval: Duration::from_secs(5),
            delivery_estimate: "15 mins".to_string(),
            default_address: "123 Main St, Apartment 4B, Mumbai".to_string(),
            default_payment_method: Some("Cash on Delivery".to_string()),
        }
    }
}

/// Environment dependencies for the order reducer
#[derive(Clone)]
pub struct OrderEnvironment {
    /// Clock for order dates
    pub clock: Arc<dyn Clock>,
    /// Source of order numbers
    pub ids: Arc<dyn IdGenerator>,
    /// Defaults and timing
    pub settings: OrderSettings,
}

impl OrderEnvironment {
    /// Creates a new `OrderEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>, settings: OrderSettings) -> Self {
        Self {
            clock,
            ids,
            settings,
        }
    }

    fn next_tick(&self, order_id: OrderId) -> Effect<OrderAction> {
        cancellable_delay! {
            id: progression_id(&order_id),
            duration: self.settings.progression_interval,
            action: OrderAction::AdvanceStatus { order_id }
        }
    }
}

/// Reducer for [`OrderState`]
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderReducer;

impl Reducer for OrderReducer {
    type State = OrderState;
    type Action = OrderAction;
    type Environment = OrderEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            OrderAction::PlaceOrder {
                id,
                items,
                total,
                delivery_address,
                payment_method,
            } => {
                let order = Order {
                    id: id.clone(),
                    date: env.clock.now().date_naive(),
                    status: OrderStatus::Pending,
                    total,
                    items,
                    delivery_address: delivery_address
                        .unwrap_or_else(|| env.settings.default_address.clone()),
                    delivery_time: env.settings.delivery_estimate.clone(),
                    payment_method: payment_method
                        .or_else(|| env.settings.default_payment_method.clone()),
                };
                state.orders.insert(0, order);
                smallvec![env.next_tick(id)]
            },
            OrderAction::AdvanceStatus { order_id } => {
                let Some(order) = state.order_mut(&order_id) else {
                    return SmallVec::new();
                };
                let Some(next) = order.status.next() else {
                    return SmallVec::new();
                };

                order.status = next;
                if next == OrderStatus::Delivered {
                    order.delivery_time = DELIVERED_JUST_NOW.to_string();
                    SmallVec::new()
                } else {
                    smallvec![env.next_tick(order_id)]
                }
            },
            OrderAction::UpdateStatus { order_id, status } => {
                if let Some(order) = state.order_mut(&order_id) {
                    order.status = status;
                }
                SmallVec::new()
            },
            OrderAction::StopProgression { order_id } => {
                smallvec![Effect::Cancel(progression_id(&order_id))]
            },
        }
    }
}

/// Why an order cannot be repeated
#[derive(Error, Debug)]
pub enum RepeatOrderError {
    /// No order has this id
    #[error("Order {0} not found")]
    NotFound(OrderId),

    /// Only delivered orders can be repeated
    #[error("Order {id} is {status}; only delivered orders can be repeated")]
    NotDelivered {
        /// The order
        id: OrderId,
        /// Its current status
        status: OrderStatus,
    },

    /// The store rejected the request
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Store type behind [`OrderStore`]
pub type OrderRuntime = Store<OrderState, OrderAction, OrderEnvironment, OrderReducer>;

/// Observable order history shared by every screen
#[derive(Clone)]
pub struct OrderStore {
    store: OrderRuntime,
}

impl OrderStore {
    /// No orders
    #[must_use]
    pub fn new(environment: OrderEnvironment) -> Self {
        Self::with_history(Vec::new(), environment, StoreConfig::default())
    }

    /// Store seeded with earlier orders, most recent first
    ///
    /// Seeded orders keep their status; only orders placed through this
    /// store progress.
    #[must_use]
    pub fn with_history(
        history: Vec<Order>,
        environment: OrderEnvironment,
        config: StoreConfig,
    ) -> Self {
        Self {
            store: Store::with_config(
                OrderState::with_orders(history),
                OrderReducer,
                environment,
                config,
            ),
        }
    }

    /// Place an order for `items` and start its status progression
    ///
    /// `items` is copied; later changes to the caller's lines never reach
    /// the order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    #[tracing::instrument(skip(self, items, delivery_address, payment_method), fields(lines = items.len()))]
    pub async fn place_order(
        &self,
        items: &[CartLine],
        total: Money,
        delivery_address: Option<String>,
        payment_method: Option<String>,
    ) -> Result<OrderId, StoreError> {
        let id = OrderId::from_number(self.store.environment().ids.next_id());

        self.store
            .send(OrderAction::PlaceOrder {
                id: id.clone(),
                items: items.to_vec(),
                total,
                delivery_address,
                payment_method,
            })
            .await?;

        tracing::info!(order_id = %id, %total, "Order placed");
        metrics::counter!("storefront.orders.placed").increment(1);
        Ok(id)
    }

    /// Set the status of `order_id`; unknown ids are a no-op
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn update_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<(), StoreError> {
        self.store
            .send(OrderAction::UpdateStatus {
                order_id: order_id.clone(),
                status,
            })
            .await?;
        Ok(())
    }

    /// Owned copy of every order, most recent first
    pub async fn orders(&self) -> Vec<Order> {
        self.store.state(|state| state.orders.clone()).await
    }

    /// Owned copy of one order
    pub async fn order(&self, order_id: &OrderId) -> Option<Order> {
        self.store.state(|state| state.order(order_id).cloned()).await
    }

    /// Lines of a delivered order, ready to go back into the cart
    ///
    /// # Errors
    ///
    /// Returns [`RepeatOrderError::NotFound`] for unknown ids and
    /// [`RepeatOrderError::NotDelivered`] for orders not yet delivered.
    pub async fn repeatable_items(&self, order_id: &OrderId) -> Result<Vec<CartLine>, RepeatOrderError> {
        self.store
            .state(|state| match state.order(order_id) {
                None => Err(RepeatOrderError::NotFound(order_id.clone())),
                Some(order) if order.status != OrderStatus::Delivered => {
                    Err(RepeatOrderError::NotDelivered {
                        id: order.id.clone(),
                        status: order.status,
                    })
                },
                Some(order) => Ok(order.items.clone()),
            })
            .await
    }

    /// Receive the orders now and after every change, including progression ticks
    pub async fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&OrderState) + Send + Sync + 'static,
    {
        self.store.subscribe(listener).await
    }

    /// Freeze the status of one order
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn stop_progression(&self, order_id: &OrderId) -> Result<(), StoreError> {
        self.store
            .send(OrderAction::StopProgression {
                order_id: order_id.clone(),
            })
            .await?;
        Ok(())
    }

    /// Freeze every order where it is, returning how many timers stopped
    pub fn stop_progressions(&self) -> usize {
        let stopped = self.store.cancel_all();
        tracing::debug!(stopped, "Stopped order progressions");
        stopped
    }

    /// Whether `order_id` still has a progression timer
    #[must_use]
    pub fn is_progressing(&self, order_id: &OrderId) -> bool {
        self.store.is_effect_active(&progression_id(order_id))
    }

    /// Stop all progressions and reject further mutations
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects are still running.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }

    /// The underlying store runtime
    #[must_use]
    pub const fn runtime(&self) -> &OrderRuntime {
        &self.store
    }
}

fn seeded_line(name: &str, price: &str, quantity: u32, image: &str) -> CartLine {
    CartLine::new(
        Product::new(name, Money::parse_lenient(price), "").with_image(image),
        quantity,
    )
}

fn seeded_order(
    id: &str,
    date: (i32, u32, u32),
    status: OrderStatus,
    total: &str,
    items: Vec<CartLine>,
    delivery_time: &str,
) -> Order {
    Order {
        id: OrderId::new(id),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap_or(NaiveDate::MIN),
        status,
        total: Money::parse_lenient(total),
        items,
        delivery_address: OrderSettings::default().default_address,
        delivery_time: delivery_time.to_string(),
        payment_method: None,
    }
}

/// Bundled order history shown to first-time users
#[must_use]
pub fn sample_history() -> Vec<Order> {
    vec![
        seeded_order(
            "ORD001",
            (2024, 1, 15),
            OrderStatus::Delivered,
            "₹48.50",
            vec![
                seeded_line(
                    "Fresh Apples",
                    "₹12.00",
                    1,
                    "https://images.unsplash.com/photo-1568702846914-96b305d2aaeb?w=400",
                ),
                seeded_line(
                    "Organic Milk",
                    "₹6.50",
                    2,
                    "https://images.unsplash.com/photo-1550583724-b2692b85b150?w=400",
                ),
                seeded_line(
                    "Brown Bread",
                    "₹4.50",
                    1,
                    "https://images.unsplash.com/photo-1509440159596-0249088772ff?w=400",
                ),
            ],
            "8 mins",
        ),
        seeded_order(
            "ORD002",
            (2024, 1, 12),
            OrderStatus::Cancelled,
            "₹32.00",
            vec![
                seeded_line("Bananas", "₹6.00", 2, "https://placehold.co/150/FFD93D/FFFFFF?text=Banana"),
                seeded_line("Carrots", "₹6.00", 1, "https://placehold.co/150/E17055/FFFFFF?text=Carrot"),
            ],
            "12 mins",
        ),
        seeded_order(
            "ORD003",
            (2024, 1, 10),
            OrderStatus::Processing,
            "₹75.25",
            vec![
                seeded_line(
                    "Chicken Breast",
                    "₹25.00",
                    1,
                    "https://placehold.co/150/FF6B6B/FFFFFF?text=Chicken",
                ),
                seeded_line("Basmati Rice", "₹15.25", 2, "https://placehold.co/150/4ECDC4/FFFFFF?text=Rice"),
            ],
            "15 mins",
        ),
    ]
}

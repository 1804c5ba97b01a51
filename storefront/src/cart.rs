//! Shopping cart store.
//!
//! Lines are keyed by product name: adding a product that is already in the
//! cart bumps its quantity instead of creating a second line.

use crate::money::Money;
use crate::types::{CartLine, Product};
use freshcart_core::{SmallVec, effect::Effect, reducer::Reducer};
use freshcart_runtime::{Store, StoreConfig, StoreError, Subscription};
use std::time::Duration;

/// Cart contents
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CartState {
    lines: Vec<CartLine>,
}

impl CartState {
    /// Cart holding `lines`, merged by name
    #[must_use]
    pub fn with_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut state = Self::default();
        for line in lines {
            state.merge(line.product, line.quantity.max(1));
        }
        state
    }

    /// Lines in insertion order
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Line for `name`, if present
    #[must_use]
    pub fn line(&self, name: &str) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.name() == name)
    }

    /// Sum of price × quantity
    #[must_use]
    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Sum of quantities
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Whether the cart has no lines
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn merge(&mut self, product: Product, quantity: u32) {
        match self.lines.iter_mut().find(|line| line.product.name == product.name) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.lines.push(CartLine::new(product, quantity)),
        }
    }

    fn remove(&mut self, name: &str) {
        self.lines.retain(|line| line.name() != name);
    }
}

/// Cart mutations
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartAction {
    /// Add one unit
    AddItem {
        /// Product to add
        product: Product,
    },
    /// Add several lines at once, each by its own quantity (0 counts as 1)
    AddItems {
        /// Lines to merge in
        lines: Vec<CartLine>,
    },
    /// Drop a line entirely
    RemoveItem {
        /// Product name
        name: String,
    },
    /// Take one unit off a line, dropping it at zero
    DecreaseItem {
        /// Product name
        name: String,
    },
    /// Set a line's quantity, dropping it at zero
    UpdateQuantity {
        /// Product name
        name: String,
        /// New quantity
        quantity: u32,
    },
    /// Empty the cart
    ClearCart,
}

/// The cart needs no injected dependencies
#[derive(Clone, Copy, Debug, Default)]
pub struct CartEnvironment;

/// Reducer for [`CartState`]
#[derive(Clone, Copy, Debug, Default)]
pub struct CartReducer;

impl Reducer for CartReducer {
    type State = CartState;
    type Action = CartAction;
    type Environment = CartEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CartAction::AddItem { product } => state.merge(product, 1),
            CartAction::AddItems { lines } => {
                for line in lines {
                    state.merge(line.product, line.quantity.max(1));
                }
            },
            CartAction::RemoveItem { name } => state.remove(&name),
            CartAction::DecreaseItem { name } => {
                if let Some(line) = state.lines.iter_mut().find(|line| line.product.name == name) {
                    line.quantity = line.quantity.saturating_sub(1);
                    if line.quantity == 0 {
                        state.remove(&name);
                    }
                }
            },
            CartAction::UpdateQuantity { name, quantity } => {
                if quantity == 0 {
                    state.remove(&name);
                } else if let Some(line) =
                    state.lines.iter_mut().find(|line| line.product.name == name)
                {
                    line.quantity = quantity;
                }
            },
            CartAction::ClearCart => state.lines.clear(),
        }
        SmallVec::new()
    }
}

/// Store type behind [`CartStore`]
pub type CartRuntime = Store<CartState, CartAction, CartEnvironment, CartReducer>;

/// Observable cart shared by every screen
///
/// Clones share the same cart. Every mutation notifies subscribers before
/// it returns.
#[derive(Clone)]
pub struct CartStore {
    store: CartRuntime,
}

impl CartStore {
    /// Empty cart
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(CartState::default(), StoreConfig::default())
    }

    /// Cart starting from `state`
    #[must_use]
    pub fn with_state(state: CartState, config: StoreConfig) -> Self {
        Self {
            store: Store::with_config(state, CartReducer, CartEnvironment, config),
        }
    }

    /// Add one unit of `product`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn add_item(&self, product: Product) -> Result<(), StoreError> {
        tracing::debug!(product = %product.name, "Adding to cart");
        self.store.send(CartAction::AddItem { product }).await?;
        Ok(())
    }

    /// Merge `lines` in one step, each by its own quantity
    ///
    /// Subscribers are notified once for the whole batch.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn add_items(&self, lines: Vec<CartLine>) -> Result<(), StoreError> {
        tracing::debug!(lines = lines.len(), "Adding lines to cart");
        self.store.send(CartAction::AddItems { lines }).await?;
        Ok(())
    }

    /// Remove the line for `name`; absent names are a no-op
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn remove_item(&self, name: &str) -> Result<(), StoreError> {
        self.store
            .send(CartAction::RemoveItem {
                name: name.to_string(),
            })
            .await?;
        Ok(())
    }

    /// Take one unit off the line for `name`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn decrease_item(&self, name: &str) -> Result<(), StoreError> {
        self.store
            .send(CartAction::DecreaseItem {
                name: name.to_string(),
            })
            .await?;
        Ok(())
    }

    /// Set the quantity for `name`; zero removes the line
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn update_quantity(&self, name: &str, quantity: u32) -> Result<(), StoreError> {
        self.store
            .send(CartAction::UpdateQuantity {
                name: name.to_string(),
                quantity,
            })
            .await?;
        Ok(())
    }

    /// Empty the cart
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn clear_cart(&self) -> Result<(), StoreError> {
        self.store.send(CartAction::ClearCart).await?;
        Ok(())
    }

    /// Empty the cart, returning exactly the lines it held
    ///
    /// The lines are read and cleared in one reduction, so an item added
    /// concurrently either comes back here or stays in the cart.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn take_lines(&self) -> Result<Vec<CartLine>, StoreError> {
        self.store
            .send_and_capture(CartAction::ClearCart, |cart| cart.lines.clone())
            .await
    }

    /// Owned copy of the current lines
    pub async fn cart(&self) -> Vec<CartLine> {
        self.store.state(|cart| cart.lines.clone()).await
    }

    /// Current total
    pub async fn total(&self) -> Money {
        self.store.state(CartState::total).await
    }

    /// Current number of units
    pub async fn item_count(&self) -> u32 {
        self.store.state(CartState::item_count).await
    }

    /// Receive the cart now and after every change
    pub async fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&CartState) + Send + Sync + 'static,
    {
        self.store.subscribe(listener).await
    }

    /// Stop accepting mutations
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects are still running.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }

    /// The underlying store runtime
    #[must_use]
    pub const fn runtime(&self) -> &CartRuntime {
        &self.store
    }
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freshcart_testing::{ReducerTest, assertions};

    fn milk() -> Product {
        Product::new("Milk", Money::from_rupees(70), "1 L")
    }

    fn bread() -> Product {
        Product::new("Bread", Money::from_rupees(50), "loaf")
    }

    fn cart_of(lines: &[(Product, u32)]) -> CartState {
        CartState::with_lines(
            lines
                .iter()
                .map(|(product, quantity)| CartLine::new(product.clone(), *quantity)),
        )
    }

    #[test]
    fn adding_twice_merges_into_one_line() {
        ReducerTest::new(CartReducer)
            .with_env(CartEnvironment)
            .given_state(CartState::default())
            .given_actions([CartAction::AddItem { product: milk() }])
            .when_action(CartAction::AddItem { product: milk() })
            .then_state(|cart| {
                assert_eq!(cart.lines().len(), 1);
                assert_eq!(cart.item_count(), 2);
                assert_eq!(cart.total(), Money::from_rupees(140));
            })
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn add_items_uses_line_quantities() {
        ReducerTest::new(CartReducer)
            .with_env(CartEnvironment)
            .given_state(cart_of(&[(milk(), 1)]))
            .when_action(CartAction::AddItems {
                lines: vec![CartLine::new(milk(), 2), CartLine::new(bread(), 0)],
            })
            .then_state(|cart| {
                assert_eq!(cart.line("Milk").map(|l| l.quantity), Some(3));
                assert_eq!(cart.line("Bread").map(|l| l.quantity), Some(1));
            })
            .run();
    }

    #[test]
    fn decrease_removes_at_zero() {
        ReducerTest::new(CartReducer)
            .with_env(CartEnvironment)
            .given_state(cart_of(&[(milk(), 2), (bread(), 1)]))
            .given_actions([CartAction::DecreaseItem {
                name: "Milk".to_string(),
            }])
            .when_action(CartAction::DecreaseItem {
                name: "Bread".to_string(),
            })
            .then_state(|cart| {
                assert_eq!(cart.line("Milk").map(|l| l.quantity), Some(1));
                assert!(cart.line("Bread").is_none());
            })
            .run();
    }

    #[test]
    fn update_quantity_zero_removes() {
        ReducerTest::new(CartReducer)
            .with_env(CartEnvironment)
            .given_state(cart_of(&[(milk(), 2)]))
            .when_action(CartAction::UpdateQuantity {
                name: "Milk".to_string(),
                quantity: 0,
            })
            .then_state(|cart| assert!(cart.is_empty()))
            .run();
    }

    #[test]
    fn missing_lines_are_noops() {
        let before = cart_of(&[(milk(), 1)]);
        let expected = before.clone();

        ReducerTest::new(CartReducer)
            .with_env(CartEnvironment)
            .given_state(before)
            .given_actions([
                CartAction::RemoveItem {
                    name: "Eggs".to_string(),
                },
                CartAction::DecreaseItem {
                    name: "Eggs".to_string(),
                },
            ])
            .when_action(CartAction::UpdateQuantity {
                name: "Eggs".to_string(),
                quantity: 4,
            })
            .then_state(move |cart| assert_eq!(*cart, expected))
            .run();
    }

    #[test]
    fn malformed_prices_contribute_nothing() {
        let mystery = Product::new("Mystery Box", Money::parse_lenient("ask at counter"), "box");
        let cart = cart_of(&[(milk(), 1), (mystery, 3)]);

        assert_eq!(cart.total(), Money::from_rupees(70));
        assert_eq!(cart.item_count(), 4);
    }
}

//! Favorites store.

use crate::types::Product;
use freshcart_core::{SmallVec, effect::Effect, reducer::Reducer};
use freshcart_runtime::{Store, StoreConfig, StoreError, Subscription};
use std::time::Duration;

/// Favorited products, unique by name, in the order they were added
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FavoritesState {
    items: Vec<Product>,
}

impl FavoritesState {
    /// Favorited products
    #[must_use]
    pub fn items(&self) -> &[Product] {
        &self.items
    }

    /// Whether a product with this name is favorited
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|item| item.name == name)
    }

    /// Number of favorites
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is favorited
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Favorites mutations
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FavoritesAction {
    /// Remove if present by name, add otherwise
    Toggle {
        /// Product to toggle
        product: Product,
    },
    /// Remove by name
    Remove {
        /// Product name
        name: String,
    },
}

/// Favorites need no injected dependencies
#[derive(Clone, Copy, Debug, Default)]
pub struct FavoritesEnvironment;

/// Reducer for [`FavoritesState`]
#[derive(Clone, Copy, Debug, Default)]
pub struct FavoritesReducer;

impl Reducer for FavoritesReducer {
    type State = FavoritesState;
    type Action = FavoritesAction;
    type Environment = FavoritesEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            FavoritesAction::Toggle { product } => {
                if state.contains(&product.name) {
                    state.items.retain(|item| item.name != product.name);
                } else {
                    state.items.push(product);
                }
            },
            FavoritesAction::Remove { name } => state.items.retain(|item| item.name != name),
        }
        SmallVec::new()
    }
}

/// Store type behind [`FavoritesStore`]
pub type FavoritesRuntime =
    Store<FavoritesState, FavoritesAction, FavoritesEnvironment, FavoritesReducer>;

/// Observable favorites shared by every screen
#[derive(Clone)]
pub struct FavoritesStore {
    store: FavoritesRuntime,
}

impl FavoritesStore {
    /// No favorites
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// No favorites, custom store configuration
    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            store: Store::with_config(
                FavoritesState::default(),
                FavoritesReducer,
                FavoritesEnvironment,
                config,
            ),
        }
    }

    /// Add or remove `product`, returning whether it is now a favorite
    ///
    /// Membership is read in the same step as the mutation, so concurrent
    /// toggles each see their own outcome.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn toggle_favorite(&self, product: Product) -> Result<bool, StoreError> {
        let name = product.name.clone();
        let added = self
            .store
            .send_and_inspect(FavoritesAction::Toggle { product }, |favorites| {
                favorites.contains(&name)
            })
            .await?;
        tracing::debug!(product = %name, added, "Toggled favorite");
        Ok(added)
    }

    /// Remove the favorite named `name`; absent names are a no-op
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after shutdown.
    pub async fn remove_item(&self, name: &str) -> Result<(), StoreError> {
        self.store
            .send(FavoritesAction::Remove {
                name: name.to_string(),
            })
            .await?;
        Ok(())
    }

    /// Owned copy of the favorites
    pub async fn favorites(&self) -> Vec<Product> {
        self.store.state(|favorites| favorites.items.clone()).await
    }

    /// Whether `name` is favorited
    pub async fn contains(&self, name: &str) -> bool {
        self.store.state(|favorites| favorites.contains(name)).await
    }

    /// Receive the favorites now and after every change
    pub async fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&FavoritesState) + Send + Sync + 'static,
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
}

impl Default for FavoritesStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can use unwrap

    use super::*;
    use crate::money::Money;
    use freshcart_testing::ReducerTest;

    fn avocado() -> Product {
        Product::new("Avocado", Money::from_rupees(120), "each")
    }

    #[test]
    fn toggle_twice_restores() {
        ReducerTest::new(FavoritesReducer)
            .with_env(FavoritesEnvironment)
            .given_state(FavoritesState::default())
            .given_actions([FavoritesAction::Toggle { product: avocado() }])
            .when_action(FavoritesAction::Toggle { product: avocado() })
            .then_state(|favorites| assert!(favorites.is_empty()))
            .run();
    }

    #[test]
    fn toggle_matches_by_name() {
        let relabelled = avocado().with_discount("10% OFF");

        ReducerTest::new(FavoritesReducer)
            .with_env(FavoritesEnvironment)
            .given_state(FavoritesState::default())
            .given_actions([FavoritesAction::Toggle { product: avocado() }])
            .when_action(FavoritesAction::Toggle {
                product: relabelled,
            })
            .then_state(|favorites| assert!(!favorites.contains("Avocado")))
            .run();
    }

    #[tokio::test]
    async fn toggle_reports_membership() {
        let favorites = FavoritesStore::new();

        assert!(favorites.toggle_favorite(avocado()).await.unwrap());
        assert!(favorites.contains("Avocado").await);
        assert!(!favorites.toggle_favorite(avocado()).await.unwrap());
        assert!(favorites.favorites().await.is_empty());
    }

    #[tokio::test]
    async fn remove_missing_is_noop() {
        let favorites = FavoritesStore::new();
        favorites.toggle_favorite(avocado()).await.unwrap();

        favorites.remove_item("Durian").await.unwrap();

        assert_eq!(favorites.favorites().await, vec![avocado()]);
    }
}

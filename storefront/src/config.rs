//! Configuration management for the storefront.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::orders::OrderSettings;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// JSON file holding local key-value data
    pub storage_path: PathBuf,
    /// Seconds between order status steps
    pub progression_interval: Duration,
    /// Delivery time label for new orders
    pub delivery_estimate: String,
    /// Address used until the user saves one
    pub default_address: String,
    /// Payment method used at checkout when none is chosen
    pub payment_method: String,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        let orders = OrderSettings::default();
        Self {
            storage_path: PathBuf::from("freshcart-storage.json"),
            progression_interval: orders.progression_interval,
            delivery_estimate: orders.delivery_estimate,
            default_address: orders.default_address,
            payment_method: orders
                .default_payment_method
                .unwrap_or_else(|| "Cash on Delivery".to_string()),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `FRESHCART_STORAGE_PATH` | `freshcart-storage.json` |
    /// | `FRESHCART_PROGRESSION_SECS` | `5` |
    /// | `FRESHCART_DELIVERY_ESTIMATE` | `15 mins` |
    /// | `FRESHCART_DEFAULT_ADDRESS` | `123 Main St, Apartment 4B, Mumbai` |
    /// | `FRESHCART_PAYMENT_METHOD` | `Cash on Delivery` |
    /// | `FRESHCART_SHUTDOWN_TIMEOUT_SECS` | `5` |
    ///
    /// Unparseable numbers fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            storage_path: env::var("FRESHCART_STORAGE_PATH")
                .map_or(defaults.storage_path, PathBuf::from),
            progression_interval: env::var("FRESHCART_PROGRESSION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map_or(defaults.progression_interval, Duration::from_secs),
            delivery_estimate: env::var("FRESHCART_DELIVERY_ESTIMATE")
                .unwrap_or(defaults.delivery_estimate),
            default_address: env::var("FRESHCART_DEFAULT_ADDRESS")
                .unwrap_or(defaults.default_address),
            payment_method: env::var("FRESHCART_PAYMENT_METHOD")
                .unwrap_or(defaults.payment_method),
            shutdown_timeout: env::var("FRESHCART_SHUTDOWN_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map_or(defaults.shutdown_timeout, Duration::from_secs),
        }
    }

    /// Order defaults derived from this configuration
    ///
    /// `default_address` is the address saved by the user, if any.
    #[must_use]
    pub fn order_settings(&self, default_address: Option<String>) -> OrderSettings {
        OrderSettings {
            progression_interval: self.progression_interval,
            delivery_estimate: self.delivery_estimate.clone(),
            default_address: default_address.unwrap_or_else(|| self.default_address.clone()),
            default_payment_method: Some(self.payment_method.clone()),
        }
    }
}

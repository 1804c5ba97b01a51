//! Storefront business metrics.
//!
//! ## Counters
//! - `storefront.orders.placed` - Orders placed
//! - `storefront.checkout.completed` - Carts checked out
//! - `storefront.orders.repeated` - Delivered orders added back to the cart
//! - `storefront.storage.failures{op}` - Storage reads/writes that degraded to defaults

use metrics::describe_counter;

/// Register descriptions for storefront and store metrics.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_storefront_metrics() {
    freshcart_runtime::metrics::describe_store_metrics();

    describe_counter!("storefront.orders.placed", "Orders placed");
    describe_counter!("storefront.checkout.completed", "Carts checked out");
    describe_counter!(
        "storefront.orders.repeated",
        "Delivered orders added back to the cart"
    );
    describe_counter!(
        "storefront.storage.failures",
        "Storage operations that failed and fell back to defaults, by operation"
    );
}

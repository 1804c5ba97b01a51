//! Store metric descriptions.
//!
//! The store records through the `metrics` facade. Whatever recorder the
//! host application installs picks these up; without one they are no-ops.
//!
//! # Example
//!
//! ```rust
//! freshcart_runtime::metrics::describe_store_metrics();
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Register descriptions for every metric the store emits.
///
/// Call once after installing a recorder. Calling it again is harmless.
pub fn describe_store_metrics() {
    describe_counter!("store.commands.total", "Total number of actions sent to stores");
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time taken to run a reducer for one action"
    );
    describe_histogram!("store.effects.count", "Number of effects returned per action");
    describe_counter!("store.effects.executed", "Effects executed, labelled by type");
    describe_counter!(
        "store.effects.cancelled",
        "In-flight effects aborted through cancellation"
    );
    describe_gauge!(
        "store.effects.cancellable",
        "Cancellable effects currently registered"
    );
    describe_counter!(
        "store.subscribers.notified",
        "Snapshot deliveries to store subscribers"
    );
    describe_counter!("store.shutdown.initiated", "Graceful shutdowns started");
    describe_counter!("store.shutdown.completed", "Graceful shutdowns that drained all effects");
    describe_counter!("store.shutdown.timeout", "Graceful shutdowns that timed out");
    describe_counter!(
        "store.shutdown.rejected_actions",
        "Actions rejected because the store was shutting down"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describing_without_recorder_is_noop() {
        describe_store_metrics();
        describe_store_metrics();
    }
}

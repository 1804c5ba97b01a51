//! # FreshCart Testing
//!
//! Testing utilities and helpers for the FreshCart stores.
//!
//! This crate provides:
//! - Mock implementations of Environment traits
//! - Snapshot recording for store subscribers
//! - Assertion helpers for reducers
//!
//! ## Example
//!
//! ```ignore
//! use freshcart_testing::{SnapshotRecorder, test_clock};
//!
//! #[tokio::test]
//! async fn cart_listeners_see_each_change() {
//!     let cart = CartStore::new();
//!     let recorder = SnapshotRecorder::new();
//!     let _subscription = cart.subscribe(recorder.listener(|lines: &[CartLine]| lines.len())).await;
//!
//!     cart.add_item(milk()).await?;
//!
//!     assert_eq!(recorder.snapshots(), vec![0, 1]);
//! }
//! ```

use chrono::{DateTime, Utc};
use freshcart_core::environment::{Clock, IdGenerator, KeyValueStore, StorageError};

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, IdGenerator, KeyValueStore, StorageError, Utc};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Mutex, MutexGuard, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use freshcart_testing::mocks::FixedClock;
    /// use freshcart_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Predictable ids: `start`, `start + 1`, ...
    #[derive(Debug)]
    pub struct SequentialIds {
        next: AtomicU64,
    }

    impl SequentialIds {
        /// Ids counting up from `start`
        #[must_use]
        pub const fn starting_at(start: u64) -> Self {
            Self {
                next: AtomicU64::new(start),
            }
        }
    }

    impl Default for SequentialIds {
        fn default() -> Self {
            Self::starting_at(100_001)
        }
    }

    impl IdGenerator for SequentialIds {
        fn next_id(&self) -> u64 {
            self.next.fetch_add(1, Ordering::SeqCst)
        }
    }

    /// In-memory key-value storage
    ///
    /// Can be switched into a failing mode where every operation returns
    /// [`StorageError::Unavailable`], to exercise fallback paths.
    #[derive(Debug, Default)]
    pub struct InMemoryStorage {
        values: Mutex<BTreeMap<String, String>>,
        failing: AtomicBool,
    }

    impl InMemoryStorage {
        /// Empty storage
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Storage pre-populated with `entries`
        #[must_use]
        pub fn with_entries<I, K, V>(entries: I) -> Self
        where
            I: IntoIterator<Item = (K, V)>,
            K: Into<String>,
            V: Into<String>,
        {
            let storage = Self::new();
            storage.lock().extend(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.into(), value.into())),
            );
            storage
        }

        /// Storage whose every operation fails
        #[must_use]
        pub fn failing() -> Self {
            let storage = Self::new();
            storage.set_failing(true);
            storage
        }

        /// Toggle failure mode
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// Raw value under `key`, bypassing failure mode
        #[must_use]
        pub fn raw(&self, key: &str) -> Option<String> {
            self.lock().get(key).cloned()
        }

        /// Stored keys in sorted order
        #[must_use]
        pub fn keys(&self) -> Vec<String> {
            self.lock().keys().cloned().collect()
        }

        fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
            self.values.lock().unwrap_or_else(PoisonError::into_inner)
        }

        fn check(&self) -> Result<(), StorageError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(StorageError::Unavailable("in-memory storage set to fail".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl KeyValueStore for InMemoryStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.check()?;
            Ok(self.raw(key))
        }

        fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
            self.check()?;
            self.lock().insert(key.to_string(), value);
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.check()?;
            self.lock().remove(key);
            Ok(())
        }
    }
}

/// Test helpers and utilities
pub mod helpers {
    use std::sync::{Arc, Mutex, PoisonError};

    /// Collects values derived from every snapshot a subscriber receives
    ///
    /// Cloning shares the recording.
    #[derive(Debug)]
    pub struct SnapshotRecorder<T> {
        seen: Arc<Mutex<Vec<T>>>,
    }

    impl<T> Clone for SnapshotRecorder<T> {
        fn clone(&self) -> Self {
            Self {
                seen: Arc::clone(&self.seen),
            }
        }
    }

    impl<T> Default for SnapshotRecorder<T> {
        fn default() -> Self {
            Self {
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl<T: Clone + Send + 'static> SnapshotRecorder<T> {
        /// Empty recorder
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Build a listener that records `project(snapshot)` on every call
        pub fn listener<S, F>(&self, project: F) -> impl Fn(&S) + Send + Sync + 'static
        where
            S: ?Sized,
            F: Fn(&S) -> T + Send + Sync + 'static,
        {
            let seen = Arc::clone(&self.seen);
            move |snapshot: &S| {
                let value = project(snapshot);
                seen.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(value);
            }
        }

        /// Everything recorded so far
        #[must_use]
        pub fn snapshots(&self) -> Vec<T> {
            self.seen
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// The most recent recording
        #[must_use]
        pub fn last(&self) -> Option<T> {
            self.seen
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .last()
                .cloned()
        }

        /// Number of snapshots delivered
        #[must_use]
        pub fn len(&self) -> usize {
            self.seen
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }

        /// Whether nothing was delivered yet
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }
}


// Re-export commonly used items
pub use helpers::SnapshotRecorder;
pub use mocks::{FixedClock, InMemoryStorage, SequentialIds, test_clock};
pub use reducer_test::{ReducerTest, assertions};

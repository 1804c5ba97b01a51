//! # FreshCart Runtime
//!
//! Runtime implementation for the FreshCart store architecture.
//!
//! This crate provides the Store runtime that coordinates reducer execution,
//! snapshot notification and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Subscriptions**: Listeners that receive a state snapshot on subscribe and after every action
//! - **Effect Executor**: Executes effect descriptions and feeds actions back to reducers
//! - **Cancellation Registry**: Tracks cancellable effects (timers) so they can be aborted
//!
//! ## Example
//!
//! ```ignore
//! use freshcart_runtime::Store;
//!
//! let store = Store::new(CartState::default(), CartReducer::new(), CartEnvironment);
//!
//! let subscription = store.subscribe(|cart: &CartState| {
//!     println!("{} items", cart.item_count());
//! }).await;
//!
//! store.send(CartAction::AddItem { product }).await?;
//!
//! let total = store.state(CartState::total).await;
//! subscription.unsubscribe();
//! ```

use freshcart_core::{
    effect::{Effect, EffectId},
    reducer::Reducer,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio::task::AbortHandle;

/// Store metric descriptions
pub mod metrics;

/// Snapshot subscribers and their handles
pub mod subscription;

pub use subscription::Subscription;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for terminal action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Configuration for Store instances
///
/// # Example
///
/// ```ignore
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(64)
///     .with_shutdown_timeout(Duration::from_secs(5));
///
/// let store = Store::with_config(state, reducer, env, config);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of actions buffered for `subscribe_actions` observers
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(broadcast_capacity: usize, default_shutdown_timeout: Duration) -> Self {
        Self {
            broadcast_capacity,
            default_shutdown_timeout,
        }
    }

    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            default_shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects started by
/// that action. Effects spawned later by feedback actions get their own
/// handles.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a new effect handle and the tracking used during execution
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        let _ = tx.send(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Number of effects from this action still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    ///
    /// Cancelled effects count as complete.
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: Effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    /// Increment the effect counter (effect started)
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the effect counter (effect completed)
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements effect counter on drop
///
/// Runs on normal completion, panic, and abort through cancellation.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Internal: In-flight cancellable tasks grouped by [`EffectId`]
#[derive(Default)]
struct CancellationTasks {
    next_key: u64,
    tasks: HashMap<EffectId, HashMap<u64, AbortHandle>>,
}

/// Internal: Registry of abortable effect tasks shared by store clones
#[derive(Clone, Default)]
struct CancellationRegistry {
    inner: Arc<Mutex<CancellationTasks>>,
}

impl CancellationRegistry {
    fn lock(&self) -> MutexGuard<'_, CancellationTasks> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `fut` and register it under `id` until it finishes
    ///
    /// The registry lock is held across spawn and insert, so the task's own
    /// removal always observes its entry.
    fn spawn<F>(&self, id: EffectId, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock();
        let key = tasks.next_key;
        tasks.next_key += 1;

        let registry = self.clone();
        let task_id = id.clone();
        let handle = tokio::spawn(async move {
            fut.await;
            registry.complete(&task_id, key);
        });

        tasks
            .tasks
            .entry(id)
            .or_default()
            .insert(key, handle.abort_handle());
    }

    fn complete(&self, id: &EffectId, key: u64) {
        let mut tasks = self.lock();
        if let Some(group) = tasks.tasks.get_mut(id) {
            group.remove(&key);
            if group.is_empty() {
                tasks.tasks.remove(id);
            }
        }
    }

    /// Abort every task registered under `id`, returning how many were aborted
    fn cancel(&self, id: &EffectId) -> usize {
        let group = self.lock().tasks.remove(id);
        group.map_or(0, |group| {
            for handle in group.values() {
                handle.abort();
            }
            group.len()
        })
    }

    /// Abort every registered task
    fn cancel_all(&self) -> usize {
        let groups: Vec<_> = self.lock().tasks.drain().collect();
        groups
            .into_iter()
            .map(|(_, group)| {
                for handle in group.values() {
                    handle.abort();
                }
                group.len()
            })
            .sum()
    }

    /// Number of cancellable tasks still running
    fn len(&self) -> usize {
        self.lock().tasks.values().map(HashMap::len).sum()
    }

    fn contains(&self, id: &EffectId) -> bool {
        self.lock().tasks.contains_key(id)
    }
}

/// Store module - The runtime for reducers
///
/// Store runtime for coordinating reducer execution, subscriber
/// notification and effect handling.
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, CancellationRegistry, DecrementGuard,
        Duration, Effect, EffectHandle, EffectId, EffectTracking, Future, Ordering, Reducer,
        RwLock, StoreConfig, StoreError, Subscription,
    };
    use crate::subscription::{Listener, ListenerRegistry};
    use tokio::sync::{Mutex, RwLockReadGuard, broadcast, watch};

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent reads)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Snapshot subscribers
    /// 5. Effect execution (with feedback loop and cancellation)
    ///
    /// Cloning a store is cheap and every clone shares state, subscribers
    /// and in-flight effects, so screens can each hold their own handle.
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        config: StoreConfig,
        /// Serializes reduction and notification so snapshots never interleave
        dispatch: Arc<Mutex<()>>,
        listeners: ListenerRegistry<S>,
        cancellations: CancellationRegistry,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Action broadcast channel for observing actions produced by effects.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// Uses [`StoreConfig::default`].
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new Store with custom configuration
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                config,
                dispatch: Arc::new(Mutex::new(())),
                listeners: ListenerRegistry::new(),
                cancellations: CancellationRegistry::default(),
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
            }
        }

        /// The configuration this store was built with
        #[must_use]
        pub const fn config(&self) -> &StoreConfig {
            &self.config
        }

        /// The injected environment
        #[must_use]
        pub const fn environment(&self) -> &E {
            &self.environment
        }

        /// Whether shutdown has started
        #[must_use]
        pub fn is_shutting_down(&self) -> bool {
            self.shutdown.load(Ordering::Acquire)
        }

        /// Number of effects currently running across all actions
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Number of cancellable effects currently running
        #[must_use]
        pub fn cancellable_effects(&self) -> usize {
            self.cancellations.len()
        }

        /// Whether any effect registered under `id` is still running
        #[must_use]
        pub fn is_effect_active(&self, id: &EffectId) -> bool {
            self.cancellations.contains(id)
        }

        /// Number of registered snapshot subscribers
        #[must_use]
        pub fn subscriber_count(&self) -> usize {
            self.listeners.len()
        }

        /// Abort every in-flight effect registered under `id`
        ///
        /// Returns how many effects were aborted. Unknown ids abort nothing.
        pub fn cancel(&self, id: &EffectId) -> usize {
            let cancelled = self.cancellations.cancel(id);
            if cancelled > 0 {
                tracing::debug!(effect_id = %id, cancelled, "Cancelled effects");
                metrics::counter!("store.effects.cancelled").increment(cancelled as u64);
            }
            cancelled
        }

        /// Abort every cancellable effect of this store
        pub fn cancel_all(&self) -> usize {
            let cancelled = self.cancellations.cancel_all();
            if cancelled > 0 {
                tracing::debug!(cancelled, "Cancelled all cancellable effects");
                metrics::counter!("store.effects.cancelled").increment(cancelled as u64);
            }
            cancelled
        }

        /// Initiate graceful shutdown of the store
        ///
        /// This method:
        /// 1. Sets the shutdown flag (rejecting new actions, including timer feedback)
        /// 2. Aborts every cancellable effect
        /// 3. Waits for the remaining effects to complete (with timeout)
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);
            self.cancel_all();

            let start = tokio::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    metrics::counter!("store.shutdown.completed").increment(1);
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(
                        pending_effects = pending,
                        "Shutdown timeout: {} effects still running", pending
                    );
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tracing::debug!(pending_effects = pending, "Waiting for effects to complete");
                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Shut down using the configured default timeout
        ///
        /// # Errors
        ///
        /// See [`Store::shutdown`].
        pub async fn shutdown_default(&self) -> Result<(), StoreError> {
            self.shutdown(self.config.default_shutdown_timeout).await
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the dispatch lock (one action at a time per store)
        /// 2. Calls reducer with (state, action, environment) under the write lock
        /// 3. Delivers the new state to every subscriber, in subscription order
        /// 4. Starts the returned effects asynchronously
        ///
        /// Subscribers have all been notified by the time this returns.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        ///
        /// # Panics
        ///
        /// A panicking reducer or listener propagates to the caller.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            self.send_internal(action, |_| (), |_, ()| ())
                .await
                .map(|(handle, ())| handle)
        }

        /// Send an action and inspect the resulting state atomically
        ///
        /// `inspect` runs right after the reducer, before any other action can
        /// be reduced, which makes it the way to read the outcome of a
        /// mutation (for example whether a toggle added or removed).
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        pub async fn send_and_inspect<F, T>(&self, action: A, inspect: F) -> Result<T, StoreError>
        where
            R: Clone,
            E: Clone,
            F: FnOnce(&S) -> T,
        {
            self.send_internal(action, |_| (), |state, ()| inspect(state))
                .await
                .map(|(_, output)| output)
        }

        /// Send an action and capture the state it was reduced from
        ///
        /// `capture` sees the state immediately before the reducer runs, under
        /// the same lock, so nothing can change in between. A clear action
        /// sent with a capture of the items drains them atomically.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        pub async fn send_and_capture<F, T>(&self, action: A, capture: F) -> Result<T, StoreError>
        where
            R: Clone,
            E: Clone,
            F: FnOnce(&S) -> T,
        {
            self.send_internal(action, capture, |_, captured| captured)
                .await
                .map(|(_, output)| output)
        }

        /// Send an action and wait for a matching action produced by effects
        ///
        /// Subscribes to the action broadcast BEFORE sending, so no result can
        /// be missed, then returns the first effect-produced action matching
        /// `predicate`.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: Timeout expired before matching action received
        /// - [`StoreError::ChannelClosed`]: Action broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: Store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            R: Clone,
            E: Clone,
            F: Fn(&A) -> bool,
        {
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged, {} actions skipped", skipped);
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to all actions produced by effects
        ///
        /// Timer feedback (for example order status ticks) shows up here.
        /// Actions sent directly with `send` are not broadcast. An action is
        /// broadcast just before it is reduced, so read state through a
        /// snapshot subscriber rather than on receipt.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Register a snapshot listener
        ///
        /// The listener is called immediately with the current state, then
        /// again after every action, in subscription order relative to other
        /// listeners. Keep the returned [`Subscription`] alive; dropping it
        /// or calling [`Subscription::unsubscribe`] removes only this listener.
        ///
        /// Listeners run while the store holds a read lock on its state: they
        /// must not block, and must not call back into this store synchronously.
        pub async fn subscribe<F>(&self, listener: F) -> Subscription
        where
            F: Fn(&S) + Send + Sync + 'static,
        {
            let _dispatch = self.dispatch.lock().await;
            let listener: Listener<S> = Arc::new(listener);
            let subscription = self.listeners.register(Arc::clone(&listener));

            let state = self.state.read().await;
            listener(&*state);
            metrics::counter!("store.subscribers.notified").increment(1);
            tracing::trace!(subscription = subscription.id(), "Subscriber registered");

            subscription
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let count = store.state(|cart| cart.item_count()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Internal send implementation shared by the `send` variants
        ///
        /// `before` runs on the state just ahead of the reducer, `after` on the
        /// reduced state; both under the write lock.
        async fn send_internal<B, P, F, T>(
            &self,
            action: A,
            before: B,
            after: F,
        ) -> Result<(EffectHandle, T), StoreError>
        where
            R: Clone,
            E: Clone,
            B: FnOnce(&S) -> P,
            F: FnOnce(&S, P) -> T,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            tracing::debug!("Processing action");
            metrics::counter!("store.commands.total").increment(1);

            let (handle, tracking) = EffectHandle::new();

            let (effects, output) = {
                let _dispatch = self.dispatch.lock().await;
                let mut state = self.state.write().await;
                let captured = before(&*state);

                let span = tracing::debug_span!("reducer_execution");
                let effects = {
                    let _enter = span.enter();
                    let start = std::time::Instant::now();
                    let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                    metrics::histogram!("store.reducer.duration_seconds")
                        .record(start.elapsed().as_secs_f64());
                    effects
                };
                tracing::trace!("Reducer completed, returned {} effects", effects.len());

                // Note: Precision loss acceptable for metrics (effect counts < 2^52)
                #[allow(clippy::cast_precision_loss)]
                metrics::histogram!("store.effects.count").record(effects.len() as f64);

                let output = after(&*state, captured);

                let state: RwLockReadGuard<'_, S> = state.downgrade();
                let notified = self.listeners.notify(&*state);
                if notified > 0 {
                    tracing::trace!(notified, "Delivered snapshot to subscribers");
                    metrics::counter!("store.subscribers.notified").increment(notified as u64);
                }

                (effects, output)
            };

            for effect in effects {
                self.execute_effect_internal(effect, tracking.clone(), None);
            }

            Ok((handle, output))
        }

        /// Spawn an effect task, registering it when it runs under a cancellation id
        fn spawn_effect<F>(&self, scope: Option<&EffectId>, fut: F)
        where
            F: Future<Output = ()> + Send + 'static,
        {
            match scope {
                Some(id) => {
                    self.cancellations.spawn(id.clone(), fut);
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!("store.effects.cancellable").set(self.cancellations.len() as f64);
                },
                None => {
                    tokio::spawn(fut);
                },
            }
        }

        /// Feed an effect-produced action back into the store
        async fn feed_back(&self, action: A)
        where
            R: Clone,
            E: Clone,
        {
            // Broadcast to observers (tests, debug tooling)
            let _ = self.action_broadcast.send(action.clone());

            if let Err(error) = self.send(action).await {
                tracing::debug!(%error, "Dropped effect feedback");
            }
        }

        /// Execute an effect with tracking
        ///
        /// # Effect Types
        ///
        /// - `None`: No-op
        /// - `Future`: Executes async computation, sends resulting action if `Some`
        /// - `Delay`: Waits for duration, then sends action
        /// - `Parallel`: Executes effects concurrently
        /// - `Sequential`: Executes effects in order, waiting for each to complete
        /// - `Cancellable`: Executes the inner effect registered under its id
        /// - `Cancel`: Aborts everything registered under its id
        ///
        /// [`DecrementGuard`] keeps the counters right whether a task
        /// completes, panics, or is aborted.
        #[allow(clippy::needless_pass_by_value)] // tracking is cloned per spawned task
        #[allow(clippy::too_many_lines)]
        fn execute_effect_internal(
            &self,
            effect: Effect<A>,
            tracking: EffectTracking,
            scope: Option<EffectId>,
        ) where
            R: Clone,
            E: Clone,
        {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    tracking.increment();

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));
                    let guard = DecrementGuard(tracking.clone());
                    let store = self.clone();

                    self.spawn_effect(scope.as_ref(), async move {
                        let _guard = guard;
                        let _pending_guard = pending_guard;

                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            store.feed_back(action).await;
                        }
                    });
                },
                Effect::Delay { duration, action } => {
                    tracing::trace!("Executing Effect::Delay (duration: {:?})", duration);
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    tracking.increment();

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));
                    let guard = DecrementGuard(tracking.clone());
                    let store = self.clone();

                    self.spawn_effect(scope.as_ref(), async move {
                        let _guard = guard;
                        let _pending_guard = pending_guard;

                        tokio::time::sleep(duration).await;
                        tracing::trace!("Effect::Delay elapsed, sending action");
                        store.feed_back(*action).await;
                    });
                },
                Effect::Parallel(effects) => {
                    tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);

                    for effect in effects {
                        self.execute_effect_internal(effect, tracking.clone(), scope.clone());
                    }
                },
                Effect::Sequential(effects) => {
                    let effect_count = effects.len();
                    tracing::trace!("Executing Effect::Sequential with {} effects", effect_count);
                    metrics::counter!("store.effects.executed", "type" => "sequential").increment(1);
                    tracking.increment();

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));
                    let guard = DecrementGuard(tracking.clone());
                    let store = self.clone();
                    let inner_scope = scope.clone();

                    self.spawn_effect(scope.as_ref(), async move {
                        let _guard = guard;
                        let _pending_guard = pending_guard;

                        for (idx, effect) in effects.into_iter().enumerate() {
                            tracing::trace!(
                                "Executing sequential effect {} of {}",
                                idx + 1,
                                effect_count
                            );

                            let (sub_tx, mut sub_rx) = watch::channel(());
                            let sub_tracking = EffectTracking {
                                counter: Arc::new(AtomicUsize::new(0)),
                                notifier: sub_tx,
                            };

                            store.execute_effect_internal(
                                effect,
                                sub_tracking.clone(),
                                inner_scope.clone(),
                            );

                            while sub_tracking.counter.load(Ordering::SeqCst) > 0 {
                                if sub_rx.changed().await.is_err() {
                                    break;
                                }
                            }
                        }
                        tracing::trace!("Effect::Sequential completed");
                    });
                },
                Effect::Cancellable { id, effect } => {
                    tracing::trace!(effect_id = %id, "Executing Effect::Cancellable");
                    metrics::counter!("store.effects.executed", "type" => "cancellable").increment(1);
                    self.execute_effect_internal(*effect, tracking, Some(id));
                },
                Effect::Cancel(id) => {
                    tracing::trace!(effect_id = %id, "Executing Effect::Cancel");
                    metrics::counter!("store.effects.executed", "type" => "cancel").increment(1);
                    self.cancel(&id);
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                config: self.config.clone(),
                dispatch: Arc::clone(&self.dispatch),
                listeners: self.listeners.clone(),
                cancellations: self.cancellations.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

    use super::*;
    use freshcart_core::{SmallVec, smallvec};
    use std::sync::Mutex as StdMutex;

    #[derive(Debug, Clone, Default)]
    struct TestState {
        value: i32,
        ticks: u32,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum TestAction {
        Increment,
        Set(i32),
        StartTicking,
        Tick,
        StopTicking,
        ProduceValue,
        ValueProduced(i32),
        RunSequence,
    }

    #[derive(Clone)]
    struct TestEnv;

    #[derive(Clone)]
    struct TestReducer;

    const TICKER: &str = "ticker";

    fn tick_effect() -> Effect<TestAction> {
        Effect::Delay {
            duration: Duration::from_secs(1),
            action: Box::new(TestAction::Tick),
        }
        .cancellable(EffectId::new(TICKER))
    }

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => {
                    state.value += 1;
                    smallvec![Effect::None]
                },
                TestAction::Set(value) | TestAction::ValueProduced(value) => {
                    state.value = value;
                    SmallVec::new()
                },
                TestAction::StartTicking => smallvec![tick_effect()],
                TestAction::Tick => {
                    state.ticks += 1;
                    smallvec![tick_effect()]
                },
                TestAction::StopTicking => smallvec![Effect::Cancel(EffectId::new(TICKER))],
                TestAction::ProduceValue => smallvec![Effect::Future(Box::pin(async {
                    Some(TestAction::ValueProduced(42))
                }))],
                TestAction::RunSequence => smallvec![Effect::chain(vec![
                    Effect::Future(Box::pin(async { Some(TestAction::Set(1)) })),
                    Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                ])],
            }
        }
    }

    fn test_store() -> Store<TestState, TestAction, TestEnv, TestReducer> {
        Store::new(TestState::default(), TestReducer, TestEnv)
    }

    #[tokio::test]
    async fn test_send_updates_state() {
        let store = test_store();

        store.send(TestAction::Increment).await.unwrap();
        store.send(TestAction::Increment).await.unwrap();

        assert_eq!(store.state(|s| s.value).await, 2);
    }

    #[tokio::test]
    async fn test_subscribe_emits_initial_snapshot() {
        let store = test_store();
        store.send(TestAction::Set(5)).await.unwrap();

        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let _subscription = store
            .subscribe(move |s: &TestState| seen_clone.lock().unwrap().push(s.value))
            .await;

        assert_eq!(*seen.lock().unwrap(), vec![5]);
    }

    #[tokio::test]
    async fn test_subscribers_see_every_mutation_before_send_returns() {
        let store = test_store();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let _subscription = store
            .subscribe(move |s: &TestState| seen_clone.lock().unwrap().push(s.value))
            .await;

        store.send(TestAction::Increment).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);

        store.send(TestAction::Set(10)).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 10]);
    }

    #[tokio::test]
    async fn test_subscribers_notified_in_subscription_order() {
        let store = test_store();
        let order = Arc::new(StdMutex::new(Vec::new()));

        let first_order = Arc::clone(&order);
        let _first = store
            .subscribe(move |_: &TestState| first_order.lock().unwrap().push("first"))
            .await;
        let second_order = Arc::clone(&order);
        let _second = store
            .subscribe(move |_: &TestState| second_order.lock().unwrap().push("second"))
            .await;
        order.lock().unwrap().clear();

        store.send(TestAction::Increment).await.unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_only_that_listener() {
        let store = test_store();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let first_clone = Arc::clone(&first);
        let first_sub = store
            .subscribe(move |_: &TestState| {
                first_clone.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        let second_clone = Arc::clone(&second);
        let _second_sub = store
            .subscribe(move |_: &TestState| {
                second_clone.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        first_sub.unsubscribe();
        store.send(TestAction::Increment).await.unwrap();

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 2);
        assert_eq!(store.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_send_and_inspect_reads_post_reduction_state() {
        let store = test_store();

        let value = store
            .send_and_inspect(TestAction::Increment, |s| s.value)
            .await
            .unwrap();

        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn test_send_and_capture_reads_pre_reduction_state() {
        let store = test_store();
        store.send(TestAction::Set(7)).await.unwrap();

        let before = store
            .send_and_capture(TestAction::Set(0), |s| s.value)
            .await
            .unwrap();

        assert_eq!(before, 7);
        assert_eq!(store.state(|s| s.value).await, 0);
    }

    #[tokio::test]
    async fn test_send_and_capture_after_shutdown_is_rejected() {
        let store = test_store();
        store.shutdown(Duration::from_secs(1)).await.unwrap();

        let result = store.send_and_capture(TestAction::Set(0), |s| s.value).await;

        assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
    }

    #[tokio::test]
    async fn test_future_effect_feeds_back() {
        let store = test_store();

        let result = store
            .send_and_wait_for(
                TestAction::ProduceValue,
                |a| matches!(a, TestAction::ValueProduced(_)),
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        assert_eq!(result, TestAction::ValueProduced(42));
        // The feedback action is reduced right after it is broadcast.
        let mut handle = store.send(TestAction::Set(0)).await.unwrap();
        handle.wait().await;
    }

    #[tokio::test]
    async fn test_effect_handle_waits_for_future() {
        let store = test_store();

        let mut handle = store.send(TestAction::ProduceValue).await.unwrap();
        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

        assert_eq!(store.state(|s| s.value).await, 42);
        assert_eq!(handle.pending(), 0);
    }

    #[tokio::test]
    async fn test_sequential_effects_run_in_order() {
        let store = test_store();

        let mut handle = store.send(TestAction::RunSequence).await.unwrap();
        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

        assert_eq!(store.state(|s| s.value).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellable_delay_repeats_until_cancelled() {
        let store = test_store();

        store.send(TestAction::StartTicking).await.unwrap();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(store.state(|s| s.ticks).await, 3);
        assert!(store.is_effect_active(&EffectId::new(TICKER)));

        store.send(TestAction::StopTicking).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(store.state(|s| s.ticks).await, 3);
        assert!(!store.is_effect_active(&EffectId::new(TICKER)));
        assert_eq!(store.cancellable_effects(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_timers_and_rejects_actions() {
        let store = test_store();
        store.send(TestAction::StartTicking).await.unwrap();

        store.shutdown(Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.pending_effects(), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(store.state(|s| s.ticks).await, 0);

        let result = store.send(TestAction::Increment).await;
        assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
    }

    #[tokio::test]
    async fn test_clones_share_state_and_subscribers() {
        let store = test_store();
        let clone = store.clone();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let _subscription = store
            .subscribe(move |_: &TestState| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        clone.send(TestAction::Increment).await.unwrap();

        assert_eq!(store.state(|s| s.value).await, 1);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_store_config_builder() {
        let config = StoreConfig::default()
            .with_broadcast_capacity(64)
            .with_shutdown_timeout(Duration::from_secs(5));

        assert_eq!(config.broadcast_capacity, 64);
        assert_eq!(config.default_shutdown_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_completed_handle_returns_immediately() {
        let mut handle = EffectHandle::completed();
        handle.wait_with_timeout(Duration::from_millis(10)).await.unwrap();
    }
}

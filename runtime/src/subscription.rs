//! Snapshot subscribers.
//!
//! A store keeps a list of listeners that receive a borrow of its state
//! after every reduction. Registration hands back a [`Subscription`] whose
//! `unsubscribe` (or drop) removes exactly that listener.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Callback invoked with the store state
pub(crate) type Listener<S> = Arc<dyn Fn(&S) + Send + Sync>;

struct Listeners<S> {
    next_id: u64,
    entries: Vec<(u64, Listener<S>)>,
}

/// Ordered set of listeners shared by every clone of a store
pub(crate) struct ListenerRegistry<S> {
    inner: Arc<Mutex<Listeners<S>>>,
}

fn lock<S>(mutex: &Mutex<Listeners<S>>) -> MutexGuard<'_, Listeners<S>> {
    // A listener never runs while the lock is held, so poisoning can only
    // come from a panic inside this module's own bookkeeping.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: 'static> ListenerRegistry<S> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Append a listener; it is notified after every listener registered before it
    pub(crate) fn register(&self, listener: Listener<S>) -> Subscription {
        let id = {
            let mut listeners = lock(&self.inner);
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.push((id, listener));
            id
        };

        let registry: Weak<Mutex<Listeners<S>>> = Arc::downgrade(&self.inner);
        Subscription {
            id,
            cancel: Some(Box::new(move || {
                if let Some(inner) = registry.upgrade() {
                    lock(&inner).entries.retain(|(entry_id, _)| *entry_id != id);
                }
            })),
        }
    }

    /// Number of registered listeners
    pub(crate) fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    /// Deliver `state` to every listener in registration order
    ///
    /// The list is copied before dispatch, so listeners may unsubscribe
    /// themselves or others mid-notification. Returns how many were called.
    pub(crate) fn notify(&self, state: &S) -> usize {
        let listeners: Vec<Listener<S>> = lock(&self.inner)
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in &listeners {
            listener(state);
        }
        listeners.len()
    }
}

impl<S> Clone for ListenerRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Handle for a registered snapshot listener
///
/// Dropping the handle unsubscribes, exactly like calling
/// [`Subscription::unsubscribe`]. Keep it alive for as long as the listener
/// should receive snapshots.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    id: u64,
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Registration order of this listener within its store
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Stop receiving snapshots
    ///
    /// Other listeners of the same store are unaffected.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

//! Observable state container.
//!
//! `StateStore<T>` is the single state-holding primitive in Sake: each
//! session keeps its accounts, deployments and history in one store each,
//! and the bridge layer subscribes to whichever session is active.
//!
//! Notification semantics are deliberately simple: every `set` replaces the
//! value and synchronously invokes all current subscribers with a clone of
//! the new value, in registration order. Subscribers observe the latest
//! value only, never a queue of intermediate values.

use std::sync::{Arc, Mutex, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    value: T,
    next_id: u64,
    subscribers: Vec<(u64, Callback<T>)>,
}

/// An observable container holding one value.
pub struct StateStore<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for StateStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> StateStore<T> {
    /// Creates a store holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                value: initial,
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.lock().expect("store lock poisoned").value.clone()
    }

    /// Replaces the value and notifies all subscribers.
    pub fn set(&self, value: T) {
        let (snapshot, subscribers) = {
            let mut inner = self.inner.lock().expect("store lock poisoned");
            inner.value = value;
            (inner.value.clone(), inner.subscribers.clone())
        };
        // Iterate over a snapshot so a subscriber unsubscribing (itself or
        // another) mid-notification cannot disturb in-flight delivery.
        for (_, callback) in &subscribers {
            callback(&snapshot);
        }
    }

    /// Applies `patch` to the current value in place, then notifies.
    ///
    /// This is replace semantics, not an event: subscribers receive the
    /// whole patched value.
    pub fn update<F>(&self, patch: F)
    where
        F: FnOnce(&mut T),
    {
        let (snapshot, subscribers) = {
            let mut inner = self.inner.lock().expect("store lock poisoned");
            patch(&mut inner.value);
            (inner.value.clone(), inner.subscribers.clone())
        };
        for (_, callback) in &subscribers {
            callback(&snapshot);
        }
    }

    /// Registers `callback` and returns a handle that removes it again.
    ///
    /// The callback is invoked synchronously on every subsequent `set` /
    /// `update`, in registration order. Dropping the handle does not
    /// unsubscribe; call [`SubscriptionHandle::unsubscribe`].
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, Arc::new(callback)));
        SubscriptionHandle {
            id,
            store: Arc::downgrade(&self.inner),
        }
    }

    /// Number of live subscriptions. Mostly useful in tests.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().expect("store lock poisoned").subscribers.len()
    }
}

impl<T: Clone + Default + Send + 'static> Default for StateStore<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Removes a subscription registered with [`StateStore::subscribe`].
pub struct SubscriptionHandle<T> {
    id: u64,
    store: Weak<Mutex<Inner<T>>>,
}

impl<T> SubscriptionHandle<T> {
    /// Removes the subscription. Safe to call after the store is gone.
    pub fn unsubscribe(self) {
        if let Some(inner) = self.store.upgrade() {
            let mut inner = inner.lock().expect("store lock poisoned");
            inner.subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}

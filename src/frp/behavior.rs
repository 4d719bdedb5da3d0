// Copyright (c) 2025 - Cowboy AI, Inc.
//! Behavior - Mutable Reactive Sources
//!
//! A `Behavior<T>` is a value that exists at all points in time and can be
//! written. It is the leaf of every dependency graph: derived values read
//! behaviors (and other derived values) through a
//! [`Resolver`](super::resolver::Resolver) and re-evaluate when they change.
//!
//! # Characteristics
//!
//! - **Always has a value**: can be sampled at any time
//! - **Versioned**: the revision increments once per change of value
//! - **Shared**: cloning a `Behavior` creates a new handle to the same state
//! - **Thread-safe**: writes and listener registration may happen from any thread
//!
//! # Examples
//!
//! ```rust,ignore
//! let count = Behavior::new(5);
//! assert_eq!(count.sample(), 5);
//!
//! count.set(7);
//! assert_eq!(count.revision(), 1);
//!
//! // Equal writes are no-ops
//! assert!(!count.set(7));
//! assert_eq!(count.revision(), 1);
//! ```

use std::fmt::{self, Debug};
use std::sync::{Arc, RwLock, Weak};

use super::registry::{FnListener, ListenerRegistry, Subscription};
use super::signal::{ChangeListener, ListenerKey, Observable, Signal, Versioned};
use crate::ids::SourceId;
use crate::sync::{read, write};

struct BehaviorInner<T> {
    id: SourceId,
    state: RwLock<Versioned<T>>,
    listeners: ListenerRegistry,
}

impl<T: Send + Sync> Observable for BehaviorInner<T> {
    fn source_id(&self) -> SourceId {
        self.id
    }

    fn revision(&self) -> u64 {
        read(&self.state).revision
    }

    fn add_listener(&self, listener: Weak<dyn ChangeListener>) -> ListenerKey {
        self.listeners.add(listener)
    }

    fn remove_listener(&self, key: ListenerKey) -> bool {
        self.listeners.remove(key)
    }

    fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

/// Writable reactive value
///
/// # Type Parameters
///
/// - `T`: The value type. `PartialEq` decides whether a write is a change.
pub struct Behavior<T> {
    inner: Arc<BehaviorInner<T>>,
}

impl<T> Clone for Behavior<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Debug> Debug for Behavior<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = read(&self.inner.state);
        f.debug_struct("Behavior")
            .field("id", &self.inner.id)
            .field("value", &state.value)
            .field("revision", &state.revision)
            .finish()
    }
}

impl<T> Behavior<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a behavior with an initial value at revision 0
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(BehaviorInner {
                id: SourceId::new(),
                state: RwLock::new(Versioned::initial(value)),
                listeners: ListenerRegistry::new(),
            }),
        }
    }

    /// Identity of this source
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Read the value without tracking
    pub fn sample(&self) -> T {
        read(&self.inner.state).value.clone()
    }

    /// Access the value by reference without cloning
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&read(&self.inner.state).value)
    }

    /// Current value and revision
    pub fn snapshot(&self) -> Versioned<T> {
        read(&self.inner.state).clone()
    }

    /// Current revision
    pub fn revision(&self) -> u64 {
        read(&self.inner.state).revision
    }

    /// Write a new value
    ///
    /// Returns whether the value changed. Equal values neither bump the
    /// revision nor notify listeners.
    pub fn set(&self, value: T) -> bool {
        let changed = write(&self.inner.state).replace_if_changed(value);
        if changed {
            self.inner.listeners.notify(self.inner.id);
        }
        changed
    }

    /// Write a new value, returning the previous one
    pub fn replace(&self, value: T) -> T {
        let (previous, changed) = {
            let mut state = write(&self.inner.state);
            let previous = state.value.clone();
            let changed = state.replace_if_changed(value);
            (previous, changed)
        };
        if changed {
            self.inner.listeners.notify(self.inner.id);
        }
        previous
    }

    /// Mutate the value in place
    ///
    /// The mutation runs on a copy; listeners are notified only if the
    /// result differs from the original. Concurrent `update` calls never
    /// lose each other's changes.
    ///
    /// # Deadlocks
    ///
    /// `f` runs while this behavior's write lock is held. Reading or writing
    /// the same behavior from inside `f` (including through `sample`, `with`
    /// or a clone of the handle) deadlocks. Read it beforehand instead:
    ///
    /// ```rust,ignore
    /// let step = step_size.sample();
    /// counter.update(|v| *v += step);
    /// ```
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let changed = {
            let mut state = write(&self.inner.state);
            let mut next = state.value.clone();
            f(&mut next);
            state.replace_if_changed(next)
        };
        if changed {
            self.inner.listeners.notify(self.inner.id);
        }
        changed
    }

    /// Call `f` with every new value
    ///
    /// `f` runs on the writing thread after the write lock is released.
    pub fn subscribe<F>(&self, f: F) -> Subscription
    where
        F: Fn(&Versioned<T>) + Send + Sync + 'static,
    {
        let weak = Arc::downgrade(&self.inner);
        let listener = FnListener(move |_| {
            if let Some(inner) = weak.upgrade() {
                let snapshot = read(&inner.state).clone();
                f(&snapshot);
            }
        });
        let source: Arc<dyn Observable> = self.inner.clone();
        Subscription::new(&source, Arc::new(listener))
    }

    /// Number of live listeners (derived values and subscriptions)
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }
}

impl<T> Signal for Behavior<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    type Value = T;

    fn sample(&self) -> T {
        Behavior::sample(self)
    }

    fn revision(&self) -> u64 {
        Behavior::revision(self)
    }

    fn as_observable(&self) -> Arc<dyn Observable> {
        self.inner.clone()
    }
}

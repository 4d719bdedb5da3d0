// Copyright (c) 2025 - Cowboy AI, Inc.
//! Listener registry shared by all reactive sources
//!
//! Many derived values may subscribe to and unsubscribe from the same source
//! concurrently, so the registry is guarded by a mutex. Listeners are stored
//! weakly and called in registration order, outside the lock, so a listener
//! may freely subscribe, unsubscribe or write other sources.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use super::signal::{ChangeListener, ListenerKey, Observable};
use crate::ids::SourceId;
use crate::sync::lock;

#[derive(Default)]
struct RegistryState {
    next_key: u64,
    listeners: BTreeMap<u64, Weak<dyn ChangeListener>>,
}

/// Synchronized set of weak listener references
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    state: Mutex<RegistryState>,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, listener: Weak<dyn ChangeListener>) -> ListenerKey {
        let mut state = lock(&self.state);
        let key = state.next_key;
        state.next_key += 1;
        state.listeners.insert(key, listener);
        ListenerKey(key)
    }

    pub(crate) fn remove(&self, key: ListenerKey) -> bool {
        lock(&self.state).listeners.remove(&key.0).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.state)
            .listeners
            .values()
            .filter(|l| l.strong_count() > 0)
            .count()
    }

    /// Notify every live listener, pruning dead ones
    ///
    /// Returns the number of listeners notified.
    pub(crate) fn notify(&self, source: SourceId) -> usize {
        let live: Vec<Arc<dyn ChangeListener>> = {
            let mut state = lock(&self.state);
            state.listeners.retain(|_, l| l.strong_count() > 0);
            state.listeners.values().filter_map(Weak::upgrade).collect()
        };

        for listener in &live {
            listener.on_change(source);
        }

        live.len()
    }
}

/// Listener backed by a closure
pub(crate) struct FnListener<F>(pub(crate) F);

impl<F> ChangeListener for FnListener<F>
where
    F: Fn(SourceId) + Send + Sync,
{
    fn on_change(&self, source: SourceId) {
        (self.0)(source)
    }
}

/// RAII guard for a listener registration
///
/// The guard owns the listener; the source only holds it weakly. Dropping
/// the guard removes the registration before the next notification cycle.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    key: ListenerKey,
    source: Weak<dyn Observable>,
    _listener: Arc<dyn ChangeListener>,
}

impl Subscription {
    /// Register `listener` on `source`
    pub fn new(source: &Arc<dyn Observable>, listener: Arc<dyn ChangeListener>) -> Self {
        let key = source.add_listener(Arc::downgrade(&listener));
        Self {
            key,
            source: Arc::downgrade(source),
            _listener: listener,
        }
    }

    /// Register a closure on `source`
    pub fn from_fn<F>(source: &Arc<dyn Observable>, f: F) -> Self
    where
        F: Fn(SourceId) + Send + Sync + 'static,
    {
        Self::new(source, Arc::new(FnListener(f)))
    }

    /// The registration key
    pub fn key(&self) -> ListenerKey {
        self.key
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("source_alive", &(self.source.strong_count() > 0))
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(source) = self.source.upgrade() {
            source.remove_listener(self.key);
        }
    }
}

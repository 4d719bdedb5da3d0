// Copyright (c) 2025 - Cowboy AI, Inc.
//! DerivedValue - Scope-Bound Computed Signals
//!
//! A `DerivedValue<T>` holds the latest output of an observer function and
//! keeps it up to date while its scope is active.
//!
//! # Lifecycle
//!
//! ```text
//! derived(scope, observer)
//!     │  evaluate once, synchronously; subscribe to what was read
//!     ▼
//! ┌────────┐  dependency changed ─> coalesced re-evaluation
//! │ Active │  equal result       ─> no revision bump, no notification
//! └────────┘  failed evaluation  ─> last value kept, failure reported
//!     │
//!     │ scope cancelled
//!     ▼
//! ┌────────┐
//! │ Frozen │  readable forever at the last value, never written again
//! └────────┘
//! ```
//!
//! # Dynamic dependencies
//!
//! Dependencies are whatever the observer read through its
//! [`Resolver`] during the most recent evaluation:
//!
//! ```rust,ignore
//! let shown = derived(&scope, move |r| {
//!     if r.get(&use_metric) { r.get(&celsius) } else { r.get(&fahrenheit) }
//! });
//! ```
//!
//! While `use_metric` is true, changing `fahrenheit` does not re-evaluate
//! `shown`.
//!
//! # Example
//!
//! ```rust,ignore
//! let src = Behavior::new(5);
//! let x = derived(&scope, {
//!     let src = src.clone();
//!     move |r| r.get(&src) * 2
//! });
//! assert_eq!(x.value(), 10);
//!
//! src.set(7);
//! let now = x.wait_for_revision(1).await;
//! assert_eq!(now.value, 14);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;

use super::engine::{self, Initial, ObserverFn};
use super::registry::{FnListener, ListenerRegistry, Subscription};
use super::resolver::Resolver;
use super::signal::{ChangeListener, ListenerKey, Observable, Signal, Versioned};
use crate::ids::{ScopeId, SourceId};
use crate::scope::{CancellationSignal, Scope};

/// Lifecycle state of a derived value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedState {
    /// Subscribed to its dependencies and re-evaluating on change
    Active,
    /// Its scope ended; the value will never change again
    Frozen,
}

/// Shared state behind a [`DerivedValue`]
pub(crate) struct DerivedInner<T> {
    id: SourceId,
    scope_id: ScopeId,
    current: watch::Sender<Versioned<T>>,
    listeners: ListenerRegistry,
    evaluations: AtomicU64,
    scope_cancel: CancellationSignal,
    dispose: CancellationSignal,
    released: AtomicBool,
}

impl<T> DerivedInner<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub(crate) fn new(
        scope_id: ScopeId,
        value: T,
        scope_cancel: CancellationSignal,
        dispose: CancellationSignal,
    ) -> Self {
        let (current, _) = watch::channel(Versioned::initial(value));
        Self {
            id: SourceId::new(),
            scope_id,
            current,
            listeners: ListenerRegistry::new(),
            evaluations: AtomicU64::new(0),
            scope_cancel,
            dispose,
            released: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> SourceId {
        self.id
    }

    pub(crate) fn scope_id(&self) -> ScopeId {
        self.scope_id
    }

    pub(crate) fn revision(&self) -> u64 {
        self.current.borrow().revision
    }

    pub(crate) fn snapshot(&self) -> Versioned<T> {
        self.current.borrow().clone()
    }

    pub(crate) fn record_evaluation(&self) {
        self.evaluations.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn evaluation_count(&self) -> u64 {
        self.evaluations.load(Ordering::Acquire)
    }

    pub(crate) fn mark_released(&self) {
        self.released.store(true, Ordering::Release);
    }

    /// Whether the owning scope or this observation was cancelled
    pub(crate) fn is_stopped(&self) -> bool {
        self.scope_cancel.is_cancelled() || self.dispose.is_cancelled()
    }

    pub(crate) fn state(&self) -> DerivedState {
        // Checked under the value lock so a publish cannot land after Frozen
        let _current = self.current.borrow();
        if self.released.load(Ordering::Acquire) || self.is_stopped() {
            DerivedState::Frozen
        } else {
            DerivedState::Active
        }
    }

    /// Store `value` if it differs from the current one
    ///
    /// Returns the new revision when something was published. Called only
    /// from inside the observation's critical section, so revisions reach
    /// watchers and listeners in increasing order. Nothing is stored once
    /// the value is stopped.
    pub(crate) fn publish(&self, value: T) -> Option<u64> {
        let mut published = None;
        self.current.send_if_modified(|current| {
            if self.is_stopped() {
                return false;
            }
            if current.replace_if_changed(value) {
                published = Some(current.revision);
                true
            } else {
                false
            }
        });

        if published.is_some() {
            self.listeners.notify(self.id);
        }
        published
    }
}

impl<T> Observable for DerivedInner<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn source_id(&self) -> SourceId {
        self.id
    }

    fn revision(&self) -> u64 {
        DerivedInner::revision(self)
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

/// Read-only reactive value computed from other signals
///
/// Cloning creates a new handle to the same value. Reads never fail, in
/// either state.
pub struct DerivedValue<T> {
    inner: Arc<DerivedInner<T>>,
}

impl<T> Clone for DerivedValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for DerivedValue<T>
where
    T: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.inner.snapshot();
        f.debug_struct("DerivedValue")
            .field("id", &self.inner.id)
            .field("value", &snapshot.value)
            .field("revision", &snapshot.revision)
            .field("state", &self.inner.state())
            .finish()
    }
}

impl<T> DerivedValue<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub(crate) fn from_inner(inner: Arc<DerivedInner<T>>) -> Self {
        Self { inner }
    }

    /// Identity of this value as a source
    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    /// Scope the value is bound to
    pub fn scope_id(&self) -> ScopeId {
        self.inner.scope_id
    }

    /// Current value
    pub fn value(&self) -> T {
        self.inner.current.borrow().value.clone()
    }

    /// Access the current value by reference without cloning
    ///
    /// The closure runs under a read lock that blocks publication; keep it
    /// short.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.current.borrow().value)
    }

    /// Current value and revision
    pub fn snapshot(&self) -> Versioned<T> {
        self.inner.snapshot()
    }

    /// Current revision (0 for the initial value)
    pub fn revision(&self) -> u64 {
        self.inner.revision()
    }

    /// Lifecycle state
    pub fn state(&self) -> DerivedState {
        self.inner.state()
    }

    /// Whether the value will never change again
    pub fn is_frozen(&self) -> bool {
        self.state() == DerivedState::Frozen
    }

    /// Number of observer evaluations, including the initial one
    pub fn evaluation_count(&self) -> u64 {
        self.inner.evaluation_count()
    }

    /// Number of live listeners on this value
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Receiver of every published snapshot
    ///
    /// Revisions seen through the receiver only ever increase. A slow reader
    /// skips intermediate values but always sees the latest.
    pub fn changes(&self) -> watch::Receiver<Versioned<T>> {
        self.inner.current.subscribe()
    }

    /// Call `f` with every newly published snapshot
    ///
    /// `f` runs on the observation task inside the value's critical section
    /// and must not block.
    pub fn subscribe<F>(&self, f: F) -> Subscription
    where
        F: Fn(&Versioned<T>) + Send + Sync + 'static,
    {
        let weak = Arc::downgrade(&self.inner);
        let listener = FnListener(move |_| {
            if let Some(inner) = weak.upgrade() {
                f(&inner.snapshot());
            }
        });
        let source: Arc<dyn Observable> = self.inner.clone();
        Subscription::new(&source, Arc::new(listener))
    }

    /// Wait until the value reaches `revision`
    ///
    /// Returns early with the current snapshot if the scope is cancelled
    /// first, since a frozen value never advances.
    pub async fn wait_for_revision(&self, revision: u64) -> Versioned<T> {
        let mut rx = self.inner.current.subscribe();
        let reached = tokio::select! {
            biased;
            result = rx.wait_for(|v| v.revision >= revision) => result.ok().map(|v| v.clone()),
            _ = self.inner.scope_cancel.cancelled() => None,
        };
        reached.unwrap_or_else(|| self.inner.snapshot())
    }
}

impl<T> Signal for DerivedValue<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    type Value = T;

    fn sample(&self) -> T {
        self.value()
    }

    fn revision(&self) -> u64 {
        self.inner.revision()
    }

    fn as_observable(&self) -> Arc<dyn Observable> {
        self.inner.clone()
    }
}

/// Create a derived value bound to `scope`
///
/// The observer runs once, synchronously, before this returns. Later
/// evaluations run on the scope; their errors and panics are caught and
/// reported to the scope's [`ErrorReporter`](crate::reporting::ErrorReporter)
/// while the last value is kept.
///
/// On a cancelled scope the value is computed once and frozen.
///
/// # Panics
///
/// Panics if the observer panics during the first evaluation, since there is
/// no previous value to keep. Use [`try_derived`] with a fallback value when
/// the first evaluation may fail.
pub fn derived<S, T, F>(scope: &S, observer: F) -> DerivedValue<T>
where
    S: Scope + ?Sized,
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn(&Resolver) -> T + Send + Sync + 'static,
{
    let resolver = Resolver::new();
    let value = observer(&resolver);

    let observer: ObserverFn<T> = Box::new(move |r| Ok(observer(r)));
    let initial = Initial {
        value,
        resolver,
        failure: None,
    };

    DerivedValue::from_inner(engine::launch(
        scope,
        observer,
        initial,
        CancellationSignal::new(),
    ))
}

/// Create a derived value from a fallible observer
///
/// If the first evaluation fails, `fallback` becomes the initial value and
/// the failure is reported. Later failures keep the last good value.
pub fn try_derived<S, T, F>(scope: &S, fallback: T, observer: F) -> DerivedValue<T>
where
    S: Scope + ?Sized,
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn(&Resolver) -> anyhow::Result<T> + Send + Sync + 'static,
{
    let observer: ObserverFn<T> = Box::new(observer);
    let resolver = Resolver::new();

    let initial = match engine::evaluate(&observer, &resolver) {
        Ok(value) => Initial {
            value,
            resolver,
            failure: None,
        },
        Err(failure) => Initial {
            value: fallback,
            resolver,
            failure: Some(failure),
        },
    };

    DerivedValue::from_inner(engine::launch(
        scope,
        observer,
        initial,
        CancellationSignal::new(),
    ))
}

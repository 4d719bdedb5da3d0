// Copyright (c) 2025 - Cowboy AI, Inc.
//! Observation engine
//!
//! One [`Observation`] drives one derived value. It owns the observer, the
//! current dependency set, and a [`Trigger`] registered (weakly) on every
//! dependency. The observation task launched on the scope waits on the
//! trigger, re-evaluates, diffs dependencies and publishes.
//!
//! ```text
//!  source.set() ──> Trigger::on_change ──pending?──> Notify (one permit)
//!                                                       │
//!  observation task: ◄──────────────────────────────────┘
//!    settle (coalesce) ─> clear pending ─> [critical section]
//!                                           evaluate observer
//!                                           diff + resubscribe
//!                                           publish if changed
//! ```
//!
//! Coalescing comes from the `pending` flag: only the notification that flips
//! it from false to true wakes the task, and the flag is cleared right before
//! evaluating, so any burst of changes before that point collapses into one
//! evaluation that reads the latest values.
//!
//! Cancellation never interrupts an evaluation. An evaluation that finishes
//! after the scope was cancelled (or the observation disposed) is discarded
//! inside the critical section, so a frozen value is never written.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::Notify;
use tracing::{debug, trace};

use super::derived::DerivedInner;
use super::resolver::{Resolver, TrackedRead};
use super::signal::{ChangeListener, ListenerKey, Observable};
use crate::config::CoalesceStrategy;
use crate::errors::ReactiveError;
use crate::ids::SourceId;
use crate::reporting::{panic_message, ErrorReporter, FailureKind, ObserverFailure};
use crate::scope::{CancellationSignal, Scope};
use crate::sync::lock;

/// Type-erased observer
pub(crate) type ObserverFn<T> = Box<dyn Fn(&Resolver) -> anyhow::Result<T> + Send + Sync>;

/// Failure of a single evaluation
pub(crate) type EvaluationFailure = (FailureKind, String);

/// Run `observer` once, turning errors and panics into a failure
pub(crate) fn evaluate<T>(
    observer: &ObserverFn<T>,
    resolver: &Resolver,
) -> Result<T, EvaluationFailure> {
    match panic::catch_unwind(AssertUnwindSafe(|| observer(resolver))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err((FailureKind::Error, format!("{e:#}"))),
        Err(payload) => Err((FailureKind::Panic, panic_message(payload.as_ref()))),
    }
}

/// Result of the synchronous first evaluation
pub(crate) struct Initial<T> {
    pub(crate) value: T,
    pub(crate) resolver: Resolver,
    pub(crate) failure: Option<EvaluationFailure>,
}

/// Change listener that schedules at most one pending re-evaluation
pub(crate) struct Trigger {
    pending: AtomicBool,
    notify: Notify,
}

impl Trigger {
    fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }
}

impl ChangeListener for Trigger {
    fn on_change(&self, _source: SourceId) {
        if !self.pending.swap(true, Ordering::AcqRel) {
            self.notify.notify_one();
        }
    }
}

struct Dependency {
    observable: Arc<dyn Observable>,
    key: ListenerKey,
}

pub(crate) struct Observation<T> {
    inner: Arc<DerivedInner<T>>,
    observer: ObserverFn<T>,
    dependencies: Mutex<HashMap<SourceId, Dependency>>,
    trigger: Arc<Trigger>,
    reporter: Arc<dyn ErrorReporter>,
    scope_cancel: CancellationSignal,
    dispose: CancellationSignal,
}

impl<T> Observation<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Subscribe to newly read sources
    ///
    /// With `replace`, sources not read this time are unsubscribed first.
    /// A failed evaluation passes `replace = false` so the old dependencies
    /// stay subscribed alongside whatever the failed run managed to read.
    fn track(
        &self,
        dependencies: &mut HashMap<SourceId, Dependency>,
        reads: HashMap<SourceId, TrackedRead>,
        replace: bool,
    ) {
        if replace {
            dependencies.retain(|id, dependency| {
                let keep = reads.contains_key(id);
                if !keep {
                    dependency.observable.remove_listener(dependency.key);
                }
                keep
            });
        }

        let trigger: Arc<dyn ChangeListener> = self.trigger.clone();
        let listener: Weak<dyn ChangeListener> = Arc::downgrade(&trigger);
        let mut moved = false;

        for (id, read) in reads {
            if let Entry::Vacant(slot) = dependencies.entry(id) {
                let key = read.observable.add_listener(listener.clone());
                // Changed between the read and the subscription
                moved |= read.observable.revision() != read.revision;
                slot.insert(Dependency {
                    observable: read.observable,
                    key,
                });
            }
        }

        if moved {
            self.trigger.on_change(self.inner.id());
        }
    }

    fn reevaluate(&self) {
        let mut dependencies = lock(&self.dependencies);

        let resolver = Resolver::new();
        let outcome = evaluate(&self.observer, &resolver);
        let reads = resolver.into_reads();
        self.inner.record_evaluation();

        // Cancelled while evaluating: the value is already frozen
        if self.inner.is_stopped() {
            trace!(derived = %self.inner.id(), "Evaluation finished after cancel, result dropped");
            return;
        }

        match outcome {
            Ok(value) => {
                self.track(&mut dependencies, reads, true);
                match self.inner.publish(value) {
                    Some(revision) => debug!(
                        derived = %self.inner.id(),
                        revision,
                        dependencies = dependencies.len(),
                        "Derived value updated"
                    ),
                    None => trace!(derived = %self.inner.id(), "Derived value unchanged"),
                }
            }
            Err((kind, message)) => {
                self.track(&mut dependencies, reads, false);
                let failure = ObserverFailure::new(
                    self.inner.id(),
                    self.inner.scope_id(),
                    self.inner.revision(),
                    kind,
                    message,
                );
                self.reporter.report(&failure);
            }
        }
    }

    fn release(&self) {
        let mut dependencies = lock(&self.dependencies);
        for (_, dependency) in dependencies.drain() {
            dependency.observable.remove_listener(dependency.key);
        }
        self.inner.mark_released();
    }

    async fn run(self: Arc<Self>, coalesce: CoalesceStrategy) {
        loop {
            tokio::select! {
                biased;
                _ = self.scope_cancel.cancelled() => break,
                _ = self.dispose.cancelled() => break,
                _ = self.trigger.notify.notified() => {}
            }

            tokio::select! {
                biased;
                _ = self.scope_cancel.cancelled() => break,
                _ = self.dispose.cancelled() => break,
                _ = coalesce.settle() => {}
            }

            self.trigger.pending.store(false, Ordering::Release);
            self.reevaluate();
        }

        self.release();
        debug!(
            derived = %self.inner.id(),
            revision = self.inner.revision(),
            evaluations = self.inner.evaluation_count(),
            "Observation stopped, value frozen"
        );
    }
}

/// Wire up a derived value whose first evaluation has already happened
///
/// On an inactive scope nothing is subscribed and the value is frozen at
/// `initial.value`.
pub(crate) fn launch<S, T>(
    scope: &S,
    observer: ObserverFn<T>,
    initial: Initial<T>,
    dispose: CancellationSignal,
) -> Arc<DerivedInner<T>>
where
    S: Scope + ?Sized,
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let scope_cancel = scope.cancellation();
    let inner = Arc::new(DerivedInner::new(
        scope.id(),
        initial.value,
        scope_cancel.clone(),
        dispose.clone(),
    ));
    inner.record_evaluation();

    let reporter = scope.reporter();
    if let Some((kind, message)) = initial.failure {
        reporter.report(&ObserverFailure::new(
            inner.id(),
            scope.id(),
            0,
            kind,
            message,
        ));
    }

    if let Err(e) = scope.ensure_active() {
        debug!(derived = %inner.id(), error = %e, "Derived value frozen at creation");
        inner.mark_released();
        return inner;
    }

    let observation = Arc::new(Observation {
        inner: inner.clone(),
        observer,
        dependencies: Mutex::new(HashMap::new()),
        trigger: Arc::new(Trigger::new()),
        reporter,
        scope_cancel,
        dispose,
    });

    {
        let mut dependencies = lock(&observation.dependencies);
        observation.track(&mut dependencies, initial.resolver.into_reads(), true);
    }

    let task = observation.clone().run(scope.config().coalesce);

    if scope.launch_observation(Box::pin(task)) {
        trace!(derived = %inner.id(), scope = %scope.id(), "Derived value observing");
    } else {
        // Cancelled between the activity check and the launch
        debug!(
            derived = %inner.id(),
            error = %ReactiveError::ScopeCancelled(scope.id()),
            "Derived value frozen at creation"
        );
        observation.release();
    }

    inner
}

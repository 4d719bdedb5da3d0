// Copyright (c) 2025 - Cowboy AI, Inc.
//! Side-effect observers
//!
//! `auto_run` is a derived value whose output is `()`: the effect runs once
//! immediately and again, coalesced, whenever something it read changes.

use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::derived::{DerivedInner, DerivedState};
use super::engine::{self, Initial, ObserverFn};
use super::resolver::Resolver;
use crate::ids::SourceId;
use crate::scope::{CancellationSignal, Scope};

/// Handle to a running side-effect observer
///
/// Dropping the handle does not stop the effect; it runs until the scope is
/// cancelled or [`AutoRun::dispose`] is called.
pub struct AutoRun {
    inner: Arc<DerivedInner<()>>,
    dispose: CancellationSignal,
}

impl AutoRun {
    /// Identity of the observer
    pub fn id(&self) -> SourceId {
        self.inner.id()
    }

    /// How many times the effect has run, including the initial run
    pub fn run_count(&self) -> u64 {
        self.inner.evaluation_count()
    }

    /// Whether the effect will still re-run on change
    pub fn is_active(&self) -> bool {
        !self.dispose.is_cancelled() && self.inner.state() == DerivedState::Active
    }

    /// Stop this observer without touching the rest of the scope
    pub fn dispose(&self) {
        if self.dispose.cancel() {
            debug!(effect = %self.inner.id(), "Effect disposed");
        }
    }
}

impl fmt::Debug for AutoRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoRun")
            .field("id", &self.inner.id())
            .field("run_count", &self.run_count())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Run `effect` now and whenever a source it read changes
///
/// Unlike [`derived`](super::derived::derived), a panic in the first run is
/// caught and reported; the effect stays subscribed to whatever it read
/// before failing.
pub fn auto_run<S, F>(scope: &S, effect: F) -> AutoRun
where
    S: Scope + ?Sized,
    F: Fn(&Resolver) + Send + Sync + 'static,
{
    let observer: ObserverFn<()> = Box::new(move |r| {
        effect(r);
        Ok(())
    });

    let resolver = Resolver::new();
    let failure = engine::evaluate(&observer, &resolver).err();
    let initial = Initial {
        value: (),
        resolver,
        failure,
    };

    let dispose = CancellationSignal::new();
    let inner = engine::launch(scope, observer, initial, dispose.clone());
    AutoRun { inner, dispose }
}

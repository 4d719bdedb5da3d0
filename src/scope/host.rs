// Copyright (c) 2025 - Cowboy AI, Inc.
//! Host binding
//!
//! Any long-lived object that owns a scope implements [`ScopeHost`] and gets
//! derived values bound to its own lifetime:
//!
//! ```rust,ignore
//! struct CartModel {
//!     scope: ObservationScope,
//!     items: Behavior<Vec<Item>>,
//! }
//!
//! impl ScopeHost for CartModel {
//!     type Scope = ObservationScope;
//!     fn scope(&self) -> &ObservationScope { &self.scope }
//! }
//!
//! let count = model.derived({
//!     let items = model.items.clone();
//!     move |r| r.get(&items).len()
//! });
//! ```
//!
//! When the model is dropped its scope handle goes with it, the scope is
//! cancelled and `count` freezes.

use super::Scope;
use crate::frp::{auto_run, derived, try_derived, AutoRun, DerivedValue, Resolver};

/// An object that owns a [`Scope`]
pub trait ScopeHost {
    /// The concrete scope type
    type Scope: Scope;

    /// The scope bound to this host's lifetime
    fn scope(&self) -> &Self::Scope;

    /// [`derived`] on this host's scope
    fn derived<T, F>(&self, observer: F) -> DerivedValue<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&Resolver) -> T + Send + Sync + 'static,
    {
        derived(self.scope(), observer)
    }

    /// [`try_derived`] on this host's scope
    fn try_derived<T, F>(&self, fallback: T, observer: F) -> DerivedValue<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&Resolver) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        try_derived(self.scope(), fallback, observer)
    }

    /// [`auto_run`] on this host's scope
    fn auto_run<F>(&self, effect: F) -> AutoRun
    where
        F: Fn(&Resolver) + Send + Sync + 'static,
    {
        auto_run(self.scope(), effect)
    }
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Scope-bound derived values for the Composable Information Machine
//!
//! A derived value is computed from other reactive values and recomputed
//! whenever one of the values it actually read changes. Every derived value
//! lives on a [`Scope`](scope::Scope); cancelling the scope stops all of its
//! observations and freezes the values at their last state.
//!
//! ```rust,ignore
//! use cim_reactive::prelude::*;
//!
//! let scope = ObservationScope::new()?;
//! let src = Behavior::new(5);
//! let x = derived(&scope, {
//!     let src = src.clone();
//!     move |r| r.get(&src) * 2
//! });
//! assert_eq!(x.value(), 10);
//! ```

pub mod config;
pub mod errors;
pub mod frp;
pub mod ids;
pub mod reporting;
pub mod scope;
mod sync;

// Re-export commonly used types
pub use config::{CoalesceStrategy, ReactiveConfig};
pub use errors::{ReactiveError, ReactiveResult};
pub use frp::{
    apply2, apply3, auto_run, derived, map, try_derived, AutoRun, Behavior, DerivedState,
    DerivedValue, Resolver, Signal, Subscription, Versioned,
};
pub use ids::{ScopeId, SourceId};
pub use reporting::{
    CollectingReporter, ErrorReporter, FailureKind, NullReporter, ObserverFailure,
    TracingReporter,
};
pub use scope::{CancellationSignal, ObservationScope, Scope, ScopeBuilder, ScopeHost};

/// Everything needed to create and observe derived values
pub mod prelude {
    pub use crate::config::{CoalesceStrategy, ReactiveConfig};
    pub use crate::frp::{
        apply2, apply3, auto_run, derived, map, try_derived, AutoRun, Behavior, DerivedValue,
        Resolver, Signal,
    };
    pub use crate::scope::{ObservationScope, Scope, ScopeHost};
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Signal Traits - Base abstractions for reactive values
//!
//! This module defines the two traits every reactive source implements:
//!
//! ```text
//! Observable  (object-safe; identity, revision, listener registry)
//!     ▲
//!     │ as_observable()
//!     │
//! Signal      (typed; sample the current value)
//!   ├── Behavior<T>       mutable source
//!   └── DerivedValue<T>   computed source
//! ```
//!
//! `Observable` is what the dependency tracker stores: a derived value keeps
//! `Arc<dyn Observable>` handles to everything it read so it can unsubscribe
//! later without knowing the value types. `Signal` is what observer code reads
//! through a [`Resolver`](super::resolver::Resolver).
//!
//! # Revisions
//!
//! Every source carries a revision counter that starts at 0 and increments by
//! exactly 1 per change of value. Writing a value equal to the current one
//! does not bump the revision and does not notify.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};

use crate::ids::SourceId;

/// Key identifying one listener registration on a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerKey(pub(crate) u64);

/// Receiver of change notifications
///
/// Sources hold listeners weakly. A listener that is dropped simply stops
/// receiving notifications and is pruned on the next notification cycle.
pub trait ChangeListener: Send + Sync {
    /// Called after `source` changed value
    ///
    /// Invoked outside the source's registry lock, possibly from any thread.
    fn on_change(&self, source: SourceId);
}

/// Object-safe side of a reactive source
pub trait Observable: Send + Sync {
    /// Stable identity of the source
    fn source_id(&self) -> SourceId;

    /// Current revision of the source
    fn revision(&self) -> u64;

    /// Register a listener, returning the key needed to remove it
    fn add_listener(&self, listener: Weak<dyn ChangeListener>) -> ListenerKey;

    /// Remove a listener; returns false if it was not registered
    fn remove_listener(&self, key: ListenerKey) -> bool;

    /// Number of live listeners
    fn listener_count(&self) -> usize;
}

/// Typed reactive value that can be read and observed
///
/// # Example
///
/// ```rust,ignore
/// fn describe<S: Signal<Value = i32>>(signal: &S) -> String {
///     format!("{} @ r{}", signal.sample(), signal.revision())
/// }
/// ```
pub trait Signal: Clone + Send + Sync + 'static {
    /// The type of value the signal carries
    type Value: Clone + Send + Sync + 'static;

    /// Read the current value without tracking it as a dependency
    fn sample(&self) -> Self::Value;

    /// Current revision
    fn revision(&self) -> u64;

    /// The registry side of this signal
    fn as_observable(&self) -> Arc<dyn Observable>;
}

/// A value together with the revision it was published at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    /// The value
    pub value: T,
    /// Revision at which `value` was published
    pub revision: u64,
}

impl<T> Versioned<T> {
    /// Wrap an initial value at revision 0
    pub fn initial(value: T) -> Self {
        Self { value, revision: 0 }
    }

    /// Replace the value if it differs, bumping the revision
    ///
    /// Returns whether the value changed.
    pub fn replace_if_changed(&mut self, value: T) -> bool
    where
        T: PartialEq,
    {
        if self.value == value {
            return false;
        }
        self.value = value;
        self.revision += 1;
        true
    }
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Reactive values
//!
//! # Core Concepts
//!
//! ## Behavior<T>
//!
//! A mutable source. It always has a value; `set` replaces it and notifies
//! whoever depends on it, unless the new value equals the old one.
//!
//! ## DerivedValue<T>
//!
//! A read-only value computed by an observer function from other signals and
//! kept up to date on a [`Scope`](crate::scope::Scope):
//!
//! ```text
//! Behavior ──┐
//!            ├──> observer(&Resolver) ──> DerivedValue ──> observer ──> DerivedValue
//! Behavior ──┘         ▲                        │
//!                      └── re-run on change ────┘
//! ```
//!
//! ## Resolver
//!
//! The context an observer reads through. Every `r.get(&signal)` records
//! `signal` as a dependency of the current evaluation; after the evaluation
//! the derived value subscribes to exactly the recorded set.
//!
//! # Guarantees
//!
//! - Revisions start at 0 and increase by one per published change.
//! - An evaluation that yields a value equal to the current one publishes
//!   nothing.
//! - A burst of source changes yields at least one and usually exactly one
//!   re-evaluation, which observes the final values.
//! - Evaluations of one derived value never overlap.
//! - After the scope is cancelled, values are frozen and keep their last
//!   value.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cim_reactive::frp::*;
//!
//! let price = Behavior::new(10);
//! let qty = Behavior::new(3);
//! let total = derived(&scope, {
//!     let (price, qty) = (price.clone(), qty.clone());
//!     move |r| r.get(&price) * r.get(&qty)
//! });
//!
//! let _log = auto_run(&scope, {
//!     let total = total.clone();
//!     move |r| println!("total = {}", r.get(&total))
//! });
//! ```

pub mod auto_run;
pub mod behavior;
pub mod combinators;
pub mod derived;
mod engine;
pub mod registry;
pub mod resolver;
pub mod signal;

pub use auto_run::{auto_run, AutoRun};
pub use behavior::Behavior;
pub use combinators::{apply2, apply3, map};
pub use derived::{derived, try_derived, DerivedState, DerivedValue};
pub use registry::Subscription;
pub use resolver::Resolver;
pub use signal::{ChangeListener, ListenerKey, Observable, Signal, Versioned};

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Signal Combinators
//!
//! Shorthands for derived values over a fixed set of inputs. Each combinator
//! is `derived` with an observer that reads exactly its arguments, so the
//! result follows the same revision, coalescing and freezing rules.
//!
//! # Available Combinators
//!
//! - `map` - Transform one signal (Functor)
//! - `apply2` - Combine two signals with a binary function
//! - `apply3` - Combine three signals with a ternary function
//!
//! # Examples
//!
//! ```rust,ignore
//! use cim_reactive::frp::combinators::*;
//!
//! let x = Behavior::new(3);
//! let y = Behavior::new(4);
//!
//! let sum = apply2(&scope, &x, &y, |a, b| a + b);
//! assert_eq!(sum.value(), 7);
//!
//! let label = map(&scope, &sum, |n| format!("total: {n}"));
//! assert_eq!(label.value(), "total: 7");
//! ```

use super::derived::{derived, DerivedValue};
use super::signal::Signal;
use crate::scope::Scope;

/// Transform a signal's value
///
/// # Examples
///
/// ```rust,ignore
/// let celsius = Behavior::new(100.0);
/// let fahrenheit = map(&scope, &celsius, |c| c * 9.0 / 5.0 + 32.0);
/// assert_eq!(fahrenheit.value(), 212.0);
/// ```
pub fn map<S, A, V, F>(scope: &S, signal: &A, f: F) -> DerivedValue<V>
where
    S: Scope + ?Sized,
    A: Signal,
    V: Clone + PartialEq + Send + Sync + 'static,
    F: Fn(A::Value) -> V + Send + Sync + 'static,
{
    let signal = signal.clone();
    derived(scope, move |r| f(r.get(&signal)))
}

/// Combine two signals using a binary function
pub fn apply2<S, A, B, V, F>(scope: &S, a: &A, b: &B, f: F) -> DerivedValue<V>
where
    S: Scope + ?Sized,
    A: Signal,
    B: Signal,
    V: Clone + PartialEq + Send + Sync + 'static,
    F: Fn(A::Value, B::Value) -> V + Send + Sync + 'static,
{
    let (a, b) = (a.clone(), b.clone());
    derived(scope, move |r| f(r.get(&a), r.get(&b)))
}

/// Combine three signals using a ternary function
///
/// # Examples
///
/// ```rust,ignore
/// let volume = apply3(&scope, &width, &height, &depth, |w, h, d| w * h * d);
/// ```
pub fn apply3<S, A, B, C, V, F>(scope: &S, a: &A, b: &B, c: &C, f: F) -> DerivedValue<V>
where
    S: Scope + ?Sized,
    A: Signal,
    B: Signal,
    C: Signal,
    V: Clone + PartialEq + Send + Sync + 'static,
    F: Fn(A::Value, B::Value, C::Value) -> V + Send + Sync + 'static,
{
    let (a, b, c) = (a.clone(), b.clone(), c.clone());
    derived(scope, move |r| f(r.get(&a), r.get(&b), r.get(&c)))
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resolver - dependency collection during evaluation
//!
//! Observers never read sources through ambient global state. Each evaluation
//! gets its own `Resolver`, and every tracked read goes through it:
//!
//! ```rust,ignore
//! let total = derived(&scope, |r| r.get(&price) * r.get(&quantity));
//! ```
//!
//! Because the collector is passed explicitly, independent derived values can
//! evaluate concurrently on different threads without sharing anything.
//!
//! Each tracked read records the source revision *before* sampling it. After
//! the engine subscribes to the collected sources it compares those revisions
//! with the current ones; a source that moved in between gets the derived
//! value re-evaluated, so no change can slip through the gap between reading a
//! source and subscribing to it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::signal::{Observable, Signal};
use crate::ids::SourceId;

/// A source read during one evaluation
pub(crate) struct TrackedRead {
    pub(crate) observable: Arc<dyn Observable>,
    pub(crate) revision: u64,
}

/// Per-evaluation dependency collector
pub struct Resolver {
    reads: RefCell<HashMap<SourceId, TrackedRead>>,
}

impl Resolver {
    pub(crate) fn new() -> Self {
        Self {
            reads: RefCell::new(HashMap::new()),
        }
    }

    /// Read `signal` and record it as a dependency
    pub fn get<S: Signal>(&self, signal: &S) -> S::Value {
        let observable = signal.as_observable();
        let revision = observable.revision();
        let value = signal.sample();

        self.reads
            .borrow_mut()
            .entry(observable.source_id())
            .or_insert(TrackedRead {
                observable,
                revision,
            });

        value
    }

    /// Read `signal` without recording a dependency
    pub fn untracked<S: Signal>(&self, signal: &S) -> S::Value {
        signal.sample()
    }

    /// Number of distinct sources read so far
    pub fn dependency_count(&self) -> usize {
        self.reads.borrow().len()
    }

    /// Whether `source` has been read so far
    pub fn depends_on(&self, source: SourceId) -> bool {
        self.reads.borrow().contains_key(&source)
    }

    pub(crate) fn into_reads(self) -> HashMap<SourceId, TrackedRead> {
        self.reads.into_inner()
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("dependencies", &self.dependency_count())
            .finish()
    }
}

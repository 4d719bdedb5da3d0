// Copyright (c) 2025 - Cowboy AI, Inc.
//! Failure Reporting
//!
//! A failing observer never breaks its derived value: the last good value is
//! kept and the failure goes to an [`ErrorReporter`] attached to the scope.
//!
//! # Architecture
//!
//! ```text
//! Observation task             Reporter
//! ────────────────            ──────────
//!
//! evaluate() ── Err/panic ──> report(&ObserverFailure)
//!     │                           │
//!     ▼                           ▼
//! last good value kept        tracing / collector / nothing
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let reporter = CollectingReporter::new();
//! let scope = ScopeBuilder::new()
//!     .reporter(Arc::new(reporter.clone()))
//!     .build()?;
//!
//! // ... later
//! assert!(reporter.failures().is_empty());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::{Arc, Mutex};
use tracing::error;

use crate::errors::ReactiveError;
use crate::ids::{ScopeId, SourceId};
use crate::sync::lock;

/// How an evaluation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The observer returned an error
    Error,
    /// The observer panicked
    Panic,
}

/// A failed evaluation of an observer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverFailure {
    /// Derived value whose observer failed
    pub derived_id: SourceId,
    /// Scope owning the observation
    pub scope_id: ScopeId,
    /// Revision of the value that was retained
    pub retained_revision: u64,
    /// Error or panic message
    pub message: String,
    /// Error or panic
    pub kind: FailureKind,
    /// When the failure happened
    pub occurred_at: DateTime<Utc>,
}

impl ObserverFailure {
    pub(crate) fn new(
        derived_id: SourceId,
        scope_id: ScopeId,
        retained_revision: u64,
        kind: FailureKind,
        message: String,
    ) -> Self {
        Self {
            derived_id,
            scope_id,
            retained_revision,
            message,
            kind,
            occurred_at: Utc::now(),
        }
    }

    /// The failure as a [`ReactiveError`]
    pub fn to_error(&self) -> ReactiveError {
        match self.kind {
            FailureKind::Error => ReactiveError::ObserverFailed(self.message.clone()),
            FailureKind::Panic => ReactiveError::ObserverPanicked(self.message.clone()),
        }
    }
}

/// Extract a readable message from a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Receiver of observer failures
///
/// Implementations are called synchronously from the observation task, inside
/// the derived value's critical section. They must not block.
pub trait ErrorReporter: Send + Sync {
    /// Report a failure
    fn report(&self, failure: &ObserverFailure);
}

/// Tracing reporter - logs failures at error level
///
/// The default reporter of every scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, failure: &ObserverFailure) {
        error!(
            derived = %failure.derived_id,
            scope = %failure.scope_id,
            revision = failure.retained_revision,
            kind = ?failure.kind,
            "Observer evaluation failed, keeping last value: {}",
            failure.message
        );
    }
}

/// Null reporter - discards all failures
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl ErrorReporter for NullReporter {
    fn report(&self, _failure: &ObserverFailure) {}
}

/// Collecting reporter - keeps failures for later inspection
///
/// Clones share the same buffer, so a clone can be handed to a scope while
/// the original is kept for assertions.
#[derive(Debug, Clone, Default)]
pub struct CollectingReporter {
    collected: Arc<Mutex<Vec<ObserverFailure>>>,
}

impl CollectingReporter {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// All failures collected so far
    pub fn failures(&self) -> Vec<ObserverFailure> {
        lock(&self.collected).clone()
    }

    /// Number of failures collected
    pub fn len(&self) -> usize {
        lock(&self.collected).len()
    }

    /// Whether no failure was collected
    pub fn is_empty(&self) -> bool {
        lock(&self.collected).is_empty()
    }

    /// Take all collected failures, leaving the collector empty
    pub fn take_failures(&self) -> Vec<ObserverFailure> {
        std::mem::take(&mut *lock(&self.collected))
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, failure: &ObserverFailure) {
        lock(&self.collected).push(failure.clone());
    }
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Scopes - structured lifetimes for observation tasks
//!
//! A scope is the lifetime boundary of every derived value created on it.
//! While the scope is active its observation tasks keep derived values up to
//! date; once it is cancelled the tasks stop, release their subscriptions and
//! leave each derived value frozen at its last value.
//!
//! ```text
//!            launch_observation()            cancel()
//! Active ──────────────────────────> Active ──────────> Cancelled
//!   │  tasks run, values update                          │ tasks stop
//!   │                                                    │ values frozen
//!   └──────────── launch on Cancelled: no-op ────────────┘
//! ```
//!
//! [`Scope`] is a trait so that any host lifetime object can provide one;
//! [`ObservationScope`] is the tokio implementation. Hosts that own a scope
//! implement [`ScopeHost`] to get `derived(...)` forwarding for free.

pub mod cancel;
pub mod host;
pub mod observation;

pub use crate::ids::ScopeId;
pub use cancel::CancellationSignal;
pub use host::ScopeHost;
pub use observation::{ObservationScope, ScopeBuilder};

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::ReactiveConfig;
use crate::errors::{ReactiveError, ReactiveResult};
use crate::reporting::ErrorReporter;

/// A long-running task owned by a scope
pub type ObservationTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Structured lifetime boundary for observation tasks
///
/// # Contract
///
/// - Once cancelled, a scope never starts another task and stays cancelled.
/// - Tasks are cancelled cooperatively: they watch [`Scope::cancellation`] and
///   finish their current unit of work before stopping.
#[async_trait]
pub trait Scope: Send + Sync {
    /// Identity of the scope
    fn id(&self) -> ScopeId;

    /// Configuration applied to observations on this scope
    fn config(&self) -> &ReactiveConfig;

    /// Where failed evaluations are reported
    fn reporter(&self) -> Arc<dyn ErrorReporter>;

    /// The scope's cancellation latch
    fn cancellation(&self) -> CancellationSignal;

    /// Whether the scope still accepts and runs tasks
    fn is_active(&self) -> bool {
        !self.cancellation().is_cancelled()
    }

    /// `Err(ScopeCancelled)` if the scope is no longer active
    fn ensure_active(&self) -> ReactiveResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(ReactiveError::ScopeCancelled(self.id()))
        }
    }

    /// Start `task` as part of this scope
    ///
    /// Returns false and drops the task without running it if the scope is
    /// already cancelled. This is a no-op rather than an error so teardown
    /// code never has to handle it.
    fn launch_observation(&self, task: ObservationTask) -> bool;

    /// Cancel the scope and every task it owns
    ///
    /// Idempotent.
    fn cancel(&self);

    /// Cancel, then wait until every owned task has finished
    async fn shutdown(&self);
}

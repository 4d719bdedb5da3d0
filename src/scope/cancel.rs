// Copyright (c) 2025 - Cowboy AI, Inc.
//! Cooperative cancellation signal
//!
//! A one-way latch: once cancelled it stays cancelled. Tasks poll it between
//! units of work and await [`CancellationSignal::cancelled`] while idle.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared, cloneable cancellation latch
#[derive(Clone)]
pub struct CancellationSignal {
    state: Arc<watch::Sender<bool>>,
}

impl CancellationSignal {
    /// Create an uncancelled signal
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Cancel the signal
    ///
    /// Returns true only for the call that actually flipped the latch.
    pub fn cancel(&self) -> bool {
        self.state.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        })
    }

    /// Whether the signal has been cancelled
    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolve once the signal is cancelled
    ///
    /// Resolves immediately if it already is.
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationSignal")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

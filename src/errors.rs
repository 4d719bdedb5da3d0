// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for reactive operations

use thiserror::Error;

use crate::scope::ScopeId;

/// Errors that can occur in reactive operations
///
/// None of these are ever delivered to subscribers of a derived value. They
/// surface through [`ErrorReporter`](crate::reporting::ErrorReporter), through
/// tracing, or from constructors that need a runtime or a configuration.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// The scope was cancelled before the operation could start
    #[error("Scope {0} is already cancelled")]
    ScopeCancelled(ScopeId),

    /// Observer returned an error during evaluation
    #[error("Observer evaluation failed: {0}")]
    ObserverFailed(String),

    /// Observer panicked during evaluation
    #[error("Observer panicked: {0}")]
    ObserverPanicked(String),

    /// No tokio runtime was available to host observation tasks
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for reactive operations
pub type ReactiveResult<T> = Result<T, ReactiveError>;

impl From<serde_json::Error> for ReactiveError {
    fn from(err: serde_json::Error) -> Self {
        ReactiveError::Configuration(err.to_string())
    }
}

impl From<tokio::runtime::TryCurrentError> for ReactiveError {
    fn from(err: tokio::runtime::TryCurrentError) -> Self {
        ReactiveError::Runtime(err.to_string())
    }
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Tokio-backed observation scope

use async_trait::async_trait;
use futures::future::join_all;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::cancel::CancellationSignal;
use super::{ObservationTask, Scope, ScopeHost};
use crate::config::{CoalesceStrategy, ReactiveConfig};
use crate::errors::ReactiveResult;
use crate::ids::ScopeId;
use crate::reporting::{ErrorReporter, TracingReporter};
use crate::sync::lock;

struct ScopeInner {
    id: ScopeId,
    config: ReactiveConfig,
    cancel: CancellationSignal,
    reporter: Arc<dyn ErrorReporter>,
    runtime: Handle,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        if self.cancel.cancel() {
            debug!(scope = %self.id, name = %self.config.name, "Scope dropped, cancelled");
        }
    }
}

/// Scope whose observation tasks run on a tokio runtime
///
/// Cloning creates a new handle to the same scope. Dropping the last handle
/// cancels the scope, which is how a host object tears it down implicitly.
///
/// # Example
///
/// ```rust,ignore
/// let scope = ObservationScope::new()?;
/// let src = Behavior::new(5);
/// let doubled = derived(&scope, {
///     let src = src.clone();
///     move |r| r.get(&src) * 2
/// });
/// assert_eq!(doubled.value(), 10);
///
/// scope.cancel();
/// ```
#[derive(Clone)]
pub struct ObservationScope {
    inner: Arc<ScopeInner>,
}

impl ObservationScope {
    /// Create a scope with default configuration on the current runtime
    pub fn new() -> ReactiveResult<Self> {
        ScopeBuilder::new().build()
    }

    /// Create a scope with the given configuration on the current runtime
    pub fn with_config(config: ReactiveConfig) -> ReactiveResult<Self> {
        ScopeBuilder::new().config(config).build()
    }

    /// Start building a scope
    pub fn builder() -> ScopeBuilder {
        ScopeBuilder::new()
    }

    /// Number of owned tasks that have not finished
    pub fn task_count(&self) -> usize {
        let mut tasks = lock(&self.inner.tasks);
        tasks.retain(|task| !task.is_finished());
        tasks.len()
    }
}

impl fmt::Debug for ObservationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservationScope")
            .field("id", &self.inner.id)
            .field("name", &self.inner.config.name)
            .field("cancelled", &self.inner.cancel.is_cancelled())
            .finish()
    }
}

#[async_trait]
impl Scope for ObservationScope {
    fn id(&self) -> ScopeId {
        self.inner.id
    }

    fn config(&self) -> &ReactiveConfig {
        &self.inner.config
    }

    fn reporter(&self) -> Arc<dyn ErrorReporter> {
        self.inner.reporter.clone()
    }

    fn cancellation(&self) -> CancellationSignal {
        self.inner.cancel.clone()
    }

    fn launch_observation(&self, task: ObservationTask) -> bool {
        let mut tasks = lock(&self.inner.tasks);

        if self.inner.cancel.is_cancelled() {
            debug!(scope = %self.inner.id, "Scope already cancelled, observation not launched");
            return false;
        }

        tasks.retain(|task| !task.is_finished());
        tasks.push(self.inner.runtime.spawn(task));

        trace!(scope = %self.inner.id, tasks = tasks.len(), "Observation launched");
        true
    }

    fn cancel(&self) {
        if self.inner.cancel.cancel() {
            let tasks = lock(&self.inner.tasks).len();
            info!(
                scope = %self.inner.id,
                name = %self.inner.config.name,
                tasks,
                "Scope cancelled"
            );
        }
    }

    async fn shutdown(&self) {
        self.cancel();

        let handles = std::mem::take(&mut *lock(&self.inner.tasks));
        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!(scope = %self.inner.id, error = %e, "Observation task ended abnormally");
            }
        }

        debug!(scope = %self.inner.id, "Scope shut down");
    }
}

impl ScopeHost for ObservationScope {
    type Scope = ObservationScope;

    fn scope(&self) -> &ObservationScope {
        self
    }
}

/// Builder for [`ObservationScope`]
pub struct ScopeBuilder {
    config: ReactiveConfig,
    reporter: Option<Arc<dyn ErrorReporter>>,
    runtime: Option<Handle>,
}

impl ScopeBuilder {
    /// Create a builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ReactiveConfig::default(),
            reporter: None,
            runtime: None,
        }
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: ReactiveConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the scope name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the coalesce strategy
    pub fn coalesce(mut self, coalesce: CoalesceStrategy) -> Self {
        self.config.coalesce = coalesce;
        self
    }

    /// Set the failure reporter (defaults to [`TracingReporter`])
    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Run observation tasks on this runtime instead of the current one
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Build the scope
    ///
    /// Fails if no runtime was given and none is current.
    pub fn build(self) -> ReactiveResult<ObservationScope> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current()?,
        };

        let inner = ScopeInner {
            id: ScopeId::new(),
            config: self.config,
            cancel: CancellationSignal::new(),
            reporter: self.reporter.unwrap_or_else(|| Arc::new(TracingReporter)),
            runtime,
            tasks: Mutex::new(Vec::new()),
        };

        debug!(scope = %inner.id, name = %inner.config.name, "Scope created");

        Ok(ObservationScope {
            inner: Arc::new(inner),
        })
    }
}

impl Default for ScopeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ReactiveError;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_build_without_runtime_fails() {
        let result = ObservationScope::new();
        assert!(matches!(result, Err(ReactiveError::Runtime(_))));
    }

    #[test]
    fn test_build_with_explicit_runtime() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let scope = ScopeBuilder::new()
            .name("explicit")
            .runtime(runtime.handle().clone())
            .build()
            .unwrap();
        assert_eq!(scope.config().name, "explicit");
        assert!(scope.is_active());
    }

    #[tokio::test]
    async fn test_launch_runs_task() {
        let scope = ObservationScope::new().unwrap();
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();

        assert!(scope.launch_observation(Box::pin(async move {
            ran_clone.store(true, Ordering::SeqCst);
        })));

        scope.shutdown().await;
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_launch_after_cancel_is_noop() {
        let scope = ObservationScope::new().unwrap();
        scope.cancel();

        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        let launched = scope.launch_observation(Box::pin(async move {
            ran_clone.store(true, Ordering::SeqCst);
        }));

        assert!(!launched);
        assert_eq!(scope.task_count(), 0);
        tokio::task::yield_now().await;
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let scope = ObservationScope::new().unwrap();
        scope.cancel();
        scope.cancel();
        assert!(!scope.is_active());
        assert!(matches!(
            scope.ensure_active(),
            Err(ReactiveError::ScopeCancelled(id)) if id == scope.id()
        ));
    }

    #[tokio::test]
    async fn test_cancel_stops_cooperative_tasks() {
        let scope = ObservationScope::new().unwrap();
        let signal = scope.cancellation();
        scope.launch_observation(Box::pin(async move { signal.cancelled().await }));
        assert_eq!(scope.task_count(), 1);

        scope.shutdown().await;
        assert_eq!(scope.task_count(), 0);
    }

    #[tokio::test]
    async fn test_dropping_last_handle_cancels() {
        let scope = ObservationScope::new().unwrap();
        let signal = scope.cancellation();
        let clone = scope.clone();

        drop(scope);
        assert!(!signal.is_cancelled());
        drop(clone);
        assert!(signal.is_cancelled());
    }
}

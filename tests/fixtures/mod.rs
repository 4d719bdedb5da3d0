// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-reactive
//!
//! Shared helpers for integration tests: scope construction with a collecting
//! reporter, a settle helper that lets pending observations run, and an
//! opt-in tracing subscriber.
//!
//! # Design Principles
//! - Tests run on the current-thread runtime so "one scheduling tick" is
//!   deterministic
//! - Failures are collected, never just logged, so tests can assert on them

#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

use cim_reactive::{
    Behavior, CoalesceStrategy, CollectingReporter, DerivedValue, ObservationScope, Versioned,
};

static TRACING: Once = Once::new();

/// Install a test tracing subscriber once per test binary
///
/// Output is captured by the test harness; set RUST_LOG to see it.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Let every ready observation task run to completion of its current step
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Scope with the default strategy and a collecting reporter
pub fn scope_with_reporter() -> (ObservationScope, CollectingReporter) {
    scope_with(CoalesceStrategy::default())
}

/// Scope with the given strategy and a collecting reporter
pub fn scope_with(coalesce: CoalesceStrategy) -> (ObservationScope, CollectingReporter) {
    init_tracing();
    let reporter = CollectingReporter::new();
    let scope = ObservationScope::builder()
        .name("test-scope")
        .coalesce(coalesce)
        .reporter(Arc::new(reporter.clone()))
        .build()
        .expect("test runtime must be current");
    (scope, reporter)
}

/// `x = src * 2`, the canonical scenario value
pub fn doubled(scope: &ObservationScope, src: &Behavior<i64>) -> DerivedValue<i64> {
    let src = src.clone();
    cim_reactive::derived(scope, move |r| r.get(&src) * 2)
}

/// Poll `condition` until it holds, failing the test after five seconds
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// Wait for `revision`, failing the test if it takes more than a second
pub async fn expect_revision<T>(value: &DerivedValue<T>, revision: u64) -> Versioned<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    tokio::time::timeout(Duration::from_secs(1), value.wait_for_revision(revision))
        .await
        .expect("derived value did not reach revision in time")
}

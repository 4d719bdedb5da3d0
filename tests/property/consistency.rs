// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Derived Value Consistency
//!
//! Each property drives a fresh scope on a current-thread runtime through a
//! generated sequence of writes and checks what a reader can observe.

use cim_reactive::prelude::*;
use cim_reactive::NullReporter;
use proptest::prelude::*;
use std::sync::Arc;
use tokio_test::block_on;

// ============================================================================
// Generators
// ============================================================================

/// One step of a test run
#[derive(Debug, Clone)]
enum Step {
    /// Write to source `a`
    SetA(i32),
    /// Write to source `b`
    SetB(i32),
    /// Let pending observations run
    Yield,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (-50i32..50).prop_map(Step::SetA),
        (-50i32..50).prop_map(Step::SetB),
        Just(Step::Yield),
    ]
}

async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

fn quiet_scope() -> ObservationScope {
    ObservationScope::builder()
        .reporter(Arc::new(NullReporter))
        .build()
        .expect("block_on provides a runtime")
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Once everything has settled the derived value equals the observer
    /// applied to the current source values
    #[test]
    fn prop_settled_value_matches_sources(steps in prop::collection::vec(step(), 0..40)) {
        block_on(async {
            let scope = quiet_scope();
            let a = Behavior::new(0i32);
            let b = Behavior::new(0i32);
            let combined = apply2(&scope, &a, &b, |a, b| a.wrapping_mul(3).wrapping_add(b));

            for step in &steps {
                match step {
                    Step::SetA(v) => { a.set(*v); }
                    Step::SetB(v) => { b.set(*v); }
                    Step::Yield => settle().await,
                }
            }
            settle().await;

            prop_assert_eq!(combined.value(), a.sample().wrapping_mul(3).wrapping_add(b.sample()));
            Ok(())
        })?;
    }

    /// Revisions seen by a watcher strictly increase, and the number of
    /// published revisions never exceeds the number of evaluations
    #[test]
    fn prop_revisions_are_monotonic(steps in prop::collection::vec(step(), 1..40)) {
        block_on(async {
            let scope = quiet_scope();
            let a = Behavior::new(0i32);
            let b = Behavior::new(0i32);
            let diff = apply2(&scope, &a, &b, |a, b| a - b);
            let mut rx = diff.changes();
            let mut last = rx.borrow_and_update().revision;

            for step in &steps {
                match step {
                    Step::SetA(v) => { a.set(*v); }
                    Step::SetB(v) => { b.set(*v); }
                    Step::Yield => settle().await,
                }
                if rx.has_changed().unwrap_or(false) {
                    let now = rx.borrow_and_update().revision;
                    prop_assert!(now > last);
                    last = now;
                }
            }

            prop_assert!(diff.revision() < diff.evaluation_count());
            Ok(())
        })?;
    }

    /// Any number of writes before the observation runs costs exactly one
    /// re-evaluation
    #[test]
    fn prop_burst_costs_one_evaluation(values in prop::collection::vec(-100i32..100, 1..30)) {
        block_on(async {
            let scope = quiet_scope();
            let src = Behavior::new(1000i32);
            let negated = map(&scope, &src, |v| -v);

            for v in &values {
                src.set(*v);
            }
            settle().await;

            prop_assert_eq!(negated.evaluation_count(), 2);
            prop_assert_eq!(negated.value(), -values[values.len() - 1]);
            Ok(())
        })?;
    }

    /// After cancellation no write is ever visible
    #[test]
    fn prop_frozen_value_never_changes(
        before in prop::collection::vec(-100i32..100, 0..10),
        after in prop::collection::vec(-100i32..100, 1..20),
    ) {
        block_on(async {
            let scope = quiet_scope();
            let src = Behavior::new(0i32);
            let tracked = map(&scope, &src, |v| v);

            for v in &before {
                src.set(*v);
                settle().await;
            }

            scope.shutdown().await;
            let frozen = tracked.snapshot();

            for v in &after {
                src.set(*v);
                settle().await;
                prop_assert_eq!(tracked.snapshot(), frozen.clone());
            }
            prop_assert!(tracked.is_frozen());
            Ok(())
        })?;
    }
}

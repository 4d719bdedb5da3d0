// Copyright (c) 2025 - Cowboy AI, Inc.
//! Derived Values Under Parallelism
//!
//! Scenarios on the multi-threaded runtime with OS threads writing to shared
//! sources: evaluations of one value never overlap, independent values
//! evaluate in parallel, watchers see increasing revisions, and a scope
//! cancelled mid-evaluation stays frozen.

mod fixtures;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use cim_reactive::prelude::*;
use cim_reactive::{DerivedState, Versioned};
use fixtures::{eventually, scope_with_reporter};
use pretty_assertions::assert_eq;

const WRITERS: i64 = 4;
const WRITES_PER_THREAD: i64 = 200;

/// Spawn OS threads that each write to both sources
fn spawn_writers(a: &Behavior<i64>, b: &Behavior<i64>) -> Vec<thread::JoinHandle<()>> {
    (0..WRITERS)
        .map(|w| {
            let (a, b) = (a.clone(), b.clone());
            thread::spawn(move || {
                for i in 0..WRITES_PER_THREAD {
                    a.set(w * 1_000 + i);
                    b.update(|v| *v += 1);
                }
            })
        })
        .collect()
}

fn join_writers(handles: Vec<thread::JoinHandle<()>>) {
    for handle in handles {
        handle.join().expect("writer thread panicked");
    }
}

/// Drain a change stream until it has been quiet for `quiet`
async fn collect_revisions(
    mut rx: tokio::sync::watch::Receiver<Versioned<i64>>,
    quiet: Duration,
) -> Vec<u64> {
    let mut revisions = vec![rx.borrow_and_update().revision];
    while let Ok(Ok(())) = tokio::time::timeout(quiet, rx.changed()).await {
        revisions.push(rx.borrow_and_update().revision);
    }
    revisions
}

fn assert_strictly_increasing(revisions: &[u64]) {
    for pair in revisions.windows(2) {
        assert!(pair[0] < pair[1], "revisions went {} -> {}", pair[0], pair[1]);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_writers_settle_to_consistent_values() {
    let (scope, reporter) = scope_with_reporter();
    let a = Behavior::new(0_i64);
    let b = Behavior::new(0_i64);

    let sum = apply2(&scope, &a, &b, |a, b| a + b);
    let diff = apply2(&scope, &a, &b, |a, b| a - b);
    let label = map(&scope, &sum, |s| s % 7);

    let sum_revisions = tokio::spawn(collect_revisions(sum.changes(), Duration::from_millis(300)));
    let diff_revisions =
        tokio::spawn(collect_revisions(diff.changes(), Duration::from_millis(300)));

    let writers = spawn_writers(&a, &b);
    tokio::task::spawn_blocking(move || join_writers(writers))
        .await
        .unwrap();

    assert_eq!(b.sample(), WRITERS * WRITES_PER_THREAD);

    eventually("sum to settle", || sum.value() == a.sample() + b.sample()).await;
    eventually("diff to settle", || diff.value() == a.sample() - b.sample()).await;
    eventually("label to settle", || label.value() == sum.value() % 7).await;

    assert_strictly_increasing(&sum_revisions.await.unwrap());
    assert_strictly_increasing(&diff_revisions.await.unwrap());
    assert!(reporter.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_evaluations_of_one_value_never_overlap() {
    let (scope, _) = scope_with_reporter();
    let a = Behavior::new(0_i64);
    let b = Behavior::new(0_i64);
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));

    let sum = derived(&scope, {
        let (a, b) = (a.clone(), b.clone());
        let (in_flight, max_in_flight) = (in_flight.clone(), max_in_flight.clone());
        move |r| {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_in_flight.fetch_max(now, Ordering::SeqCst);
            let value = r.get(&a) + r.get(&b);
            thread::sleep(Duration::from_micros(200));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            value
        }
    });

    let writers = spawn_writers(&a, &b);
    tokio::task::spawn_blocking(move || join_writers(writers))
        .await
        .unwrap();

    eventually("sum to settle", || sum.value() == a.sample() + b.sample()).await;
    assert!(sum.evaluation_count() > 1);
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_values_evaluate_in_parallel() {
    let (scope, _) = scope_with_reporter();
    let src = Behavior::new(0_i64);
    let entered = Arc::new(AtomicUsize::new(0));
    let overlapped = Arc::new(AtomicBool::new(false));

    // On a change, each observer waits for the other to enter as well
    let rendezvous = |src: &Behavior<i64>| {
        let src = src.clone();
        let (entered, overlapped) = (entered.clone(), overlapped.clone());
        move |r: &Resolver| {
            let value = r.get(&src);
            if value != 0 {
                entered.fetch_add(1, Ordering::SeqCst);
                let deadline = std::time::Instant::now() + Duration::from_secs(2);
                while std::time::Instant::now() < deadline {
                    if entered.load(Ordering::SeqCst) >= 2 {
                        overlapped.store(true, Ordering::SeqCst);
                        break;
                    }
                    thread::yield_now();
                }
            }
            value
        }
    };

    let x = derived(&scope, rendezvous(&src));
    let y = derived(&scope, rendezvous(&src));

    src.set(1);
    eventually("both values to update", || x.value() == 1 && y.value() == 1).await;
    assert!(overlapped.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_subscribers_see_revisions_in_order() {
    let (scope, _) = scope_with_reporter();
    let a = Behavior::new(0_i64);
    let b = Behavior::new(0_i64);
    let product = apply2(&scope, &a, &b, |a, b| a.wrapping_mul(b));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let _sub = product.subscribe({
        let seen = seen.clone();
        move |v| seen.lock().unwrap().push(v.revision)
    });

    let writers = spawn_writers(&a, &b);
    tokio::task::spawn_blocking(move || join_writers(writers))
        .await
        .unwrap();

    eventually("product to settle", || {
        product.value() == a.sample().wrapping_mul(b.sample())
    })
    .await;

    let seen = seen.lock().unwrap().clone();
    assert!(!seen.is_empty());
    assert_strictly_increasing(&seen);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_during_evaluation_keeps_value_frozen() {
    let (scope, _) = scope_with_reporter();
    let src = Behavior::new(5_i64);
    let started = Arc::new(AtomicBool::new(false));

    let x = derived(&scope, {
        let src = src.clone();
        let started = started.clone();
        move |r| {
            let value = r.get(&src);
            if value == 7 {
                started.store(true, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(300));
            }
            value * 2
        }
    });
    let rx = x.changes();

    src.set(7);
    eventually("slow evaluation to start", || started.load(Ordering::SeqCst)).await;

    scope.cancel();
    assert_eq!(x.state(), DerivedState::Frozen);
    assert_eq!(x.snapshot(), Versioned { value: 10, revision: 0 });

    // Wait for the in-flight evaluation to finish
    scope.shutdown().await;

    assert_eq!(x.evaluation_count(), 2);
    assert_eq!(x.snapshot(), Versioned { value: 10, revision: 0 });
    assert!(!rx.has_changed().unwrap());
    assert_eq!(src.listener_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dispose_during_effect_stops_further_runs() {
    let (scope, _) = scope_with_reporter();
    let src = Behavior::new(0_i64);
    let started = Arc::new(AtomicBool::new(false));
    let runs = Arc::new(AtomicUsize::new(0));

    let effect = auto_run(&scope, {
        let src = src.clone();
        let (started, runs) = (started.clone(), runs.clone());
        move |r| {
            if r.get(&src) == 1 {
                started.store(true, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(200));
            }
            runs.fetch_add(1, Ordering::SeqCst);
        }
    });

    src.set(1);
    eventually("effect to start", || started.load(Ordering::SeqCst)).await;
    effect.dispose();
    assert!(!effect.is_active());

    eventually("effect to finish its run", || runs.load(Ordering::SeqCst) == 2).await;
    eventually("effect to unsubscribe", || src.listener_count() == 0).await;

    src.set(2);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert!(scope.is_active());
}

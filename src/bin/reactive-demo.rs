// Copyright (c) 2025 - Cowboy AI, Inc.
//! Reactive Demo
//!
//! Walks through the lifecycle of a scope-bound derived value:
//! - Source → derived value → auto_run effect
//! - Update the source and watch the value follow
//! - Cancel the scope and watch the value freeze
//!
//! Run with: cargo run --bin reactive-demo
//!
//! Environment:
//! - REACTIVE_SCOPE_NAME: scope name shown in logs (default: cim-scope)
//! - REACTIVE_COALESCE: immediate | yield | delay:<ms> (default: yield)
//! - RUST_LOG: tracing filter (default: info)

use anyhow::{Context, Result};
use cim_reactive::prelude::*;
use cim_reactive::TracingReporter;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("🚀 Starting reactive demo");

    let config = ReactiveConfig::from_env().context("Failed to load configuration")?;
    info!("📋 Configuration loaded:");
    info!("  - Scope: {}", config.name);
    info!("  - Coalesce: {:?}", config.coalesce);

    let scope = ObservationScope::builder()
        .config(config)
        .reporter(Arc::new(TracingReporter))
        .build()
        .context("Failed to create scope")?;

    let src = Behavior::new(5);
    let x = derived(&scope, {
        let src = src.clone();
        move |r| r.get(&src) * 2
    });
    info!("🔢 src = {}, x = {} (revision {})", src.sample(), x.value(), x.revision());

    let _printer = auto_run(&scope, {
        let x = x.clone();
        move |r| info!("👀 x observed: {}", r.get(&x))
    });

    src.set(7);
    let now = x.wait_for_revision(1).await;
    info!("🔄 src = 7, x = {} (revision {})", now.value, now.revision);

    // Three writes before the observation runs collapse into one evaluation
    let before = x.evaluation_count();
    src.set(8);
    src.set(9);
    src.set(10);
    let now = x.wait_for_revision(2).await;
    info!(
        "📦 burst of 3 writes → {} evaluation(s), x = {}",
        x.evaluation_count() - before,
        now.value
    );

    info!("🛑 Cancelling scope");
    scope.shutdown().await;

    src.set(100);
    tokio::task::yield_now().await;
    info!(
        "🧊 src = {}, x = {} (state {:?}, revision {})",
        src.sample(),
        x.value(),
        x.state(),
        x.revision()
    );

    info!("✅ Demo complete");
    Ok(())
}

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Configuration for observation scopes
//!
//! The one real tuning point of the engine is how change notifications are
//! coalesced before a derived value re-evaluates. Everything else is naming
//! for logs.
//!
//! ```rust,ignore
//! use cim_reactive::config::{CoalesceStrategy, ReactiveConfig};
//!
//! let config = ReactiveConfig::default()
//!     .with_name("inventory-model")
//!     .with_coalesce(CoalesceStrategy::Delay { millis: 16 });
//! ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{ReactiveError, ReactiveResult};

/// Environment variable holding the scope name
pub const ENV_SCOPE_NAME: &str = "REACTIVE_SCOPE_NAME";

/// Environment variable holding the coalesce strategy
pub const ENV_COALESCE: &str = "REACTIVE_COALESCE";

/// How pending re-evaluations are coalesced
///
/// Notifications that arrive while a re-evaluation is already pending are
/// always merged. The strategy decides how long the observation task waits
/// after the first notification before it evaluates, which controls how large
/// a burst can collapse into one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum CoalesceStrategy {
    /// Evaluate as soon as the observation task is polled
    Immediate,
    /// Yield to the scheduler once before evaluating
    #[default]
    YieldNow,
    /// Wait a fixed window before evaluating
    Delay {
        /// Window length in milliseconds
        millis: u64,
    },
}

impl CoalesceStrategy {
    /// Delay window, if any
    pub fn window(&self) -> Option<Duration> {
        match self {
            CoalesceStrategy::Delay { millis } => Some(Duration::from_millis(*millis)),
            _ => None,
        }
    }

    /// Wait according to the strategy
    pub(crate) async fn settle(&self) {
        match self {
            CoalesceStrategy::Immediate => {}
            CoalesceStrategy::YieldNow => tokio::task::yield_now().await,
            CoalesceStrategy::Delay { millis } => {
                tokio::time::sleep(Duration::from_millis(*millis)).await
            }
        }
    }
}

impl FromStr for CoalesceStrategy {
    type Err = ReactiveError;

    /// Parse `immediate`, `yield` or `delay:<millis>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "immediate" => return Ok(CoalesceStrategy::Immediate),
            "yield" | "yield_now" => return Ok(CoalesceStrategy::YieldNow),
            _ => {}
        }

        let millis = s
            .strip_prefix("delay:")
            .ok_or_else(|| ReactiveError::Configuration(format!("unknown coalesce strategy '{s}'")))?;

        millis
            .trim()
            .parse::<u64>()
            .map(|millis| CoalesceStrategy::Delay { millis })
            .map_err(|e| ReactiveError::Configuration(format!("invalid delay '{millis}': {e}")))
    }
}

/// Configuration for an observation scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactiveConfig {
    /// Scope name used in log output
    pub name: String,
    /// Coalescing applied by every observation launched on the scope
    pub coalesce: CoalesceStrategy,
}

impl Default for ReactiveConfig {
    fn default() -> Self {
        Self {
            name: "cim-scope".to_string(),
            coalesce: CoalesceStrategy::default(),
        }
    }
}

impl ReactiveConfig {
    /// Set the scope name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the coalesce strategy
    pub fn with_coalesce(mut self, coalesce: CoalesceStrategy) -> Self {
        self.coalesce = coalesce;
        self
    }

    /// Load configuration from environment variables
    ///
    /// Unset variables keep their defaults; a malformed strategy is an error.
    pub fn from_env() -> ReactiveResult<Self> {
        let mut config = Self::default();

        if let Ok(name) = std::env::var(ENV_SCOPE_NAME) {
            config.name = name;
        }

        if let Ok(coalesce) = std::env::var(ENV_COALESCE) {
            config.coalesce = coalesce.parse()?;
        }

        Ok(config)
    }

    /// Parse configuration from JSON
    pub fn from_json(json: &str) -> ReactiveResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

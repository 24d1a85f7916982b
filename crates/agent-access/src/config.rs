//! Engine configuration and environment resolution.

use crate::error::{AccessError, AccessResult};
use std::time::Duration;

const DEFAULT_HARD_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_SETTLE_CEILING_MS: u64 = 5_000;
const DEFAULT_PASS_THRESHOLD: u8 = 70;
const DEFAULT_CONCURRENCY: usize = 4;

/// Tunables shared by every pipeline an engine runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Hard deadline for all navigation a single pipeline performs.
    pub hard_timeout: Duration,
    /// System ceiling on a profile's post-load settle wait.
    pub settle_ceiling: Duration,
    /// Overall score at or above which a report passes.
    pub pass_threshold: u8,
    /// Default number of pipelines a batch runs at once.
    pub concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hard_timeout: Duration::from_millis(DEFAULT_HARD_TIMEOUT_MS),
            settle_ceiling: Duration::from_millis(DEFAULT_SETTLE_CEILING_MS),
            pass_threshold: DEFAULT_PASS_THRESHOLD,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `AGENT_ACCESS_*` environment variables.
    ///
    /// Unparseable values fall back to the default silently.
    pub fn from_env() -> Self {
        Self {
            hard_timeout: Duration::from_millis(read_env_u64(
                "AGENT_ACCESS_TIMEOUT_MS",
                DEFAULT_HARD_TIMEOUT_MS,
            )),
            settle_ceiling: Duration::from_millis(read_env_u64(
                "AGENT_ACCESS_SETTLE_CEILING_MS",
                DEFAULT_SETTLE_CEILING_MS,
            )),
            pass_threshold: read_env_u8("AGENT_ACCESS_PASS_THRESHOLD", DEFAULT_PASS_THRESHOLD),
            concurrency: read_env_usize("AGENT_ACCESS_CONCURRENCY", DEFAULT_CONCURRENCY),
        }
    }

    /// Reject configurations the engine cannot honor.
    pub fn validate(&self) -> AccessResult<()> {
        if self.hard_timeout <= self.settle_ceiling {
            return Err(AccessError::InvalidConfig(format!(
                "hard timeout ({}ms) must exceed the settle ceiling ({}ms)",
                self.hard_timeout.as_millis(),
                self.settle_ceiling.as_millis()
            )));
        }
        if self.pass_threshold > 100 {
            return Err(AccessError::InvalidConfig(format!(
                "pass threshold {} is above 100",
                self.pass_threshold
            )));
        }
        if self.concurrency == 0 {
            return Err(AccessError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_hard_timeout(mut self, timeout: Duration) -> Self {
        self.hard_timeout = timeout;
        self
    }

    pub fn with_settle_ceiling(mut self, ceiling: Duration) -> Self {
        self.settle_ceiling = ceiling;
        self
    }

    pub fn with_pass_threshold(mut self, threshold: u8) -> Self {
        self.pass_threshold = threshold;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

fn read_env_u64(name: &str, default_value: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default_value)
}

fn read_env_u8(name: &str, default_value: u8) -> u8 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .unwrap_or(default_value)
}

fn read_env_usize(name: &str, default_value: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default_value)
}

//! Configuration types for the trust engine.
//!
//! Every numeric default is illustrative. The values are exposed so they
//! can be tuned per deployment and loaded from JSON.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use vigil_council::{DialogueConfig, FailurePolicy, RetryPolicy};
use vigil_monitor::{MemoryConfig, TrustThresholds};

use crate::error::EngineError;
use crate::Result;

/// Configuration for [`TrustEngine`](crate::TrustEngine).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Breach thresholds and recovery parameters.
    pub thresholds: TrustThresholds,

    /// Session memory parameters.
    pub memory: MemoryConfig,

    /// Multi-round dialogue settings.
    pub dialogue: DialogueConfig,

    /// Single-round parallel fan-out settings.
    pub parallel: ParallelConfig,

    /// Assessor call boundary settings.
    pub retry: RetryConfig,
}

impl EngineConfig {
    /// Parses a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every section.
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        self.memory.validate()?;
        self.dialogue
            .validate()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        self.parallel.validate()?;
        self.retry.validate()
    }
}

/// Parallel fan-out configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Failure policy for the fan-out.
    pub policy: FailurePolicy,
    /// Minimum assessments required under the resilient policy.
    pub min_viable: usize,
}

impl ParallelConfig {
    fn validate(&self) -> Result<()> {
        if self.min_viable == 0 {
            return Err(EngineError::Config(
                "parallel.min_viable must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::Resilient,
            min_viable: 1,
        }
    }
}

/// Assessor call boundary configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per call, including the first.
    pub max_attempts: u32,

    /// Delay before each retry, in milliseconds. The last entry repeats.
    pub backoff_ms: Vec<u64>,

    /// Per-attempt timeout in milliseconds.
    pub call_timeout_ms: u64,
}

impl RetryConfig {
    /// Builds the retry policy injected into each assessment client.
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_attempts(self.max_attempts)
            .with_backoff(self.backoff_ms.iter().copied().map(Duration::from_millis).collect())
    }

    /// Per-attempt timeout.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(EngineError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.call_timeout_ms == 0 {
            return Err(EngineError::Config(
                "retry.call_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: vec![100, 200, 400],
            call_timeout_ms: 30_000,
        }
    }
}

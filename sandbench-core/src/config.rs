//! Run and security configuration

use crate::error::BenchError;
use sandbench_guard::DEFAULT_MAX_CODE_SIZE;
use sandbench_ipc::{Isolation, WorkerSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Sampling parameters. Immutable once handed to a `Benchmarker`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Unmeasured runs before sampling
    pub warmup_iterations: usize,
    /// Floor on measured samples before the time budget can stop the run
    pub min_samples: usize,
    /// Hard ceiling on measured samples
    pub max_samples: usize,
    /// Wall time after which sampling stops once `min_samples` is reached
    #[serde(rename = "max_time_budget_ms", with = "sandbench_stats::serde_millis")]
    pub max_time_budget: Duration,
    /// Yield to the scheduler between samples
    pub yield_between_samples: bool,
    /// Maximum snippet size in bytes
    pub max_code_size: usize,
    /// Per-sample timeout
    #[serde(rename = "execution_timeout_ms", with = "sandbench_stats::serde_millis")]
    pub execution_timeout: Duration,
    /// Evaluate in a fresh isolated context instead of directly
    pub use_isolated_context: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            warmup_iterations: 10,
            min_samples: 10,
            max_samples: 100,
            max_time_budget: Duration::from_secs(5),
            yield_between_samples: true,
            max_code_size: DEFAULT_MAX_CODE_SIZE,
            execution_timeout: Duration::from_secs(5),
            use_isolated_context: true,
        }
    }
}

impl BenchmarkConfig {
    /// Reject combinations the sampling loop cannot honor
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.max_samples == 0 {
            return Err(BenchError::InvalidConfig(
                "max_samples must be at least 1".to_string(),
            ));
        }
        if self.min_samples > self.max_samples {
            return Err(BenchError::InvalidConfig(format!(
                "min_samples ({}) exceeds max_samples ({})",
                self.min_samples, self.max_samples
            )));
        }
        if self.execution_timeout.is_zero() {
            return Err(BenchError::InvalidConfig(
                "execution_timeout must be non-zero".to_string(),
            ));
        }
        if self.max_code_size == 0 {
            return Err(BenchError::InvalidConfig(
                "max_code_size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-sample timeout after applying the security ceiling
    pub fn effective_timeout(&self, security: &SecurityConfig) -> Duration {
        self.execution_timeout.min(security.max_execution_time)
    }

    /// Isolation mode selected by `use_isolated_context`
    pub fn isolation(&self) -> Isolation {
        Isolation::from_flag(self.use_isolated_context)
    }
}

/// Globals stripped from isolated contexts by default
pub const DEFAULT_DISABLED_GLOBALS: &[&str] = &[
    "fetch",
    "XMLHttpRequest",
    "WebSocket",
    "EventSource",
    "Worker",
    "SharedWorker",
    "importScripts",
    "localStorage",
    "sessionStorage",
    "indexedDB",
    "setTimeout",
    "setInterval",
    "setImmediate",
    "requestAnimationFrame",
    "alert",
    "confirm",
    "prompt",
    "require",
    "process",
    "Buffer",
];

/// Restrictions applied to the isolated context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Policy string; `'unsafe-eval'` enables string code generation
    pub content_security_policy: String,
    /// Globals forced to `undefined`
    pub disabled_globals: BTreeSet<String>,
    /// Strip network primitives
    pub disable_network: bool,
    /// Ceiling on the per-sample timeout
    #[serde(rename = "max_execution_time_ms", with = "sandbench_stats::serde_millis")]
    pub max_execution_time: Duration,
    /// Advisory heap limit in MiB (0 = interpreter default)
    pub max_memory_mb: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            content_security_policy: "default-src 'none'; script-src 'self'".to_string(),
            disabled_globals: DEFAULT_DISABLED_GLOBALS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            disable_network: true,
            max_execution_time: Duration::from_secs(5),
            max_memory_mb: 128,
        }
    }
}

impl SecurityConfig {
    /// Settings handed to a worker process
    pub fn worker_settings(&self, isolation: Isolation) -> WorkerSettings {
        WorkerSettings {
            isolation,
            content_security_policy: self.content_security_policy.clone(),
            disabled_globals: self.disabled_globals.iter().cloned().collect(),
            disable_network: self.disable_network,
            max_memory_mb: self.max_memory_mb,
        }
    }
}

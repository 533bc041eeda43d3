//! Configuration loading from sandbench.toml
//!
//! Sandbench configuration can be kept in a `sandbench.toml` file. It is
//! discovered by walking up from the current directory; command-line flags
//! override whatever the file sets.

use anyhow::Context;
use sandbench_core::{BenchmarkConfig, SecurityConfig};
use sandbench_guard::{DEFAULT_MAX_CODE_SIZE, PatternCatalog};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name searched for by `discover`
pub const CONFIG_FILE_NAME: &str = "sandbench.toml";

/// Sandbench configuration file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SandbenchConfig {
    /// Sampling configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Isolated context restrictions
    #[serde(default)]
    pub security: SecuritySection,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Which pattern catalog screens snippets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogChoice {
    /// Loops, recursion and dynamic evaluation only
    Standard,
    /// Standard plus environment, network and storage access
    #[default]
    Extended,
}

impl CatalogChoice {
    /// Build the selected catalog
    pub fn build(self) -> PatternCatalog {
        match self {
            CatalogChoice::Standard => PatternCatalog::standard(),
            CatalogChoice::Extended => PatternCatalog::extended(),
        }
    }
}

impl std::str::FromStr for CatalogChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(CatalogChoice::Standard),
            "extended" => Ok(CatalogChoice::Extended),
            other => Err(format!("Unknown catalog: {}", other)),
        }
    }
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Unmeasured iterations before sampling
    #[serde(default = "default_warmup_iterations")]
    pub warmup_iterations: usize,
    /// Minimum measured samples
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    /// Maximum measured samples
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
    /// Sampling time budget (e.g., "5s")
    #[serde(default = "default_time_budget")]
    pub time_budget: String,
    /// Per-sample timeout (e.g., "500ms")
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// Run snippets in isolated contexts
    #[serde(default = "default_isolated")]
    pub isolated: bool,
    /// Interpreter binary for worker processes
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Pattern catalog: "standard" or "extended"
    #[serde(default)]
    pub catalog: CatalogChoice,
    /// Maximum snippet size in bytes
    #[serde(default = "default_max_code_size")]
    pub max_code_size: usize,
    /// Yield between samples
    #[serde(default = "default_yield")]
    pub yield_between_samples: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            warmup_iterations: default_warmup_iterations(),
            min_samples: default_min_samples(),
            max_samples: default_max_samples(),
            time_budget: default_time_budget(),
            timeout: default_timeout(),
            isolated: default_isolated(),
            interpreter: default_interpreter(),
            catalog: CatalogChoice::default(),
            max_code_size: default_max_code_size(),
            yield_between_samples: default_yield(),
        }
    }
}

fn default_warmup_iterations() -> usize {
    10
}
fn default_min_samples() -> usize {
    10
}
fn default_max_samples() -> usize {
    100
}
fn default_time_budget() -> String {
    "5s".to_string()
}
fn default_timeout() -> String {
    "5s".to_string()
}
fn default_isolated() -> bool {
    true
}
fn default_interpreter() -> String {
    "node".to_string()
}
fn default_max_code_size() -> usize {
    DEFAULT_MAX_CODE_SIZE
}
fn default_yield() -> bool {
    true
}

/// `[security]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuritySection {
    /// Content security policy; `'unsafe-eval'` re-enables string evaluation
    #[serde(default = "default_csp")]
    pub content_security_policy: String,
    /// Globals removed from isolated contexts (None = built-in list)
    #[serde(default)]
    pub disabled_globals: Option<Vec<String>>,
    /// Strip network primitives
    #[serde(default = "default_disable_network")]
    pub disable_network: bool,
    /// Ceiling on the per-sample timeout
    #[serde(default = "default_max_execution_time")]
    pub max_execution_time: String,
    /// Worker heap limit in MiB
    #[serde(default = "default_max_memory_mb")]
    pub max_memory_mb: u64,
}

impl Default for SecuritySection {
    fn default() -> Self {
        Self {
            content_security_policy: default_csp(),
            disabled_globals: None,
            disable_network: default_disable_network(),
            max_execution_time: default_max_execution_time(),
            max_memory_mb: default_max_memory_mb(),
        }
    }
}

fn default_csp() -> String {
    SecurityConfig::default().content_security_policy
}
fn default_disable_network() -> bool {
    true
}
fn default_max_execution_time() -> String {
    "5s".to_string()
}
fn default_max_memory_mb() -> u64 {
    128
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human" or "json"
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}

impl SandbenchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("invalid {}", path.display()))?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let dir = std::env::current_dir().ok()?;
        Self::discover_from(dir)
    }

    /// Walk up from `dir` looking for `sandbench.toml`
    pub fn discover_from(dir: impl Into<PathBuf>) -> Option<Self> {
        let mut dir = dir.into();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => Some(config),
                    Err(e) => {
                        tracing::warn!(path = %config_path.display(), "ignoring config: {:#}", e);
                        None
                    }
                };
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Sampling configuration from the `[runner]` section
    pub fn benchmark_config(&self) -> anyhow::Result<BenchmarkConfig> {
        Ok(BenchmarkConfig {
            warmup_iterations: self.runner.warmup_iterations,
            min_samples: self.runner.min_samples,
            max_samples: self.runner.max_samples,
            max_time_budget: Self::parse_duration(&self.runner.time_budget)?,
            yield_between_samples: self.runner.yield_between_samples,
            max_code_size: self.runner.max_code_size,
            execution_timeout: Self::parse_duration(&self.runner.timeout)?,
            use_isolated_context: self.runner.isolated,
        })
    }

    /// Security configuration from the `[security]` section
    pub fn security_config(&self) -> anyhow::Result<SecurityConfig> {
        let mut security = SecurityConfig {
            content_security_policy: self.security.content_security_policy.clone(),
            disable_network: self.security.disable_network,
            max_execution_time: Self::parse_duration(&self.security.max_execution_time)?,
            max_memory_mb: self.security.max_memory_mb,
            ..SecurityConfig::default()
        };
        if let Some(globals) = &self.security.disabled_globals {
            security.disabled_globals = globals.iter().cloned().collect();
        }
        Ok(security)
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# Sandbench Configuration

[runner]
# Unmeasured iterations before sampling
warmup_iterations = 10
# Sampling stops at max_samples, or at the time budget once min_samples is reached
min_samples = 10
max_samples = 100
time_budget = "5s"
# Per-sample timeout
timeout = "5s"
# Run snippets in a fresh isolated context (false = direct evaluation)
isolated = true
# Interpreter for worker processes
interpreter = "node"
# Pattern catalog: "standard" or "extended"
catalog = "extended"
# Maximum snippet size in bytes
max_code_size = 102400
# Yield to the scheduler between samples
yield_between_samples = true

[security]
# 'unsafe-eval' re-enables eval and the Function constructor inside the context
content_security_policy = "default-src 'none'; script-src 'self'"
# Globals removed from isolated contexts (uncomment to replace the built-in list)
# disabled_globals = ["fetch", "XMLHttpRequest", "WebSocket", "setTimeout"]
disable_network = true
# Ceiling on the per-sample timeout
max_execution_time = "5s"
# Worker heap limit in MiB (0 = interpreter default)
max_memory_mb = 128

[output]
# Default output format: human or json
format = "human"
"#
        .to_string()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m")
    pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow::anyhow!("Invalid duration: {}", s));
        }

        let multiplier: u64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" | "" => 1_000_000_000,
            "m" | "min" => 60_000_000_000,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Ok(Duration::from_nanos((value * multiplier as f64) as u64))
    }
}

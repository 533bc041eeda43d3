#![warn(missing_docs)]
//! # Sandbench
//!
//! Screen untrusted JavaScript snippets for dangerous constructs, then
//! measure the ones that pass inside a restricted execution context.
//!
//! - **Static gate**: a catalog of case-insensitive, whitespace-tolerant
//!   detectors (unbounded loops, dynamic evaluation, timers, network,
//!   storage, environment escapes) with line/column reporting
//! - **Isolated execution**: each run gets a fresh interpreter worker with a
//!   reduced global surface and a per-sample timeout
//! - **Sampling engine**: warmup, adaptive sample count bounded by a time
//!   budget, cooperative abort
//! - **Comparison**: two snippets measured concurrently, relative difference
//!   with a variability-based confidence score
//!
//! ## Quick Start
//!
//! ```ignore
//! use sandbench::{BenchmarkConfig, benchmark};
//!
//! let run = benchmark("[3, 1, 2].sort()", BenchmarkConfig::default())?;
//! println!("{:.3} ms", run.stats.mean_ms());
//! ```
//!
//! ## Custom contexts
//!
//! ```ignore
//! use sandbench::{Benchmarker, BenchmarkConfig, InlineProvider, SecurityConfig};
//! use std::sync::Arc;
//!
//! let provider = Arc::new(InlineProvider::new(|_source| Ok(())));
//! let config = BenchmarkConfig { use_isolated_context: false, ..Default::default() };
//! let bench = Benchmarker::with_provider(config, SecurityConfig::default(), provider)?;
//! let comparison = bench.compare("a()", "b()")?;
//! println!("{}", comparison.summary);
//! ```

use std::sync::Arc;

// Re-export the engine
pub use sandbench_core::{
    AbortHandle, BenchError, BenchmarkConfig, BenchmarkRun, Benchmarker, CancellationToken,
    Comparison, ContextGuard, ContextProvider, ContextReply, EngineError, ExecutionOutcome,
    FailureKind, InlineProvider, IsolatedContext, Isolation, Observer, PreparedSnippet, RunEvent,
    RunEventKind, RunPhase, RunRole, SandboxedExecutor, SecurityConfig, Submission,
};

#[cfg(unix)]
pub use sandbench_core::ProcessProvider;

// Re-export validation
pub use sandbench_guard::{
    CodeRejection, CodeValidator, DEFAULT_MAX_CODE_SIZE, DangerousPattern, Detector, InputError,
    Location, PatternCatalog, SecurityErrorKind, ValidationError,
};

// Re-export stats
pub use sandbench_stats::{
    Confidence, RelativeComparison, Sample, Stats, compare_stats, compute_stats,
};

// Re-export reporting
pub use sandbench_report::{OutputFormat, Report, format_human_output, generate_json_report};

/// Run the Sandbench CLI.
///
/// ```ignore
/// fn main() {
///     let outcome = sandbench::run().unwrap();
///     std::process::exit(outcome.exit_code());
/// }
/// ```
pub use sandbench_cli::run;

/// Screen `code` with the extended catalog
pub fn validate_code(code: &str, max_size: usize) -> Result<(), CodeRejection> {
    CodeValidator::default().validate(code, max_size)
}

/// Measure `code` once in a worker process, with default security settings
#[cfg(unix)]
pub fn benchmark(code: &str, config: BenchmarkConfig) -> Result<BenchmarkRun, BenchError> {
    benchmark_with(Arc::new(ProcessProvider::new()), code, config)
}

/// Measure two snippets in worker processes and compare them
#[cfg(unix)]
pub fn compare(
    baseline: &str,
    candidate: &str,
    config: BenchmarkConfig,
) -> Result<Comparison, BenchError> {
    compare_with(Arc::new(ProcessProvider::new()), baseline, candidate, config)
}

/// `benchmark` over an arbitrary context provider
pub fn benchmark_with(
    provider: Arc<dyn ContextProvider>,
    code: &str,
    config: BenchmarkConfig,
) -> Result<BenchmarkRun, BenchError> {
    let bench = Benchmarker::with_provider(config, SecurityConfig::default(), provider)?;
    let run = bench.benchmark(code);
    bench.dispose();
    run
}

/// `compare` over an arbitrary context provider
pub fn compare_with(
    provider: Arc<dyn ContextProvider>,
    baseline: &str,
    candidate: &str,
    config: BenchmarkConfig,
) -> Result<Comparison, BenchError> {
    let bench = Benchmarker::with_provider(config, SecurityConfig::default(), provider)?;
    let comparison = bench.compare(baseline, candidate);
    bench.dispose();
    comparison
}

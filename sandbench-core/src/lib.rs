#![warn(missing_docs)]
//! Sandbench Core - Benchmark Engine
//!
//! This crate drives untrusted snippets through measured runs:
//! - `Benchmarker`: validation gate, warmup, sampling loop, comparison
//! - `SandboxedExecutor`: one correlated, time-bounded execution
//! - `ContextProvider` / `IsolatedContext`: the isolation seam
//! - `ProcessProvider`: interpreter worker process with a reduced global surface (unix)
//! - `InlineProvider`: direct evaluation through a Rust closure

mod cancel;
mod config;
mod context;
mod engine;
mod error;
mod executor;
mod inline;
#[cfg(unix)]
mod process;

pub use cancel::{AbortHandle, CancellationToken};
pub use config::{BenchmarkConfig, SecurityConfig};
pub use context::{ContextGuard, ContextProvider, ContextReply, IsolatedContext, Submission};
pub use engine::{
    BenchmarkRun, Benchmarker, Comparison, Observer, RunEvent, RunEventKind, RunPhase, RunRole,
};
pub use error::{BenchError, EngineError};
pub use executor::{ExecutionOutcome, PreparedSnippet, SandboxedExecutor};
pub use inline::{Evaluator, InlineProvider};
#[cfg(unix)]
pub use process::ProcessProvider;

pub use sandbench_ipc::{FailureKind, Isolation};

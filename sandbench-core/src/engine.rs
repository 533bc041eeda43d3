//! Benchmark Engine
//!
//! Per run: `Idle → Validating → Warmup → Sampling → Finalizing →
//! {Completed | Aborted | Failed}`. Samples within a run are strictly
//! sequential; `compare` runs its two snippets concurrently.

use crate::cancel::{AbortHandle, CancellationToken};
use crate::config::{BenchmarkConfig, SecurityConfig};
use crate::context::{ContextGuard, ContextProvider};
use crate::error::{BenchError, EngineError};
use crate::executor::{PreparedSnippet, SandboxedExecutor};
use sandbench_guard::{CodeValidator, PatternCatalog};
use sandbench_stats::{Confidence, Sample, Stats, compare_stats, compute_stats};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Lifecycle of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Not started
    Idle,
    /// Screening the snippet
    Validating,
    /// Unmeasured iterations
    Warmup,
    /// Measured iterations
    Sampling,
    /// Computing statistics
    Finalizing,
    /// Finished normally
    Completed,
    /// Stopped by `abort()` or `dispose()`
    Aborted,
    /// Rejected by validation
    Failed,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Validating => "validating",
            RunPhase::Warmup => "warmup",
            RunPhase::Sampling => "sampling",
            RunPhase::Finalizing => "finalizing",
            RunPhase::Completed => "completed",
            RunPhase::Aborted => "aborted",
            RunPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Which snippet an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunRole {
    /// `benchmark` call
    Single,
    /// First snippet of a `compare`
    Baseline,
    /// Second snippet of a `compare`
    Candidate,
}

/// What happened
#[derive(Debug, Clone, PartialEq)]
pub enum RunEventKind {
    /// Phase transition
    Phase(RunPhase),
    /// A warmup iteration finished
    Warmup {
        /// Iterations done
        completed: usize,
        /// Iterations planned
        total: usize,
    },
    /// A measured sample was recorded
    Sample {
        /// Zero-based index in the run
        index: usize,
        /// Sample ceiling
        max_samples: usize,
        /// Outcome
        success: bool,
        /// Measured time
        elapsed: Duration,
    },
}

/// Progress notification published to the observer
#[derive(Debug, Clone, PartialEq)]
pub struct RunEvent {
    /// Snippet the event belongs to
    pub role: RunRole,
    /// Event payload
    pub kind: RunEventKind,
}

/// Callback receiving run events, possibly from several threads
pub type Observer = Arc<dyn Fn(&RunEvent) + Send + Sync>;

/// Result of one `benchmark` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    /// Measured samples in execution order
    pub samples: Vec<Sample>,
    /// Statistics over `samples`
    pub stats: Stats,
    /// Configuration the run used
    pub config: BenchmarkConfig,
    /// Security settings the run used
    pub security: SecurityConfig,
    /// Wall time from validation to finalization
    #[serde(rename = "total_elapsed_ms", with = "sandbench_stats::serde_millis")]
    pub total_elapsed: Duration,
    /// Whether cancellation cut the run short
    pub aborted: bool,
}

/// Result of one `compare` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// First snippet's run
    pub baseline: BenchmarkRun,
    /// Second snippet's run
    pub candidate: BenchmarkRun,
    /// `(baseline_mean - candidate_mean) / baseline_mean`; positive means the candidate is faster
    pub relative_difference: f64,
    /// Reliability score in `[0, 1]`
    pub significance: f64,
    /// Bucketed significance
    pub confidence: Confidence,
    /// Human-readable verdict
    pub summary: String,
}

impl Comparison {
    /// Derive the comparison of two finished runs
    pub fn from_runs(baseline: BenchmarkRun, candidate: BenchmarkRun) -> Self {
        let relative = compare_stats(&baseline.stats, &candidate.stats);
        Self {
            baseline,
            candidate,
            relative_difference: relative.relative_difference,
            significance: relative.significance,
            confidence: relative.confidence,
            summary: relative.summary,
        }
    }

    /// Relative difference in percent
    pub fn percent_change(&self) -> f64 {
        self.relative_difference * 100.0
    }
}

/// How the measurement loops ended
enum LoopExit {
    Completed,
    Aborted,
    EngineFailure,
}

/// Validates, runs and measures snippets
pub struct Benchmarker {
    config: BenchmarkConfig,
    security: SecurityConfig,
    validator: CodeValidator,
    provider: Arc<dyn ContextProvider>,
    abort: AbortHandle,
    disposed: AtomicBool,
    observer: Option<Observer>,
}

impl std::fmt::Debug for Benchmarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Benchmarker")
            .field("config", &self.config)
            .field("security", &self.security)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

impl Benchmarker {
    /// Benchmarker running snippets in `node` worker processes
    #[cfg(unix)]
    pub fn new(config: BenchmarkConfig, security: SecurityConfig) -> Result<Self, BenchError> {
        Self::with_provider(
            config,
            security,
            Arc::new(crate::process::ProcessProvider::default()),
        )
    }

    /// Benchmarker over an arbitrary context provider
    pub fn with_provider(
        config: BenchmarkConfig,
        security: SecurityConfig,
        provider: Arc<dyn ContextProvider>,
    ) -> Result<Self, BenchError> {
        config.validate()?;
        if config.effective_timeout(&security).is_zero() {
            return Err(BenchError::InvalidConfig(
                "security max_execution_time must be non-zero".to_string(),
            ));
        }
        Ok(Self {
            config,
            security,
            validator: CodeValidator::default(),
            provider,
            abort: AbortHandle::new(),
            disposed: AtomicBool::new(false),
            observer: None,
        })
    }

    /// Validate against a different pattern catalog
    pub fn with_catalog(mut self, catalog: Arc<PatternCatalog>) -> Self {
        self.validator = CodeValidator::new(catalog);
        self
    }

    /// Receive progress events
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&RunEvent) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Run configuration
    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Security configuration
    pub fn security(&self) -> &SecurityConfig {
        &self.security
    }

    /// Validator used as the gate
    pub fn validator(&self) -> &CodeValidator {
        &self.validator
    }

    /// Handle that aborts this benchmarker's runs from anywhere
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Cancel every run currently in flight. Later runs are unaffected.
    pub fn abort(&self) {
        debug!("abort requested");
        self.abort.abort();
    }

    /// Cancel in-flight runs and refuse further work
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            debug!("benchmarker disposed");
            self.abort.abort();
        }
    }

    /// Whether `dispose` has been called
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Validate and measure one snippet
    pub fn benchmark(&self, code: &str) -> Result<BenchmarkRun, BenchError> {
        let token = self.arm()?;
        self.run(code, RunRole::Single, &token)
    }

    /// Measure two snippets concurrently and compare them
    pub fn compare(&self, baseline: &str, candidate: &str) -> Result<Comparison, BenchError> {
        let token = self.arm()?;
        let (baseline, candidate) = rayon::join(
            || self.run(baseline, RunRole::Baseline, &token),
            || self.run(candidate, RunRole::Candidate, &token),
        );
        Ok(Comparison::from_runs(baseline?, candidate?))
    }

    /// Token for a new run. Taken before the disposed check so a
    /// concurrent `dispose` either refuses the run or cancels the token.
    fn arm(&self) -> Result<CancellationToken, BenchError> {
        let token = self.abort.token();
        if self.is_disposed() {
            Err(BenchError::Disposed)
        } else {
            Ok(token)
        }
    }

    fn emit(&self, role: RunRole, kind: RunEventKind) {
        if let Some(observer) = &self.observer {
            (**observer)(&RunEvent { role, kind });
        }
    }

    fn enter(&self, role: RunRole, phase: RunPhase) {
        debug!(?role, %phase, "run phase");
        self.emit(role, RunEventKind::Phase(phase));
    }

    fn run(
        &self,
        code: &str,
        role: RunRole,
        token: &CancellationToken,
    ) -> Result<BenchmarkRun, BenchError> {
        let started = Instant::now();

        self.enter(role, RunPhase::Validating);
        if let Err(rejection) = self.validator.validate(code, self.config.max_code_size) {
            debug!(?role, code = rejection.code(), "snippet rejected");
            self.enter(role, RunPhase::Failed);
            return Err(rejection.into());
        }

        let snippet = PreparedSnippet::new(code);
        let mut samples = Vec::with_capacity(self.config.max_samples.min(1024));

        let exit = match ContextGuard::acquire(
            self.provider.as_ref(),
            &self.security,
            self.config.isolation(),
        ) {
            Ok(mut guard) => {
                let mut executor = SandboxedExecutor::new(guard.context_mut())
                    .with_csp(self.security.content_security_policy.clone());
                self.measure(&mut executor, &snippet, role, token, started, &mut samples)
            }
            Err(e) => {
                warn!(?role, error = %e, "failed to acquire isolated context");
                samples.push(Sample::failed(Duration::ZERO, e.to_string()));
                LoopExit::EngineFailure
            }
        };

        self.enter(role, RunPhase::Finalizing);
        let stats = compute_stats(&samples);
        let aborted = matches!(exit, LoopExit::Aborted);
        self.enter(
            role,
            if aborted {
                RunPhase::Aborted
            } else {
                RunPhase::Completed
            },
        );

        Ok(BenchmarkRun {
            samples,
            stats,
            config: self.config.clone(),
            security: self.security.clone(),
            total_elapsed: started.elapsed(),
            aborted,
        })
    }

    fn measure(
        &self,
        executor: &mut SandboxedExecutor<'_>,
        snippet: &PreparedSnippet,
        role: RunRole,
        token: &CancellationToken,
        started: Instant,
        samples: &mut Vec<Sample>,
    ) -> LoopExit {
        let timeout = self.config.effective_timeout(&self.security);

        self.enter(role, RunPhase::Warmup);
        let total = self.config.warmup_iterations;
        for completed in 1..=total {
            if token.is_cancelled() {
                return LoopExit::Aborted;
            }
            match executor.run_once(snippet, timeout, token) {
                Ok(_) => self.emit(role, RunEventKind::Warmup { completed, total }),
                Err(EngineError::Cancelled) => return LoopExit::Aborted,
                Err(e) => return self.engine_failure(role, e, samples),
            }
        }

        self.enter(role, RunPhase::Sampling);
        let max_samples = self.config.max_samples;
        while samples.len() < max_samples {
            if token.is_cancelled() {
                return LoopExit::Aborted;
            }

            let sample = match executor.run_once(snippet, timeout, token) {
                Ok(outcome) => outcome.into_sample(),
                Err(EngineError::Cancelled) => return LoopExit::Aborted,
                Err(e) => return self.engine_failure(role, e, samples),
            };
            self.emit(
                role,
                RunEventKind::Sample {
                    index: samples.len(),
                    max_samples,
                    success: sample.success,
                    elapsed: sample.elapsed,
                },
            );
            samples.push(sample);

            if samples.len() >= self.config.min_samples
                && started.elapsed() >= self.config.max_time_budget
            {
                debug!(?role, samples = samples.len(), "time budget reached");
                break;
            }

            if self.config.yield_between_samples {
                std::thread::yield_now();
            }
        }

        LoopExit::Completed
    }

    fn engine_failure(
        &self,
        role: RunRole,
        error: EngineError,
        samples: &mut Vec<Sample>,
    ) -> LoopExit {
        warn!(?role, code = error.code(), error = %error, "engine failure, ending run");
        samples.push(Sample::failed(Duration::ZERO, error.to_string()));
        LoopExit::EngineFailure
    }
}

impl Drop for Benchmarker {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextReply, IsolatedContext, Submission};
    use crate::inline::InlineProvider;
    use sandbench_guard::SecurityErrorKind;
    use sandbench_ipc::Isolation;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn direct_config() -> BenchmarkConfig {
        BenchmarkConfig {
            warmup_iterations: 2,
            min_samples: 3,
            max_samples: 5,
            max_time_budget: Duration::from_secs(5),
            use_isolated_context: false,
            ..Default::default()
        }
    }

    /// `sleep(N)` sleeps N ms, `throw` fails, anything else succeeds
    fn provider() -> Arc<InlineProvider> {
        Arc::new(InlineProvider::new(|source| {
            if let Some(ms) = source
                .strip_prefix("sleep(")
                .and_then(|rest| rest.strip_suffix(')'))
                .and_then(|n| n.parse::<u64>().ok())
            {
                std::thread::sleep(Duration::from_millis(ms));
                return Ok(());
            }
            if source == "throw" {
                return Err("thrown".to_string());
            }
            Ok(())
        }))
    }

    fn benchmarker(config: BenchmarkConfig) -> Benchmarker {
        Benchmarker::with_provider(config, SecurityConfig::default(), provider()).unwrap()
    }

    #[test]
    fn test_fast_code_hits_max_samples() {
        let run = benchmarker(direct_config()).benchmark("1 + 1").unwrap();
        assert_eq!(run.samples.len(), 5);
        assert!(!run.aborted);
        assert_eq!(run.stats.successful_samples, 5);
        assert_eq!(run.stats.total_samples(), run.samples.len());
    }

    #[test]
    fn test_budget_stops_after_min_samples() {
        let config = BenchmarkConfig {
            min_samples: 2,
            max_samples: 50,
            warmup_iterations: 0,
            max_time_budget: Duration::from_millis(1),
            ..direct_config()
        };
        let run = benchmarker(config).benchmark("sleep(2)").unwrap();
        assert_eq!(run.samples.len(), 2);
    }

    #[test]
    fn test_execution_failures_do_not_stop_run() {
        let run = benchmarker(direct_config()).benchmark("throw").unwrap();
        assert_eq!(run.samples.len(), 5);
        assert_eq!(run.stats.failed_samples, 5);
        assert_eq!(run.stats.successful_samples, 0);
        assert_eq!(run.stats.ops_per_second, 0.0);
        assert!(run.samples.iter().all(|s| s.error.as_deref() == Some("thrown")));
    }

    #[test]
    fn test_timeouts_are_failed_samples() {
        let config = BenchmarkConfig {
            warmup_iterations: 0,
            min_samples: 2,
            max_samples: 2,
            execution_timeout: Duration::from_millis(20),
            ..direct_config()
        };
        let run = benchmarker(config).benchmark("sleep(400)").unwrap();
        assert_eq!(run.samples.len(), 2);
        assert!(run.samples.iter().all(|s| !s.success));
        assert!(run.samples[0]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("timed out")));
    }

    #[test]
    fn test_rejection_produces_no_samples() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let bench = benchmarker(direct_config())
            .with_observer(move |event| sink.lock().unwrap().push(event.kind.clone()));

        let err = bench.benchmark("while (true) {}").unwrap_err();
        assert_eq!(err.code(), "INFINITE_WHILE_LOOP");
        let violation = err.rejection().and_then(|r| r.violation()).unwrap();
        assert_eq!(violation.kind, SecurityErrorKind::InfiniteWhileLoop);

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                RunEventKind::Phase(RunPhase::Validating),
                RunEventKind::Phase(RunPhase::Failed)
            ]
        );
    }

    #[test]
    fn test_oversized_code_rejected() {
        let config = BenchmarkConfig {
            max_code_size: 4,
            ..direct_config()
        };
        let err = benchmarker(config).benchmark("1 + 1 + 1").unwrap_err();
        assert_eq!(err.code(), "CODE_TOO_LARGE");
    }

    #[test]
    fn test_isolation_unavailable_is_single_failed_sample() {
        let config = BenchmarkConfig {
            use_isolated_context: true,
            ..direct_config()
        };
        let run = benchmarker(config).benchmark("1").unwrap();
        assert_eq!(run.samples.len(), 1);
        assert!(!run.samples[0].success);
        assert!(!run.aborted);
        assert_eq!(run.stats.failed_samples, 1);
    }

    #[test]
    fn test_phase_sequence() {
        let phases = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&phases);
        let bench = benchmarker(direct_config()).with_observer(move |event| {
            if let RunEventKind::Phase(phase) = event.kind {
                sink.lock().unwrap().push(phase);
            }
        });
        bench.benchmark("1").unwrap();
        assert_eq!(
            *phases.lock().unwrap(),
            vec![
                RunPhase::Validating,
                RunPhase::Warmup,
                RunPhase::Sampling,
                RunPhase::Finalizing,
                RunPhase::Completed
            ]
        );
    }

    #[test]
    fn test_abort_mid_run() {
        let config = BenchmarkConfig {
            warmup_iterations: 0,
            min_samples: 1000,
            max_samples: 1000,
            max_time_budget: Duration::from_secs(60),
            ..direct_config()
        };
        let bench = Arc::new(benchmarker(config));
        let remote = Arc::clone(&bench);
        let aborter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            remote.abort();
        });

        let run = bench.benchmark("sleep(5)").unwrap();
        aborter.join().unwrap();
        assert!(run.aborted);
        assert!(run.samples.len() < 1000);
        assert_eq!(run.stats.total_samples(), run.samples.len());

        // later runs are unaffected
        let quick = BenchmarkConfig {
            min_samples: 1,
            max_samples: 1,
            ..direct_config()
        };
        let bench = benchmarker(quick);
        bench.abort();
        assert!(!bench.benchmark("1").unwrap().aborted);
    }

    /// Succeeds until the `fail_at`-th submission, whose reply is a worker fault
    struct FaultingProvider {
        fail_at: usize,
    }

    struct FaultingContext {
        fail_at: usize,
        submitted: usize,
        pending: Option<u64>,
    }

    impl ContextProvider for FaultingProvider {
        fn acquire(
            &self,
            _security: &SecurityConfig,
            _isolation: Isolation,
        ) -> Result<Box<dyn IsolatedContext>, EngineError> {
            Ok(Box::new(FaultingContext {
                fail_at: self.fail_at,
                submitted: 0,
                pending: None,
            }))
        }
    }

    impl IsolatedContext for FaultingContext {
        fn submit(&mut self, submission: &Submission<'_>) -> Result<(), EngineError> {
            self.submitted += 1;
            self.pending = Some(submission.id);
            Ok(())
        }

        fn recv(&mut self, _wait: Duration) -> Result<Option<ContextReply>, EngineError> {
            let id = self.pending.take().unwrap_or_default();
            if self.submitted == self.fail_at {
                return Err(EngineError::WorkerFault("harness lost its sandbox".to_string()));
            }
            Ok(Some(ContextReply::succeeded(id, Duration::from_millis(1))))
        }

        fn interrupt(&mut self) {}

        fn close(self: Box<Self>) {}
    }

    #[test]
    fn test_worker_fault_mid_sampling_ends_run() {
        let phases = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&phases);
        // two warmups, two good samples, then the fault
        let bench = Benchmarker::with_provider(
            direct_config(),
            SecurityConfig::default(),
            Arc::new(FaultingProvider { fail_at: 5 }),
        )
        .unwrap()
        .with_observer(move |event| {
            if let RunEventKind::Phase(phase) = event.kind {
                sink.lock().unwrap().push(phase);
            }
        });

        let run = bench.benchmark("1").unwrap();
        assert_eq!(run.samples.len(), 3);
        assert!(run.samples[..2].iter().all(|s| s.success));
        let last = &run.samples[2];
        assert!(!last.success);
        assert!(last.error.as_deref().unwrap().contains("harness lost its sandbox"));
        assert!(!run.aborted);
        assert_eq!(run.stats.successful_samples, 2);
        assert_eq!(run.stats.failed_samples, 1);
        assert_eq!(phases.lock().unwrap().last(), Some(&RunPhase::Completed));
    }

    #[test]
    fn test_worker_fault_during_warmup_is_single_failed_sample() {
        let bench = Benchmarker::with_provider(
            direct_config(),
            SecurityConfig::default(),
            Arc::new(FaultingProvider { fail_at: 1 }),
        )
        .unwrap();
        let run = bench.benchmark("1").unwrap();
        assert_eq!(run.samples.len(), 1);
        assert!(!run.samples[0].success);
        assert!(!run.aborted);
    }

    #[test]
    fn test_abort_during_warmup() {
        let config = BenchmarkConfig {
            warmup_iterations: 1000,
            min_samples: 1,
            max_samples: 1,
            max_time_budget: Duration::from_secs(60),
            ..direct_config()
        };
        let phases = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&phases);
        let bench = Arc::new(benchmarker(config).with_observer(move |event| {
            if let RunEventKind::Phase(phase) = event.kind {
                sink.lock().unwrap().push(phase);
            }
        }));
        let remote = Arc::clone(&bench);
        let aborter = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            remote.abort();
        });

        let run = bench.benchmark("sleep(5)").unwrap();
        aborter.join().unwrap();
        assert!(run.aborted);
        assert!(run.samples.is_empty());
        assert_eq!(run.stats.total_samples(), 0);

        let phases = phases.lock().unwrap();
        assert!(!phases.contains(&RunPhase::Sampling));
        assert_eq!(phases.last(), Some(&RunPhase::Aborted));
    }

    #[test]
    fn test_token_armed_before_dispose_is_cancelled() {
        let bench = benchmarker(direct_config());
        let token = bench.arm().unwrap();
        bench.dispose();
        assert!(token.is_cancelled());
        assert!(matches!(bench.arm(), Err(BenchError::Disposed)));
    }

    #[test]
    fn test_dispose_aborts_in_flight_run() {
        let config = BenchmarkConfig {
            warmup_iterations: 0,
            min_samples: 1000,
            max_samples: 1000,
            max_time_budget: Duration::from_secs(60),
            ..direct_config()
        };
        let bench = Arc::new(benchmarker(config));
        let remote = Arc::clone(&bench);
        let disposer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            remote.dispose();
        });

        let run = bench.benchmark("sleep(5)").unwrap();
        disposer.join().unwrap();
        assert!(run.aborted);
        assert!(run.samples.len() < 1000);
        assert!(matches!(bench.benchmark("1"), Err(BenchError::Disposed)));
    }

    #[test]
    fn test_zero_security_timeout_rejected() {
        let security = SecurityConfig {
            max_execution_time: Duration::ZERO,
            ..SecurityConfig::default()
        };
        let result = Benchmarker::with_provider(direct_config(), security, provider());
        match result {
            Err(BenchError::InvalidConfig(message)) => {
                assert!(message.contains("max_execution_time"))
            }
            _ => panic!("zero security timeout accepted"),
        }
    }

    #[test]
    fn test_dispose_refuses_work() {
        let bench = benchmarker(direct_config());
        bench.dispose();
        assert!(bench.is_disposed());
        assert!(matches!(bench.benchmark("1"), Err(BenchError::Disposed)));
        assert!(matches!(bench.compare("1", "2"), Err(BenchError::Disposed)));
    }

    #[test]
    fn test_compare_cheap_vs_expensive() {
        let config = BenchmarkConfig {
            warmup_iterations: 1,
            min_samples: 5,
            max_samples: 5,
            ..direct_config()
        };
        let comparison = benchmarker(config).compare("sleep(10)", "sleep(1)").unwrap();
        assert!(comparison.relative_difference > 0.0);
        assert!(comparison.summary.contains("faster"));
        assert!((0.0..=1.0).contains(&comparison.significance));

        let config = BenchmarkConfig {
            warmup_iterations: 1,
            min_samples: 5,
            max_samples: 5,
            ..direct_config()
        };
        let comparison = benchmarker(config).compare("sleep(1)", "sleep(10)").unwrap();
        assert!(comparison.relative_difference < 0.0);
        assert!(comparison.summary.contains("slower"));
    }

    #[test]
    fn test_compare_propagates_rejection() {
        let err = benchmarker(direct_config())
            .compare("1", "eval('2')")
            .unwrap_err();
        assert_eq!(err.code(), "EVAL_USAGE");
    }

    #[test]
    fn test_compare_events_tagged_by_role() {
        let baseline = Arc::new(AtomicUsize::new(0));
        let candidate = Arc::new(AtomicUsize::new(0));
        let (b, c) = (Arc::clone(&baseline), Arc::clone(&candidate));
        let bench = benchmarker(direct_config()).with_observer(move |event| {
            if let RunEventKind::Sample { .. } = event.kind {
                match event.role {
                    RunRole::Baseline => b.fetch_add(1, Ordering::SeqCst),
                    RunRole::Candidate => c.fetch_add(1, Ordering::SeqCst),
                    RunRole::Single => 0,
                };
            }
        });
        bench.compare("1", "2").unwrap();
        assert_eq!(baseline.load(Ordering::SeqCst), 5);
        assert_eq!(candidate.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = BenchmarkConfig {
            min_samples: 10,
            max_samples: 1,
            ..Default::default()
        };
        let result = Benchmarker::with_provider(config, SecurityConfig::default(), provider());
        assert!(matches!(result, Err(BenchError::InvalidConfig(_))));
    }

    #[test]
    fn test_run_serializes_durations_as_millis() {
        let run = benchmarker(direct_config()).benchmark("1").unwrap();
        let json = serde_json::to_value(&run).unwrap();
        assert!(json["total_elapsed_ms"].is_f64());
        assert!(json["stats"]["mean_ms"].is_f64());
        assert_eq!(json["aborted"], false);
    }
}

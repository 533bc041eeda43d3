//! Report Data Structures

use chrono::{DateTime, Utc};
use sandbench_core::{BenchmarkConfig, BenchmarkRun, Comparison};
use sandbench_guard::CodeRejection;
use sandbench_stats::{Confidence, Stats};
use serde::{Deserialize, Serialize};

/// Report schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Complete benchmark report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Environment and configuration
    pub meta: ReportMeta,
    /// One entry per snippet
    pub runs: Vec<RunReport>,
    /// Present for `compare`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonReport>,
    /// Totals across runs
    pub summary: ReportSummary,
}

impl Report {
    /// Empty report
    pub fn new(meta: ReportMeta) -> Self {
        Self {
            meta,
            runs: Vec::new(),
            comparison: None,
            summary: ReportSummary::default(),
        }
    }

    /// Add a finished run
    pub fn push_run(&mut self, label: impl Into<String>, run: &BenchmarkRun) {
        self.runs.push(RunReport::from_run(label, run));
        self.refresh_summary();
    }

    /// Add a rejected snippet
    pub fn push_rejection(&mut self, label: impl Into<String>, rejection: &CodeRejection) {
        self.runs.push(RunReport {
            label: label.into(),
            status: RunStatus::Rejected,
            metrics: None,
            errors: Vec::new(),
            rejection: Some(RejectionInfo::from(rejection)),
            total_elapsed_ms: 0.0,
        });
        self.refresh_summary();
    }

    /// Add both runs of a comparison and its verdict
    pub fn push_comparison(&mut self, baseline: &str, candidate: &str, comparison: &Comparison) {
        self.runs
            .push(RunReport::from_run(baseline, &comparison.baseline));
        self.runs
            .push(RunReport::from_run(candidate, &comparison.candidate));
        self.comparison = Some(ComparisonReport {
            baseline: baseline.to_string(),
            candidate: candidate.to_string(),
            relative_difference: comparison.relative_difference,
            percent_change: comparison.percent_change(),
            significance: comparison.significance,
            confidence: comparison.confidence,
            summary: comparison.summary.clone(),
        });
        self.refresh_summary();
    }

    fn refresh_summary(&mut self) {
        let mut summary = ReportSummary {
            total_runs: self.runs.len(),
            ..Default::default()
        };
        for run in &self.runs {
            match run.status {
                RunStatus::Completed => summary.completed += 1,
                RunStatus::Aborted => summary.aborted += 1,
                RunStatus::Rejected => summary.rejected += 1,
            }
            if let Some(metrics) = &run.metrics {
                summary.failed_samples += metrics.failed;
            }
            summary.total_duration_ms += run.total_elapsed_ms;
        }
        self.summary = summary;
    }
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    /// Report schema version
    pub schema_version: u32,
    /// Tool version
    pub version: String,
    /// Generation time
    pub timestamp: DateTime<Utc>,
    /// Host information
    pub system: SystemInfo,
    /// Interpreter or evaluator used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    /// Effective sampling configuration
    pub config: ReportConfig,
}

impl ReportMeta {
    /// Metadata stamped with the current time
    pub fn new(version: impl Into<String>, system: SystemInfo, config: ReportConfig) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            version: version.into(),
            timestamp: Utc::now(),
            system,
            engine: None,
            config,
        }
    }
}

/// Execution configuration captured in report metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Unmeasured iterations
    pub warmup_iterations: usize,
    /// Sample floor
    pub min_samples: usize,
    /// Sample ceiling
    pub max_samples: usize,
    /// Time budget in milliseconds
    pub max_time_budget_ms: f64,
    /// Per-sample timeout in milliseconds
    pub execution_timeout_ms: f64,
    /// Whether snippets ran in isolated contexts
    pub isolated: bool,
}

impl From<&BenchmarkConfig> for ReportConfig {
    fn from(config: &BenchmarkConfig) -> Self {
        Self {
            warmup_iterations: config.warmup_iterations,
            min_samples: config.min_samples,
            max_samples: config.max_samples,
            max_time_budget_ms: config.max_time_budget.as_secs_f64() * 1000.0,
            execution_timeout_ms: config.execution_timeout.as_secs_f64() * 1000.0,
            isolated: config.use_isolated_context,
        }
    }
}

/// System information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Operating system
    pub os: String,
    /// CPU architecture
    pub arch: String,
    /// CPU model
    pub cpu: String,
    /// Logical cores
    pub cpu_cores: u32,
    /// Total memory
    pub memory_gb: f64,
}

/// Outcome of one snippet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Sampling finished
    Completed,
    /// Sampling was cancelled
    Aborted,
    /// Validation refused the snippet
    Rejected,
}

/// One snippet in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Snippet label (usually its file name)
    pub label: String,
    /// Outcome
    pub status: RunStatus,
    /// Timing metrics, absent for rejected snippets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<RunMetrics>,
    /// Distinct failure messages in order of first occurrence
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Validation failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<RejectionInfo>,
    /// Wall time of the run
    pub total_elapsed_ms: f64,
}

impl RunReport {
    /// Report entry for a finished run
    pub fn from_run(label: impl Into<String>, run: &BenchmarkRun) -> Self {
        let mut errors: Vec<String> = Vec::new();
        for message in run.samples.iter().filter_map(|s| s.error.as_ref()) {
            if !errors.contains(message) {
                errors.push(message.clone());
            }
        }
        Self {
            label: label.into(),
            status: if run.aborted {
                RunStatus::Aborted
            } else {
                RunStatus::Completed
            },
            metrics: Some(RunMetrics::from(&run.stats)),
            errors,
            rejection: None,
            total_elapsed_ms: run.total_elapsed.as_secs_f64() * 1000.0,
        }
    }
}

/// Timing metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Total samples
    pub samples: usize,
    /// Successful samples
    pub successful: usize,
    /// Failed samples
    pub failed: usize,
    /// Arithmetic mean
    pub mean_ms: f64,
    /// Median
    pub median_ms: f64,
    /// Population standard deviation
    pub std_dev_ms: f64,
    /// Fastest sample
    pub min_ms: f64,
    /// Slowest sample
    pub max_ms: f64,
    /// Throughput
    pub ops_per_second: f64,
    /// Relative spread
    pub coefficient_of_variation: f64,
}

impl From<&Stats> for RunMetrics {
    fn from(stats: &Stats) -> Self {
        let ms = |d: std::time::Duration| d.as_secs_f64() * 1000.0;
        Self {
            samples: stats.total_samples(),
            successful: stats.successful_samples,
            failed: stats.failed_samples,
            mean_ms: ms(stats.mean),
            median_ms: ms(stats.median),
            std_dev_ms: ms(stats.standard_deviation),
            min_ms: ms(stats.min),
            max_ms: ms(stats.max),
            ops_per_second: stats.ops_per_second,
            coefficient_of_variation: stats.coefficient_of_variation,
        }
    }
}

/// Validation failure details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionInfo {
    /// Machine-readable code
    pub code: String,
    /// Full message
    pub message: String,
    /// 1-based line, for pattern violations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// 1-based column, for pattern violations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl From<&CodeRejection> for RejectionInfo {
    fn from(rejection: &CodeRejection) -> Self {
        let violation = rejection.violation();
        Self {
            code: rejection.code().to_string(),
            message: rejection.to_string(),
            line: violation.map(|v| v.line),
            column: violation.map(|v| v.column),
        }
    }
}

/// Baseline/candidate verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Baseline label
    pub baseline: String,
    /// Candidate label
    pub candidate: String,
    /// Positive when the candidate is faster
    pub relative_difference: f64,
    /// `relative_difference` in percent
    pub percent_change: f64,
    /// Reliability score in `[0, 1]`
    pub significance: f64,
    /// Bucketed significance
    pub confidence: Confidence,
    /// Human-readable verdict
    pub summary: String,
}

/// Report summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Snippets in the report
    pub total_runs: usize,
    /// Runs that finished sampling
    pub completed: usize,
    /// Runs cut short by cancellation
    pub aborted: usize,
    /// Snippets refused by validation
    pub rejected: usize,
    /// Failed samples across all runs
    pub failed_samples: usize,
    /// Summed wall time
    pub total_duration_ms: f64,
}

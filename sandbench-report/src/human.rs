//! Human-readable terminal output

use crate::report::{Report, RunStatus};

/// Format a millisecond value with a unit that keeps it readable
pub fn format_duration_ms(ms: f64) -> String {
    if ms >= 1000.0 {
        format!("{:.2} s", ms / 1000.0)
    } else if ms >= 1.0 {
        format!("{:.3} ms", ms)
    } else if ms >= 0.001 {
        format!("{:.2} µs", ms * 1000.0)
    } else {
        format!("{:.0} ns", ms * 1_000_000.0)
    }
}

/// Format a report for human-readable terminal display
pub fn format_human_output(report: &Report) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("Sandbench Results\n");
    output.push_str(&"=".repeat(60));
    output.push_str("\n\n");

    for run in &report.runs {
        let status_icon = match run.status {
            RunStatus::Completed => "✓",
            RunStatus::Aborted => "⊘",
            RunStatus::Rejected => "✗",
        };
        output.push_str(&format!("  {} {}\n", status_icon, run.label));

        if let Some(metrics) = &run.metrics {
            output.push_str(&format!(
                "      mean: {}  median: {}  stddev: {}\n",
                format_duration_ms(metrics.mean_ms),
                format_duration_ms(metrics.median_ms),
                format_duration_ms(metrics.std_dev_ms)
            ));
            output.push_str(&format!(
                "      min: {}  max: {}  samples: {} ({} failed)\n",
                format_duration_ms(metrics.min_ms),
                format_duration_ms(metrics.max_ms),
                metrics.samples,
                metrics.failed
            ));
            output.push_str(&format!(
                "      throughput: {:.2} ops/sec  cv: {:.1}%\n",
                metrics.ops_per_second,
                metrics.coefficient_of_variation * 100.0
            ));
        }

        if run.status == RunStatus::Aborted {
            output.push_str("      aborted before sampling finished\n");
        }

        for error in &run.errors {
            output.push_str(&format!("      error: {}\n", error));
        }

        if let Some(rejection) = &run.rejection {
            output.push_str(&format!("      rejected: {}\n", rejection.message));
        }

        output.push('\n');
    }

    if let Some(cmp) = &report.comparison {
        output.push_str("Comparison\n");
        output.push_str(&"-".repeat(60));
        output.push('\n');
        output.push_str(&format!(
            "  baseline: {}  candidate: {}\n",
            cmp.baseline, cmp.candidate
        ));
        output.push_str(&format!(
            "  change: {:+.2}%  significance: {:.2} ({})\n",
            cmp.percent_change, cmp.significance, cmp.confidence
        ));
        output.push_str(&format!("  {}\n\n", cmp.summary));
    }

    output.push_str("Summary\n");
    output.push_str(&"-".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "  Total: {}  Completed: {}  Aborted: {}  Rejected: {}\n",
        report.summary.total_runs,
        report.summary.completed,
        report.summary.aborted,
        report.summary.rejected
    ));
    output.push_str(&format!(
        "  Duration: {:.2} ms\n",
        report.summary.total_duration_ms
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ReportConfig, ReportMeta, SystemInfo};
    use sandbench_core::{BenchmarkConfig, BenchmarkRun, SecurityConfig};
    use sandbench_stats::{Sample, compute_stats};
    use std::time::Duration;

    fn report() -> Report {
        Report::new(ReportMeta::new(
            "0.1.0",
            SystemInfo {
                os: "linux".to_string(),
                arch: "aarch64".to_string(),
                cpu: "Unknown".to_string(),
                cpu_cores: 2,
                memory_gb: 0.0,
            },
            ReportConfig::from(&BenchmarkConfig::default()),
        ))
    }

    #[test]
    fn test_format_duration_ms() {
        assert_eq!(format_duration_ms(2500.0), "2.50 s");
        assert_eq!(format_duration_ms(12.5), "12.500 ms");
        assert_eq!(format_duration_ms(0.25), "250.00 µs");
        assert_eq!(format_duration_ms(0.0005), "500 ns");
    }

    #[test]
    fn test_human_output() {
        let samples = vec![
            Sample::succeeded(Duration::from_millis(2)),
            Sample::failed(Duration::ZERO, "Execution timed out after 5ms"),
        ];
        let run = BenchmarkRun {
            stats: compute_stats(&samples),
            samples,
            config: BenchmarkConfig::default(),
            security: SecurityConfig::default(),
            total_elapsed: Duration::from_millis(10),
            aborted: true,
        };

        let mut report = report();
        report.push_run("loop.js", &run);
        let text = format_human_output(&report);

        assert!(text.contains("⊘ loop.js"));
        assert!(text.contains("mean: 2.000 ms"));
        assert!(text.contains("samples: 2 (1 failed)"));
        assert!(text.contains("error: Execution timed out after 5ms"));
        assert!(text.contains("Aborted: 1"));
    }
}

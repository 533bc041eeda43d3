//! Baseline/Candidate Comparison
//!
//! Derives the relative difference between two runs and a rough reliability
//! score. The score is `1 - max(cv_baseline, cv_candidate)` clamped at zero:
//! a noise heuristic, not a hypothesis test.

use crate::summary::Stats;
use crate::{HIGH_CONFIDENCE, MEDIUM_CONFIDENCE, NEGLIGIBLE_PERCENT};
use serde::{Deserialize, Serialize};

/// Qualitative confidence derived from the significance score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// significance > 0.7
    High,
    /// 0.4 < significance <= 0.7
    Medium,
    /// significance <= 0.4
    Low,
}

impl Confidence {
    /// Classify a significance score
    pub fn from_significance(significance: f64) -> Self {
        if significance > HIGH_CONFIDENCE {
            Confidence::High
        } else if significance > MEDIUM_CONFIDENCE {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

/// Result of comparing two runs' statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelativeComparison {
    /// (baseline_mean - candidate_mean) / baseline_mean; positive = candidate faster
    pub relative_difference: f64,
    /// Reliability score in [0, 1]
    pub significance: f64,
    /// Qualitative bucket of `significance`
    pub confidence: Confidence,
    /// One-sentence human summary
    pub summary: String,
}

impl RelativeComparison {
    /// Relative difference as a percentage
    pub fn percent_change(&self) -> f64 {
        self.relative_difference * 100.0
    }

    /// Whether the difference is below the negligible threshold
    pub fn is_negligible(&self) -> bool {
        self.percent_change().abs() < NEGLIGIBLE_PERCENT
    }
}

/// Compare candidate statistics against a baseline
pub fn compare_stats(baseline: &Stats, candidate: &Stats) -> RelativeComparison {
    let baseline_mean = baseline.mean.as_secs_f64();
    let candidate_mean = candidate.mean.as_secs_f64();

    let relative_difference = if baseline_mean > 0.0 && candidate_mean > 0.0 {
        (baseline_mean - candidate_mean) / baseline_mean
    } else {
        0.0
    };

    let noise = baseline
        .coefficient_of_variation
        .max(candidate.coefficient_of_variation);
    let significance = (1.0 - noise).clamp(0.0, 1.0);
    let confidence = Confidence::from_significance(significance);

    let summary = summarize(relative_difference * 100.0, confidence);

    RelativeComparison {
        relative_difference,
        significance,
        confidence,
        summary,
    }
}

fn summarize(percent: f64, confidence: Confidence) -> String {
    if percent.abs() < NEGLIGIBLE_PERCENT {
        return format!(
            "Performance difference is negligible ({:+.2}%, {} confidence)",
            percent, confidence
        );
    }

    let direction = if percent > 0.0 { "faster" } else { "slower" };
    format!(
        "Candidate is {:.1}% {} than baseline ({} confidence)",
        percent.abs(),
        direction,
        confidence
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Sample, compute_stats};
    use std::time::Duration;

    fn stats_of(values_ms: &[u64]) -> Stats {
        let samples: Vec<Sample> = values_ms
            .iter()
            .map(|&v| Sample::succeeded(Duration::from_millis(v)))
            .collect();
        compute_stats(&samples)
    }

    #[test]
    fn test_candidate_faster() {
        let baseline = stats_of(&[200, 200, 200, 200]);
        let candidate = stats_of(&[100, 100, 100, 100]);
        let result = compare_stats(&baseline, &candidate);

        assert!((result.relative_difference - 0.5).abs() < 1e-9);
        assert_eq!(result.confidence, Confidence::High);
        assert!(result.summary.contains("50.0% faster"));
        assert!(result.summary.contains("high confidence"));
    }

    #[test]
    fn test_candidate_slower() {
        let baseline = stats_of(&[100, 100, 100]);
        let candidate = stats_of(&[150, 150, 150]);
        let result = compare_stats(&baseline, &candidate);

        assert!(result.relative_difference < 0.0);
        assert!(result.summary.contains("slower"));
    }

    #[test]
    fn test_negligible_difference() {
        let baseline = stats_of(&[1000, 1000]);
        let candidate = stats_of(&[995, 995]);
        let result = compare_stats(&baseline, &candidate);

        assert!(result.is_negligible());
        assert!(result.summary.contains("negligible"));
    }

    #[test]
    fn test_zero_mean_yields_zero_difference() {
        let baseline = Stats::default();
        let candidate = stats_of(&[10, 10]);
        let result = compare_stats(&baseline, &candidate);

        assert_eq!(result.relative_difference, 0.0);
        assert!(result.is_negligible());
    }

    #[test]
    fn test_significance_uses_noisier_run() {
        let steady = stats_of(&[100, 100, 100, 100]);
        let noisy = stats_of(&[10, 190, 10, 190]);
        let result = compare_stats(&steady, &noisy);

        // cv of the noisy run is 0.9
        assert!((result.significance - 0.1).abs() < 1e-9);
        assert_eq!(result.confidence, Confidence::Low);
    }

    #[test]
    fn test_significance_clamped_at_zero() {
        let wild = stats_of(&[1, 1, 1, 1, 1, 1, 1, 1, 1, 500]);
        let result = compare_stats(&wild, &wild);
        assert_eq!(result.significance, 0.0);
    }

    #[test]
    fn test_confidence_buckets() {
        assert_eq!(Confidence::from_significance(0.71), Confidence::High);
        assert_eq!(Confidence::from_significance(0.7), Confidence::Medium);
        assert_eq!(Confidence::from_significance(0.41), Confidence::Medium);
        assert_eq!(Confidence::from_significance(0.4), Confidence::Low);
    }
}

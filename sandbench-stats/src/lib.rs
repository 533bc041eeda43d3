#![warn(missing_docs)]
//! Sandbench Statistical Engine
//!
//! Reduces raw per-iteration timings into summary statistics and derives
//! relative comparisons between two runs:
//! - `Sample`: one measured execution with its outcome
//! - `Stats`: mean, median, population standard deviation, extrema, throughput
//! - Baseline/candidate comparison with a coefficient-of-variation based
//!   reliability score

mod comparison;
mod sample;
mod summary;

pub mod serde_millis;

pub use comparison::{Confidence, RelativeComparison, compare_stats};
pub use sample::Sample;
pub use summary::{Stats, compute_stats};

/// Relative changes smaller than this percentage are reported as negligible
pub const NEGLIGIBLE_PERCENT: f64 = 1.0;

/// Significance above which a comparison is reported with high confidence
pub const HIGH_CONFIDENCE: f64 = 0.7;

/// Significance above which a comparison is reported with medium confidence
pub const MEDIUM_CONFIDENCE: f64 = 0.4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_thresholds_ordered() {
        assert!(HIGH_CONFIDENCE > MEDIUM_CONFIDENCE);
        assert!((NEGLIGIBLE_PERCENT - 1.0).abs() < f64::EPSILON);
    }
}

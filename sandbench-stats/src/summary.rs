//! Summary Statistics
//!
//! Reduces a run's samples into central tendency, dispersion and throughput.
//! Only successful samples contribute to timing figures; failed samples are
//! counted but their elapsed times are ignored.

use crate::sample::Sample;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Summary statistics over a sample sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    // Central tendency (successful samples only)
    #[serde(rename = "mean_ms", with = "crate::serde_millis")]
    pub mean: Duration,
    #[serde(rename = "median_ms", with = "crate::serde_millis")]
    pub median: Duration,
    /// Population standard deviation
    #[serde(rename = "std_dev_ms", with = "crate::serde_millis")]
    pub standard_deviation: Duration,

    // Extremes
    #[serde(rename = "min_ms", with = "crate::serde_millis")]
    pub min: Duration,
    #[serde(rename = "max_ms", with = "crate::serde_millis")]
    pub max: Duration,

    // Sample info
    pub successful_samples: usize,
    pub failed_samples: usize,

    /// Executions per second derived from the mean
    pub ops_per_second: f64,
    /// Standard deviation divided by mean (unit-free noise measure)
    pub coefficient_of_variation: f64,
}

impl Stats {
    /// Total number of samples the stats were computed from
    pub fn total_samples(&self) -> usize {
        self.successful_samples + self.failed_samples
    }

    /// Mean in fractional milliseconds
    pub fn mean_ms(&self) -> f64 {
        self.mean.as_secs_f64() * 1000.0
    }

    /// Check if the distribution appears stable (CV below the threshold)
    pub fn is_stable(&self, cv_threshold: f64) -> bool {
        self.successful_samples > 0 && self.coefficient_of_variation < cv_threshold
    }
}

/// Compute summary statistics for a sample sequence.
///
/// Pure function: the same input always yields the same `Stats`.
pub fn compute_stats(samples: &[Sample]) -> Stats {
    let mut times: Vec<f64> = samples
        .iter()
        .filter(|s| s.success)
        .map(|s| s.elapsed.as_nanos() as f64)
        .collect();

    let successful_samples = times.len();
    let failed_samples = samples.len() - successful_samples;

    if times.is_empty() {
        return Stats {
            failed_samples,
            ..Stats::default()
        };
    }

    times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = times.len() as f64;
    let mean = times.iter().sum::<f64>() / n;

    let median = if times.len() % 2 == 0 {
        let mid = times.len() / 2;
        (times[mid - 1] + times[mid]) / 2.0
    } else {
        times[times.len() / 2]
    };

    // Population (not sample) variance
    let variance = times.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    let min = times[0];
    let max = times[times.len() - 1];

    let mean_ms = mean / 1_000_000.0;
    let ops_per_second = if mean_ms > 0.0 { 1000.0 / mean_ms } else { 0.0 };
    let coefficient_of_variation = if mean > 0.0 { std_dev / mean } else { 0.0 };

    Stats {
        mean: nanos(mean),
        median: nanos(median),
        standard_deviation: nanos(std_dev),
        min: nanos(min),
        max: nanos(max),
        successful_samples,
        failed_samples,
        ops_per_second,
        coefficient_of_variation,
    }
}

#[inline]
fn nanos(value: f64) -> Duration {
    Duration::from_nanos(value.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(values: &[u64]) -> Vec<Sample> {
        values
            .iter()
            .map(|&v| Sample::succeeded(Duration::from_millis(v)))
            .collect()
    }

    #[test]
    fn test_basic_summary() {
        let stats = compute_stats(&ms(&[10, 20, 30, 40, 50]));

        assert_eq!(stats.mean, Duration::from_millis(30));
        assert_eq!(stats.median, Duration::from_millis(30));
        assert_eq!(stats.min, Duration::from_millis(10));
        assert_eq!(stats.max, Duration::from_millis(50));
        assert_eq!(stats.successful_samples, 5);
        assert_eq!(stats.failed_samples, 0);

        // Population stddev of 10..50 step 10 is sqrt(200) ms
        let expected_sd = 200f64.sqrt();
        assert!((stats.standard_deviation.as_secs_f64() * 1000.0 - expected_sd).abs() < 1e-6);
        assert!((stats.ops_per_second - 1000.0 / 30.0).abs() < 1e-9);
        assert!((stats.coefficient_of_variation - expected_sd / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_even_median() {
        let stats = compute_stats(&ms(&[40, 10, 30, 20]));
        assert_eq!(stats.median, Duration::from_millis(25));
    }

    #[test]
    fn test_empty_samples() {
        let stats = compute_stats(&[]);

        assert_eq!(stats.mean, Duration::ZERO);
        assert_eq!(stats.median, Duration::ZERO);
        assert_eq!(stats.standard_deviation, Duration::ZERO);
        assert_eq!(stats.min, Duration::ZERO);
        assert_eq!(stats.max, Duration::ZERO);
        assert_eq!(stats.successful_samples, 0);
        assert_eq!(stats.failed_samples, 0);
        assert_eq!(stats.ops_per_second, 0.0);
        assert_eq!(stats.coefficient_of_variation, 0.0);
    }

    #[test]
    fn test_all_failed() {
        let samples = vec![
            Sample::failed(Duration::from_millis(5), "boom"),
            Sample::failed(Duration::from_millis(7), "boom"),
        ];
        let stats = compute_stats(&samples);

        assert_eq!(stats.failed_samples, 2);
        assert_eq!(stats.successful_samples, 0);
        assert_eq!(stats.mean, Duration::ZERO);
        assert_eq!(stats.max, Duration::ZERO);
        assert_eq!(stats.ops_per_second, 0.0);
    }

    #[test]
    fn test_failed_samples_excluded_from_timing() {
        let mut samples = ms(&[10, 20]);
        samples.push(Sample::failed(Duration::from_secs(10), "timeout"));
        let stats = compute_stats(&samples);

        assert_eq!(stats.mean, Duration::from_millis(15));
        assert_eq!(stats.max, Duration::from_millis(20));
        assert_eq!(stats.total_samples(), 3);
    }

    #[test]
    fn test_idempotent() {
        let samples = ms(&[3, 1, 4, 1, 5, 9, 2, 6]);
        assert_eq!(compute_stats(&samples), compute_stats(&samples));
    }

    #[test]
    fn test_zero_variance() {
        let stats = compute_stats(&ms(&[100, 100, 100]));
        assert_eq!(stats.coefficient_of_variation, 0.0);
        assert!(stats.is_stable(0.05));
    }
}

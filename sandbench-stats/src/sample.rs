//! Measurement samples

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single measured execution of the candidate code.
///
/// Samples are appended to a run in execution order and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Wall-clock time spent executing the snippet
    #[serde(rename = "elapsed_ms", with = "crate::serde_millis")]
    pub elapsed: Duration,
    /// Whether the snippet completed without throwing or timing out
    pub success: bool,
    /// Normalized error text for failed samples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Sample {
    /// A successful sample
    #[inline]
    pub fn succeeded(elapsed: Duration) -> Self {
        Self {
            elapsed,
            success: true,
            error: None,
        }
    }

    /// A failed sample carrying the error text
    #[inline]
    pub fn failed(elapsed: Duration, error: impl Into<String>) -> Self {
        Self {
            elapsed,
            success: false,
            error: Some(error.into()),
        }
    }

    /// Elapsed time in fractional milliseconds
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_constructors() {
        let ok = Sample::succeeded(Duration::from_millis(3));
        assert!(ok.success);
        assert!(ok.error.is_none());
        assert!((ok.elapsed_ms() - 3.0).abs() < 1e-9);

        let bad = Sample::failed(Duration::ZERO, "boom");
        assert!(!bad.success);
        assert_eq!(bad.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_sample_json_uses_millis() {
        let sample = Sample::succeeded(Duration::from_micros(1500));
        let json = serde_json::to_string(&sample).unwrap();
        assert_eq!(json, r#"{"elapsed_ms":1.5,"success":true}"#);

        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn test_negative_millis_rejected() {
        let result: Result<Sample, _> =
            serde_json::from_str(r#"{"elapsed_ms":-1.0,"success":true}"#);
        assert!(result.is_err());
    }
}

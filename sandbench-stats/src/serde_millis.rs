//! Serialize `Duration` values as floating-point milliseconds.
//!
//! Use with `#[serde(with = "sandbench_stats::serde_millis")]`.

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Serialize a duration as milliseconds
pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

/// Deserialize a duration from milliseconds
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = f64::deserialize(deserializer)?;
    if !millis.is_finite() || millis < 0.0 {
        return Err(serde::de::Error::custom(format!(
            "invalid duration: {millis} ms"
        )));
    }
    Ok(Duration::from_nanos((millis * 1_000_000.0).round() as u64))
}

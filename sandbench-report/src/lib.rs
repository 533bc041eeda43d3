#![warn(missing_docs)]
//! Sandbench Report
//!
//! Serializable report model plus two renderers:
//! - JSON (machine-readable)
//! - Human-readable terminal output

mod human;
mod json;
mod report;

pub use human::{format_duration_ms, format_human_output};
pub use json::generate_json_report;
pub use report::{
    ComparisonReport, RejectionInfo, Report, ReportConfig, ReportMeta, ReportSummary, RunMetrics,
    RunReport, RunStatus, SystemInfo,
};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// JSON with full schema
    Json,
    /// Human-readable terminal output
    #[default]
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Human);
        assert!("csv".parse::<OutputFormat>().is_err());
    }
}

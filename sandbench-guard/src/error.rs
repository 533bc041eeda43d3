//! Rejection errors raised by the validator

use crate::kind::SecurityErrorKind;
use crate::REMEDIATION;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input that cannot be screened at all
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputError {
    /// Bytes that do not decode as UTF-8 text
    #[error("code must be a string")]
    #[serde(rename = "INVALID_INPUT")]
    NotText,

    /// Snippet larger than the configured limit
    #[error("Code size {size} bytes exceeds maximum of {limit} bytes")]
    #[serde(rename = "CODE_TOO_LARGE")]
    SizeExceeded {
        /// Actual size in bytes
        size: usize,
        /// Configured maximum in bytes
        limit: usize,
    },
}

impl InputError {
    /// Machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            InputError::NotText => "INVALID_INPUT",
            InputError::SizeExceeded { .. } => "CODE_TOO_LARGE",
        }
    }
}

/// A dangerous pattern found in the snippet.
///
/// `line` and `column` are 1-based and point at the first character of
/// `matched_text`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ValidationError {
    /// Violation category
    pub kind: SecurityErrorKind,
    /// Human-readable message
    pub message: String,
    /// 1-based line of the match
    pub line: usize,
    /// 1-based column of the match, counted in characters
    pub column: usize,
    /// Source text matched by the detector
    pub matched_text: String,
}

impl ValidationError {
    /// Build the error and its message from a match
    pub fn new(
        kind: SecurityErrorKind,
        line: usize,
        column: usize,
        matched_text: impl Into<String>,
    ) -> Self {
        let matched_text = matched_text.into();
        let message = format!(
            "Security violation [{}]: {} at line {}, column {}: \"{}\". {}",
            kind.code(),
            kind.explanation(),
            line,
            column,
            matched_text.trim(),
            REMEDIATION
        );
        Self {
            kind,
            message,
            line,
            column,
            matched_text,
        }
    }

    /// Machine-readable code of the violation kind
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/// Why a snippet was refused
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeRejection {
    /// Input could not be screened
    #[error(transparent)]
    Input(#[from] InputError),

    /// A dangerous pattern was found
    #[error(transparent)]
    Security(#[from] ValidationError),
}

impl CodeRejection {
    /// Machine-readable code (`INVALID_INPUT`, `CODE_TOO_LARGE` or the violation kind)
    pub fn code(&self) -> &'static str {
        match self {
            CodeRejection::Input(e) => e.code(),
            CodeRejection::Security(e) => e.code(),
        }
    }

    /// The violation, if this rejection came from the pattern scan
    pub fn violation(&self) -> Option<&ValidationError> {
        match self {
            CodeRejection::Security(e) => Some(e),
            CodeRejection::Input(_) => None,
        }
    }
}

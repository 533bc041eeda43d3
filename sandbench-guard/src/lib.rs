#![warn(missing_docs)]
//! Sandbench Guard - Static Code Validation
//!
//! Screens untrusted script snippets before they are executed:
//! - `PatternCatalog`: ordered table of case-insensitive, whitespace-tolerant
//!   detectors, each tagged with a `SecurityErrorKind`
//! - `CodeValidator`: size gate, then an earliest-match scan across the catalog
//! - `ValidationError`: the violation kind plus line/column of the offending text
//!
//! Detection is lexical. It catches common obfuscations of unbounded loops
//! (negated literals, self-comparisons) but is not a parser and can be evaded.

mod catalog;
mod error;
mod kind;
mod validator;

pub use catalog::{DangerousPattern, Detector, PatternCatalog};
pub use error::{CodeRejection, InputError, ValidationError};
pub use kind::SecurityErrorKind;
pub use validator::{CodeValidator, Location, locate};

/// Sentence appended to every security violation message
pub const REMEDIATION: &str = "Remove or replace this code to ensure safe execution.";

/// Default maximum snippet size in bytes (100 KiB)
pub const DEFAULT_MAX_CODE_SIZE: usize = 100 * 1024;

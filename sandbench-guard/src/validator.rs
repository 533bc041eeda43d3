//! Code Validator
//!
//! Size gate followed by an earliest-match scan across the catalog.

use crate::catalog::PatternCatalog;
use crate::error::{CodeRejection, InputError, ValidationError};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

/// 1-based position in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Line number, starting at 1
    pub line: usize,
    /// Column number in characters, starting at 1
    pub column: usize,
}

/// Translate a byte offset into a line/column position.
///
/// `offset` must lie on a character boundary of `text`.
pub fn locate(text: &str, offset: usize) -> Location {
    let before = &text[..offset];
    let line = 1 + before.matches('\n').count();
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = 1 + before[line_start..].chars().count();
    Location { line, column }
}

fn shared_extended() -> Arc<PatternCatalog> {
    static CATALOG: OnceLock<Arc<PatternCatalog>> = OnceLock::new();
    CATALOG
        .get_or_init(|| Arc::new(PatternCatalog::extended()))
        .clone()
}

/// Stateless validator over a shared catalog
#[derive(Debug, Clone)]
pub struct CodeValidator {
    catalog: Arc<PatternCatalog>,
}

impl Default for CodeValidator {
    fn default() -> Self {
        Self::new(shared_extended())
    }
}

impl CodeValidator {
    /// Create a validator over `catalog`
    pub fn new(catalog: Arc<PatternCatalog>) -> Self {
        Self { catalog }
    }

    /// Catalog this validator scans with
    pub fn catalog(&self) -> &Arc<PatternCatalog> {
        &self.catalog
    }

    /// Screen raw bytes; non-UTF-8 input is rejected before anything else
    pub fn validate_bytes(&self, code: &[u8], max_size: usize) -> Result<(), CodeRejection> {
        let text = std::str::from_utf8(code).map_err(|_| InputError::NotText)?;
        self.validate(text, max_size)
    }

    /// Screen a snippet.
    ///
    /// The size gate runs first, so oversized code is reported as
    /// `CODE_TOO_LARGE` even when it also contains dangerous patterns.
    pub fn validate(&self, code: &str, max_size: usize) -> Result<(), CodeRejection> {
        if code.len() > max_size {
            return Err(InputError::SizeExceeded {
                size: code.len(),
                limit: max_size,
            }
            .into());
        }

        match self.scan(code) {
            Some(violation) => Err(violation.into()),
            None => Ok(()),
        }
    }

    /// Earliest violation in `code`, ignoring size.
    ///
    /// Detectors matching at the same offset resolve to the one declared
    /// first in the catalog.
    pub fn scan(&self, code: &str) -> Option<ValidationError> {
        let mut earliest: Option<(usize, std::ops::Range<usize>)> = None;

        for (index, pattern) in self.catalog.patterns().iter().enumerate() {
            let Some(range) = pattern.detector.find(code) else {
                continue;
            };
            let better = match &earliest {
                Some((_, best)) => range.start < best.start,
                None => true,
            };
            if better {
                earliest = Some((index, range));
            }
        }

        earliest.map(|(index, range)| {
            let kind = self.catalog.patterns()[index].kind;
            let location = locate(code, range.start);
            ValidationError::new(kind, location.line, location.column, &code[range])
        })
    }
}

//! Pattern Catalog
//!
//! Ordered table of dangerous constructs. Every detector is compiled
//! case-insensitive and its source tolerates arbitrary whitespace between
//! tokens (`while (  true  )`, `eval  (`).
//!
//! Declaration order matters only for ties: when two detectors match at the
//! same offset, the one declared first wins.

use crate::kind::SecurityErrorKind;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;
use std::ops::Range;

/// Operand of a self-comparison: identifier/boolean, number, or string literal
const OPERAND: &str = r#"[A-Za-z_$][\w$]*|\d+(?:\.\d+)?|"[^"\\\r\n]*"|'[^'\\\r\n]*'"#;

/// How a rule's source is interpreted
#[derive(Debug, Clone, Copy)]
enum Shape {
    Plain,
    /// Source contains `{operand}` twice; the two captures must be identical
    SelfComparison,
}

struct Rule {
    kind: SecurityErrorKind,
    shape: Shape,
    source: &'static str,
}

const fn plain(kind: SecurityErrorKind, source: &'static str) -> Rule {
    Rule {
        kind,
        shape: Shape::Plain,
        source,
    }
}

const fn self_comparison(kind: SecurityErrorKind, source: &'static str) -> Rule {
    Rule {
        kind,
        shape: Shape::SelfComparison,
        source,
    }
}

use SecurityErrorKind as K;

const STANDARD_RULES: &[Rule] = &[
    // Unbounded loops: even runs of `!` before true, odd runs before false
    plain(K::InfiniteWhileLoop, r"\bwhile\s*\(\s*(?:!\s*!\s*)*true\s*\)"),
    plain(K::InfiniteWhileLoop, r"\bwhile\s*\(\s*!\s*(?:!\s*!\s*)*false\s*\)"),
    self_comparison(
        K::InfiniteWhileLoop,
        r"\bwhile\s*\(\s*(?P<lhs>{operand})\s*===?\s*(?P<rhs>{operand})\s*\)",
    ),
    plain(K::InfiniteForLoop, r"\bfor\s*\(\s*;\s*;\s*\)"),
    // Dynamic code execution. The lowercase `function` keyword is not the constructor.
    plain(K::EvalUsage, r"\beval\s*\("),
    plain(K::FunctionConstructor, r"\bnew\s+function\s*\("),
    plain(K::FunctionConstructor, r"\b(?-i:F)unction\s*\("),
    // Timing and scheduling
    plain(K::SetTimeout, r"\bsetTimeout\s*\("),
    plain(K::SetInterval, r"\bsetInterval\s*\("),
    plain(K::RequestAnimationFrame, r"\brequestAnimationFrame\s*\("),
    plain(K::SetImmediate, r"\bsetImmediate\s*\("),
    plain(K::ProcessNextTick, r"\bprocess\s*\.\s*nextTick\s*\("),
    // Network and streaming
    plain(K::FetchApi, r"\bfetch\s*\("),
    plain(K::XmlHttpRequest, r"\bnew\s+XMLHttpRequest\b"),
    plain(K::XmlHttpRequest, r"\bXMLHttpRequest\s*\("),
    plain(K::WebSocket, r"\bnew\s+WebSocket\b"),
    plain(K::WebSocket, r"\bWebSocket\s*\("),
    plain(K::EventSource, r"\bnew\s+EventSource\b"),
    plain(K::EventSource, r"\bEventSource\s*\("),
    // Concurrency escape
    plain(K::WebWorker, r"\bnew\s+Worker\b"),
    plain(K::WebWorker, r"\bWorker\s*\("),
    plain(K::SharedWorker, r"\bnew\s+SharedWorker\b"),
    plain(K::SharedWorker, r"\bSharedWorker\s*\("),
    plain(K::ImportScripts, r"\bimportScripts\s*\("),
    // DOM injection
    plain(
        K::DynamicScript,
        r#"\bcreateElement\s*\(\s*['"`]\s*script\s*['"`]\s*\)"#,
    ),
    plain(K::InnerHtml, r"(?P<hit>\.\s*innerHTML\s*=)(?:[^=]|$)"),
    plain(K::OuterHtml, r"(?P<hit>\.\s*outerHTML\s*=)(?:[^=]|$)"),
    // Storage and persistence
    plain(K::LocalStorage, r"\blocalStorage\s*[.\[]"),
    plain(K::SessionStorage, r"\bsessionStorage\s*[.\[]"),
    plain(K::IndexedDb, r"\bindexedDB\s*\.\s*open\s*\("),
    // Blocking UI
    plain(K::Alert, r"\balert\s*\("),
    plain(K::Confirm, r"\bconfirm\s*\("),
    plain(K::Prompt, r"\bprompt\s*\("),
    // Crypto timing
    plain(K::CryptoSubtle, r"\bcrypto\s*\.\s*subtle\b"),
];

// Specific module loads are declared before the generic `require(` rule so
// they win the tie at the same offset.
const EXTENDED_RULES: &[Rule] = &[
    plain(
        K::HistoryApi,
        r"\bhistory\s*\.\s*(?:pushState|replaceState|back|forward|go|state|length)\b",
    ),
    plain(K::NavigatorAccess, r"\bnavigator\s*[.\[]"),
    plain(K::DynamicImport, r"\bimport\s*\("),
    plain(
        K::FileSystemAccess,
        r#"\brequire\s*\(\s*['"`](?:node:)?fs(?:/promises)?['"`]\s*\)"#,
    ),
    plain(K::FileSystemAccess, r"\bfs\s*\.\s*[A-Za-z_$][\w$]*\s*\("),
    plain(
        K::ChildProcess,
        r#"\brequire\s*\(\s*['"`](?:node:)?child_process['"`]\s*\)"#,
    ),
    plain(K::ChildProcess, r"\bchild_process\b"),
    plain(K::ChildProcess, r"\b(?:execSync|spawnSync|execFileSync)\s*\("),
    plain(K::BufferAccess, r"\bnew\s+Buffer\s*\("),
    plain(
        K::BufferAccess,
        r"\bBuffer\s*\.\s*(?:alloc|allocUnsafe|allocUnsafeSlow|from|concat)\s*\(",
    ),
    plain(K::RequireCall, r"\brequire\s*\("),
    plain(K::IncludeCall, r"\binclude\s*\("),
    plain(K::GlobalAccess, r"\bglobalThis\b"),
    plain(K::GlobalAccess, r"\bglobal\s*[.\[]"),
    plain(K::WindowAccess, r"\bwindow\s*[.\[]"),
    plain(K::DocumentAccess, r"\bdocument\s*[.\[]"),
    plain(K::LocationAccess, r"\blocation\s*[.\[]"),
    plain(K::ConsoleAccess, r"\bconsole\s*[.\[]"),
    plain(K::DebuggerStatement, r"\bdebugger\b"),
    plain(K::WithStatement, r"\bwith\s*\("),
    plain(
        K::PrototypeDeletion,
        r"\bdelete\s+[^;\n]*?\b(?:prototype|constructor|__proto__)\b",
    ),
    plain(
        K::PrototypePollution,
        r#"(?P<hit>(?:\.\s*|\[\s*['"`])(?:__proto__|prototype|constructor)(?:\s*['"`]\s*\])?(?:\s*\.\s*[A-Za-z_$][\w$]*)?\s*=)(?:[^=]|$)"#,
    ),
];

/// A compiled matcher
#[derive(Debug, Clone)]
pub enum Detector {
    /// Any match of the regex is a violation
    Pattern(Regex),
    /// Matches only when the `lhs` and `rhs` captures are textually identical
    SelfComparison(Regex),
}

impl Detector {
    /// Compile a case-insensitive plain detector
    pub fn pattern(source: &str) -> Result<Self, regex::Error> {
        Ok(Detector::Pattern(compile(source)?))
    }

    /// Compile a case-insensitive self-comparison detector.
    ///
    /// The source must define named groups `lhs` and `rhs`.
    pub fn self_comparison(source: &str) -> Result<Self, regex::Error> {
        let regex = compile(source)?;
        let names: Vec<&str> = regex.capture_names().flatten().collect();
        if !names.contains(&"lhs") || !names.contains(&"rhs") {
            return Err(regex::Error::Syntax(
                "self-comparison detector needs `lhs` and `rhs` groups".to_string(),
            ));
        }
        Ok(Detector::SelfComparison(regex))
    }

    /// Byte range of the first match in `text`, if any.
    ///
    /// A named `hit` group narrows the reported range; the rest of the
    /// match only has to be present.
    pub fn find(&self, text: &str) -> Option<Range<usize>> {
        let caps = match self {
            Detector::Pattern(regex) => regex.captures(text),
            Detector::SelfComparison(regex) => regex.captures_iter(text).find(|caps| {
                match (caps.name("lhs"), caps.name("rhs")) {
                    (Some(lhs), Some(rhs)) => lhs.as_str() == rhs.as_str(),
                    _ => false,
                }
            }),
        }?;
        caps.name("hit").or_else(|| caps.get(0)).map(|m| m.range())
    }

    /// Regex source the detector was compiled from
    pub fn source(&self) -> &str {
        match self {
            Detector::Pattern(regex) | Detector::SelfComparison(regex) => regex.as_str(),
        }
    }
}

fn compile(source: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(source).case_insensitive(true).build()
}

/// A detector paired with the kind it reports
#[derive(Debug, Clone)]
pub struct DangerousPattern {
    /// Violation category reported on match
    pub kind: SecurityErrorKind,
    /// Compiled matcher
    pub detector: Detector,
}

impl DangerousPattern {
    /// Create a pattern from an already compiled detector
    pub fn new(kind: SecurityErrorKind, detector: Detector) -> Self {
        Self { kind, detector }
    }

    /// Compile a plain case-insensitive pattern
    pub fn regex(kind: SecurityErrorKind, source: &str) -> Result<Self, regex::Error> {
        Ok(Self::new(kind, Detector::pattern(source)?))
    }
}

/// Immutable, ordered set of dangerous patterns.
///
/// Construct once and share (typically behind an `Arc`) between validators.
#[derive(Debug, Clone, Default)]
pub struct PatternCatalog {
    patterns: Vec<DangerousPattern>,
}

impl PatternCatalog {
    /// Catalog without any patterns (validation then only enforces size)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Core families: loops, dynamic code, timers, network, workers, DOM,
    /// storage, blocking UI and crypto timing
    pub fn standard() -> Self {
        Self::from_rules(STANDARD_RULES)
    }

    /// Standard families plus reflection and environment-escape detectors
    pub fn extended() -> Self {
        let mut catalog = Self::standard();
        catalog.patterns.extend(Self::from_rules(EXTENDED_RULES).patterns);
        catalog
    }

    fn from_rules(rules: &[Rule]) -> Self {
        let patterns = rules
            .iter()
            .map(|rule| {
                let detector = match rule.shape {
                    Shape::Plain => Detector::pattern(rule.source),
                    Shape::SelfComparison => {
                        Detector::self_comparison(&rule.source.replace("{operand}", OPERAND))
                    }
                };
                DangerousPattern::new(
                    rule.kind,
                    detector.expect("built-in detector source must compile"),
                )
            })
            .collect();
        Self { patterns }
    }

    /// Append a pattern (lowest tie-break priority)
    pub fn with_pattern(mut self, pattern: DangerousPattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// Remove every pattern reporting `kind`
    pub fn without_kind(mut self, kind: SecurityErrorKind) -> Self {
        self.patterns.retain(|p| p.kind != kind);
        self
    }

    /// Patterns in declaration order
    pub fn patterns(&self) -> &[DangerousPattern] {
        &self.patterns
    }

    /// Number of patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the catalog has no patterns
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Distinct kinds covered by this catalog
    pub fn kinds(&self) -> BTreeSet<SecurityErrorKind> {
        self.patterns.iter().map(|p| p.kind).collect()
    }
}

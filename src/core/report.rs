//! Violation records and per-document reports.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rule identifiers emitted by the built-in checks. Cross-field rules use
/// their configured `id` instead.
pub mod codes {
    pub const MISSING_FRONTMATTER: &str = "missing_frontmatter";
    pub const UNTERMINATED_FRONTMATTER: &str = "unterminated_frontmatter";
    pub const MALFORMED_FRONTMATTER_LINE: &str = "malformed_frontmatter_line";
    pub const MISSING_FRONTMATTER_KEY: &str = "missing_frontmatter_key";
    pub const INVALID_FRONTMATTER_VALUE: &str = "invalid_frontmatter_value";
    pub const MISSING_SECTION: &str = "missing_section";
    pub const SECTION_OUT_OF_ORDER: &str = "section_out_of_order";
    pub const ID_MISMATCH: &str = "id_mismatch";
    pub const UNREADABLE_DOCUMENT: &str = "unreadable_document";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// Where in the document a violation was detected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Location {
    Document,
    Frontmatter { key: String },
    Section { name: String },
    Line { line: usize },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::Frontmatter { key } => write!(f, "frontmatter.{}", key),
            Self::Section { name } => write!(f, "section \"{}\"", name),
            Self::Line { line } => write!(f, "line {}", line),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub location: Location,
}

impl Violation {
    pub fn error(rule: &str, location: Location, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            severity: Severity::Error,
            message: message.into(),
            location,
        }
    }

    pub fn warning(rule: &str, location: Location, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            severity: Severity::Warning,
            message: message.into(),
            location,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub document: String,
    pub violations: Vec<Violation>,
    pub pass: bool,
}

impl ValidationReport {
    pub fn new(document: impl Into<String>, violations: Vec<Violation>) -> Self {
        let pass = !violations.iter().any(Violation::is_error);
        Self {
            document: document.into(),
            violations,
            pass,
        }
    }

    pub fn error_count(&self) -> usize {
        self.violations.iter().filter(|v| v.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.violations.len() - self.error_count()
    }

    /// Violations emitted under `rule`, in emission order.
    pub fn by_rule<'a>(&'a self, rule: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations.iter().filter(move |v| v.rule == rule)
    }

    /// Whether this report passes; in strict mode warnings fail too.
    pub fn passes(&self, strict: bool) -> bool {
        self.pass && (!strict || self.violations.is_empty())
    }
}

/// Collects violations in emission order, dropping repeats of the same
/// `(rule, location)` pair.
#[derive(Debug, Default)]
pub struct ViolationSink {
    seen: FxHashSet<(String, Location)>,
    violations: Vec<Violation>,
}

impl ViolationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: Violation) {
        let key = (violation.rule.clone(), violation.location.clone());
        if self.seen.insert(key) {
            self.violations.push(violation);
        }
    }

    pub fn finish(self, document: impl Into<String>) -> ValidationReport {
        ValidationReport::new(document, self.violations)
    }
}

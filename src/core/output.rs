//! Report rendering for CLI surfaces.
//!
//! Text output keeps one line per violation and stays bounded for long
//! messages; JSON output is the full, stable report list.

use crate::core::batch::BatchSummary;
use crate::core::error::ConformError;
use crate::core::report::{Severity, ValidationReport};
use colored::Colorize;

const MAX_MESSAGE_CHARS: usize = 160;

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

pub fn render_text(reports: &[ValidationReport], strict: bool) -> String {
    let mut out = String::new();
    for report in reports {
        let verdict = if report.passes(strict) {
            "✓".bright_green()
        } else {
            "✗".bright_red()
        };
        out.push_str(&format!(
            "{} {} ({} error(s), {} warning(s))\n",
            verdict,
            report.document.bright_white().bold(),
            report.error_count(),
            report.warning_count()
        ));
        for v in &report.violations {
            let severity = match v.severity {
                Severity::Error => "error".bright_red(),
                Severity::Warning => "warning".bright_yellow(),
            };
            out.push_str(&format!(
                "    {} [{}] {}: {}\n",
                severity,
                v.rule.bright_cyan(),
                v.location,
                compact_line(&v.message, MAX_MESSAGE_CHARS)
            ));
        }
    }
    out
}

pub fn render_summary(summary: &BatchSummary) -> String {
    format!(
        "check: summary documents={} pass={} fail={} errors={} warnings={}",
        summary.documents, summary.passed, summary.failed, summary.errors, summary.warnings
    )
}

pub fn render_json(
    reports: &[ValidationReport],
    summary: &BatchSummary,
    rules_source: &str,
) -> Result<String, ConformError> {
    let value = serde_json::json!({
        "rules": rules_source,
        "summary": {
            "documents": summary.documents,
            "passed": summary.passed,
            "failed": summary.failed,
            "errors": summary.errors,
            "warnings": summary.warnings,
        },
        "reports": reports,
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

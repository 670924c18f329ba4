use crate::core::error::ConformError;
use crate::core::report::ValidationReport;
use crate::core::time;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

pub const TRACE_ENV: &str = "AGENT_CONFORM_TRACE";

#[derive(Debug, Serialize, Deserialize)]
pub struct TraceEvent {
    pub trace_id: String,
    pub ts: String,
    pub actor: String,
    pub op: String,
    pub request: Value,
    pub response: Value,
}

impl TraceEvent {
    /// One event per validated document. Only digests and counts are
    /// recorded, never document text.
    pub fn for_report(run_id: &str, text: &str, rules_source: &str, report: &ValidationReport) -> Self {
        TraceEvent {
            trace_id: run_id.to_string(),
            ts: time::now_epoch_z(),
            actor: "agent-conform".to_string(),
            op: "check.document".to_string(),
            request: serde_json::json!({
                "document": report.document,
                "sha256": content_digest(text),
                "bytes": text.len(),
                "rules": rules_source,
            }),
            response: serde_json::json!({
                "pass": report.pass,
                "errors": report.error_count(),
                "warnings": report.warning_count(),
                "rules_hit": report.violations.iter().map(|v| v.rule.as_str()).collect::<Vec<_>>(),
            }),
        }
    }
}

pub fn content_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Whether per-document trace lines should be printed to stderr.
pub fn trace_enabled() -> bool {
    std::env::var(TRACE_ENV).ok().as_deref() == Some("1")
}

pub fn trace_gate(name: &str) {
    if trace_enabled() {
        eprintln!("check: trace {}", name);
    }
}

pub fn append_traces(trace_path: &Path, events: &[TraceEvent]) -> Result<(), ConformError> {
    if let Some(parent) = trace_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(ConformError::IoError)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(trace_path)
        .map_err(ConformError::IoError)?;

    for event in events {
        let json = serde_json::to_string(event)?;
        writeln!(file, "{}", json).map_err(ConformError::IoError)?;
    }

    Ok(())
}

//! Batch driver: discovery, loading, and parallel validation.

use crate::core::document::Document;
use crate::core::error::ConformError;
use crate::core::report::{Location, ValidationReport, Violation, codes};
use crate::core::rules::RuleSet;
use crate::core::validate::validate;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

const SKIP_DIRS: [&str; 3] = [".git", "target", "node_modules"];

/// Markdown files under `root`, sorted. A file path is returned as-is.
pub fn collect_markdown_files(root: &Path) -> Result<Vec<PathBuf>, ConformError> {
    fn recurse(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ConformError> {
        let name = dir.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if SKIP_DIRS.contains(&name) {
            return Ok(());
        }

        for entry in fs::read_dir(dir).map_err(ConformError::IoError)? {
            let entry = entry.map_err(ConformError::IoError)?;
            let path = entry.path();
            if path.is_dir() {
                recurse(&path, out)?;
            } else if is_markdown(&path) {
                out.push(path);
            }
        }
        Ok(())
    }

    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        return Err(ConformError::NotFound(root.display().to_string()));
    }

    let mut out = Vec::new();
    recurse(root, &mut out)?;
    out.sort();
    Ok(out)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md"))
}

/// Expand every input (file or directory) into a deduplicated file list.
pub fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, ConformError> {
    let mut files = Vec::new();
    for input in inputs {
        files.extend(collect_markdown_files(input)?);
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Documents read for one run, plus a ready-made report for every file that
/// could not be read.
#[derive(Debug, Default)]
pub struct LoadedDocuments {
    pub documents: Vec<Document>,
    pub unreadable: Vec<ValidationReport>,
}

/// Read every path into a `Document`. Invalid UTF-8 is decoded lossily; a
/// file that cannot be read at all becomes an `unreadable_document` report
/// and the rest of the batch is still loaded.
pub fn load_documents(paths: &[PathBuf]) -> LoadedDocuments {
    let mut loaded = LoadedDocuments::default();
    for path in paths {
        match fs::read(path) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                loaded.documents.push(Document::from_path(path, text));
            }
            Err(source) => {
                let err = ConformError::ReadError {
                    path: path.display().to_string(),
                    source,
                };
                let id = Document::from_path(path, String::new()).id;
                loaded.unreadable.push(ValidationReport::new(
                    id,
                    vec![Violation::error(
                        codes::UNREADABLE_DOCUMENT,
                        Location::Document,
                        err.to_string(),
                    )],
                ));
            }
        }
    }
    loaded
}

/// A validated document and its report.
#[derive(Debug, Clone)]
pub struct Checked<'a> {
    pub document: &'a Document,
    pub report: ValidationReport,
}

/// Validate every document in parallel. Results come back sorted by
/// document identifier; documents sharing an identifier keep input order.
pub fn validate_all<'a>(
    documents: &'a [Document],
    rules: &RuleSet,
) -> Result<Vec<Checked<'a>>, ConformError> {
    let mut checked = documents
        .par_iter()
        .map(|document| {
            validate(document, rules).map(|report| Checked { document, report })
        })
        .collect::<Result<Vec<_>, _>>()?;
    checked.sort_by(|a, b| a.report.document.cmp(&b.report.document));
    Ok(checked)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub documents: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
}

impl BatchSummary {
    pub fn from_reports(reports: &[ValidationReport], strict: bool) -> Self {
        let mut summary = BatchSummary {
            documents: reports.len(),
            ..Default::default()
        };
        for report in reports {
            if report.passes(strict) {
                summary.passed += 1;
            } else {
                summary.failed += 1;
            }
            summary.errors += report.error_count();
            summary.warnings += report.warning_count();
        }
        summary
    }

    pub fn succeeded(&self) -> bool {
        self.failed == 0
    }
}

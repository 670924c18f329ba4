//! agent-conform: structural conformance checks for agent-definition documents.
//!
//! Agent files are Markdown documents that open with a `---` frontmatter block
//! and are organized into level-2/level-3 sections (metadata, mission,
//! protocols, checklists). This crate checks such files against a rule set:
//!
//! - Frontmatter present, required keys set, values within their predicates
//! - Required sections present, in canonical order
//! - Cross-field consistency (e.g. frontmatter `model` vs. the stated model tier)
//! - File name identifier equals the `Agent ID` in the metadata section
//!
//! # Examples
//!
//! ```bash
//! # Check every agent file under .claude/agents with the built-in rules
//! agent-conform check .claude/agents
//!
//! # Use a project rule set and machine-readable output
//! agent-conform check agents/ --rules rules.toml --format json
//!
//! # Show the canonical section order in effect
//! agent-conform rules show
//! ```
//!
//! # Crate Structure
//!
//! - [`crate::core::validate`]: the pure per-document check
//! - [`crate::core::rules`] / [`crate::core::config`]: rule set schema and resolution
//! - [`crate::core::batch`] / [`crate::core::output`] / [`crate::core::trace`]: running and reporting

pub mod core;

use crate::core::{batch, config, error, output, time, trace};

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

pub use crate::core::document::Document;
pub use crate::core::error::ConformError;
pub use crate::core::report::{Location, Severity, ValidationReport, Violation};
pub use crate::core::rules::RuleSet;
pub use crate::core::validate::validate;

#[derive(Parser, Debug)]
#[clap(
    name = "agent-conform",
    version = env!("CARGO_PKG_VERSION"),
    about = "Structural conformance checker for agent-definition Markdown files"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct CheckCli {
    /// Files or directories to check (directories are searched for *.md).
    #[clap(default_value = ".")]
    paths: Vec<PathBuf>,
    /// Rule file (TOML). Defaults to $AGENT_CONFORM_RULES, then
    /// .agent-conform/rules.toml, then the built-in agent standards.
    #[clap(long)]
    rules: Option<PathBuf>,
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    format: String,
    /// Treat warnings as failures.
    #[clap(long)]
    strict: bool,
    /// Append one JSONL trace event per document to this file.
    #[clap(long)]
    trace_file: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct RulesGroupCli {
    #[clap(subcommand)]
    command: RulesCommand,
}

#[derive(Subcommand, Debug)]
enum RulesCommand {
    /// Print the resolved rule source and the canonical section order.
    Show {
        /// Rule file (TOML) to show instead of the resolved default.
        #[clap(long)]
        rules: Option<PathBuf>,
    },
    /// Print where rules would be loaded from.
    Path {
        #[clap(long)]
        rules: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check agent documents against a rule set.
    Check(CheckCli),
    /// Inspect the rule set in effect.
    Rules(RulesGroupCli),
    /// Print the version.
    Version,
}

pub fn run() -> Result<(), error::ConformError> {
    let cli = Cli::parse();
    let current_dir = std::env::current_dir()?;

    match cli.command {
        Command::Version => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Check(check) => run_check(check, &current_dir),
        Command::Rules(group) => match group.command {
            RulesCommand::Show { rules } => show_rules(rules.as_deref(), &current_dir),
            RulesCommand::Path { rules } => {
                let env_value = std::env::var(config::RULES_ENV).ok();
                let source =
                    config::locate_rules(rules.as_deref(), env_value.as_deref(), &current_dir);
                println!("{}", source);
                Ok(())
            }
        },
    }
}

fn run_check(check: CheckCli, project_root: &Path) -> Result<(), error::ConformError> {
    let json = match check.format.as_str() {
        "text" => false,
        "json" => true,
        other => {
            return Err(error::ConformError::ConfigurationError(format!(
                "unknown format '{}', expected 'text' or 'json'",
                other
            )));
        }
    };

    // Rules are loaded and compiled before any document is read.
    let resolved = config::resolve_rules(check.rules.as_deref(), project_root)?;
    let source = resolved.source.to_string();
    if !json {
        println!("check: running rules={}", source);
    }

    let files = batch::expand_inputs(&check.paths)?;
    let loaded = batch::load_documents(&files);
    for doc in &loaded.documents {
        trace::trace_gate(&doc.id);
    }

    let checked = batch::validate_all(&loaded.documents, &resolved.rules)?;

    if let Some(trace_path) = &check.trace_file {
        let run_id = time::new_event_id();
        let events: Vec<_> = checked
            .iter()
            .map(|c| trace::TraceEvent::for_report(&run_id, &c.document.text, &source, &c.report))
            .collect();
        trace::append_traces(trace_path, &events)?;
    }

    let mut reports: Vec<_> = checked.into_iter().map(|c| c.report).collect();
    reports.extend(loaded.unreadable);
    reports.sort_by(|a, b| a.document.cmp(&b.document));
    let summary = batch::BatchSummary::from_reports(&reports, check.strict);

    if json {
        println!("{}", output::render_json(&reports, &summary, &source)?);
    } else {
        print!("{}", output::render_text(&reports, check.strict));
        println!("{}", output::render_summary(&summary));
    }

    if summary.succeeded() {
        Ok(())
    } else {
        Err(error::ConformError::ValidationError(format!(
            "{} of {} document(s) failed.",
            summary.failed, summary.documents
        )))
    }
}

fn show_rules(explicit: Option<&Path>, project_root: &Path) -> Result<(), error::ConformError> {
    use colored::Colorize;

    let resolved = config::resolve_rules(explicit, project_root)?;
    let rules = &resolved.rules;
    println!("{} {}", "rules:".bright_white(), resolved.source);
    println!(
        "  frontmatter delimiter `{}`, heading levels {:?}",
        rules.delimiter, rules.heading_levels
    );
    println!("{}", "sections (canonical order):".bright_white());
    for (rank, label) in rules.section_labels().enumerate() {
        println!("  {:>2}. {}", rank + 1, label.bright_cyan());
    }
    if !rules.frontmatter.is_empty() {
        println!("{}", "frontmatter:".bright_white());
        for key in &rules.frontmatter {
            let required = if key.required { "required" } else { "optional" };
            match &key.one_of {
                Some(values) => println!("  {} ({}) one of [{}]", key.key, required, values.join(", ")),
                None => println!("  {} ({})", key.key, required),
            }
        }
    }
    if !rules.cross_field.is_empty() {
        println!("{}", "cross-field:".bright_white());
        for rule in &rules.cross_field {
            println!(
                "  {} [{}] {} {:?} {}",
                rule.id,
                rule.severity,
                rule.left.describe(),
                rule.predicate,
                rule.right.describe()
            );
        }
    }
    if let Some(identity) = &rules.identity {
        println!(
            "{} file identifier must equal Agent ID under `{}`",
            "identity:".bright_white(),
            identity.section
        );
    }
    Ok(())
}

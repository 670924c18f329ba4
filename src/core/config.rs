//! Rule set resolution.
//!
//! Resolves which rule file a run uses, in priority order:
//!
//! 1. Explicit path (`--rules`)
//! 2. `AGENT_CONFORM_RULES` environment variable
//! 3. `<root>/.agent-conform/rules.toml`
//! 4. The embedded default rules

use crate::core::assets;
use crate::core::error::ConformError;
use crate::core::rules::RuleSet;
use std::fmt;
use std::path::{Path, PathBuf};

pub const RULES_ENV: &str = "AGENT_CONFORM_RULES";
pub const PROJECT_RULES_PATH: &str = ".agent-conform/rules.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    Flag(PathBuf),
    Env(PathBuf),
    Project(PathBuf),
    Embedded(&'static str),
}

impl fmt::Display for RuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(p) => write!(f, "{} (--rules)", p.display()),
            Self::Env(p) => write!(f, "{} (${})", p.display(), RULES_ENV),
            Self::Project(p) => write!(f, "{} (project)", p.display()),
            Self::Embedded(name) => write!(f, "embedded:{}", name),
        }
    }
}

/// A compiled rule set together with where it came from.
#[derive(Debug, Clone)]
pub struct ResolvedRules {
    pub source: RuleSource,
    pub rules: RuleSet,
}

/// Decide where the rules come from without reading them.
pub fn locate_rules(
    explicit: Option<&Path>,
    env_value: Option<&str>,
    project_root: &Path,
) -> RuleSource {
    if let Some(path) = explicit {
        return RuleSource::Flag(path.to_path_buf());
    }
    if let Some(value) = env_value.map(str::trim).filter(|v| !v.is_empty()) {
        return RuleSource::Env(PathBuf::from(value));
    }
    let project = project_root.join(PROJECT_RULES_PATH);
    if project.is_file() {
        return RuleSource::Project(project);
    }
    RuleSource::Embedded(assets::DEFAULT_RULES)
}

pub fn load_rules(source: &RuleSource) -> Result<RuleSet, ConformError> {
    let content = match source {
        RuleSource::Flag(path) | RuleSource::Env(path) | RuleSource::Project(path) => {
            if !path.is_file() {
                return Err(ConformError::NotFound(format!(
                    "rule file {}",
                    path.display()
                )));
            }
            std::fs::read_to_string(path).map_err(|source| ConformError::ReadError {
                path: path.display().to_string(),
                source,
            })?
        }
        RuleSource::Embedded(name) => assets::get_embedded_rules(name)
            .ok_or_else(|| ConformError::NotFound(format!("embedded rules {}", name)))?
            .to_string(),
    };
    RuleSet::from_toml_str(&content)
}

/// Locate and compile the rule set for a run rooted at `project_root`.
pub fn resolve_rules(
    explicit: Option<&Path>,
    project_root: &Path,
) -> Result<ResolvedRules, ConformError> {
    let env_value = std::env::var(RULES_ENV).ok();
    let source = locate_rules(explicit, env_value.as_deref(), project_root);
    let rules = load_rules(&source)?;
    Ok(ResolvedRules { source, rules })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_path_wins() {
        let tmp = TempDir::new().unwrap();
        let source = locate_rules(Some(Path::new("x.toml")), Some("y.toml"), tmp.path());
        assert_eq!(source, RuleSource::Flag(PathBuf::from("x.toml")));
    }

    #[test]
    fn env_beats_project_file() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join(".agent-conform")).unwrap();
        std::fs::write(tmp.path().join(PROJECT_RULES_PATH), "").unwrap();
        let source = locate_rules(None, Some("y.toml"), tmp.path());
        assert_eq!(source, RuleSource::Env(PathBuf::from("y.toml")));
        let source = locate_rules(None, Some("  "), tmp.path());
        assert_eq!(
            source,
            RuleSource::Project(tmp.path().join(PROJECT_RULES_PATH))
        );
    }

    #[test]
    fn falls_back_to_embedded_rules() {
        let tmp = TempDir::new().unwrap();
        let source = locate_rules(None, None, tmp.path());
        assert_eq!(source, RuleSource::Embedded(assets::DEFAULT_RULES));
        let rules = load_rules(&source).unwrap();
        assert!(rules.sections.len() > 1);
    }

    #[test]
    fn missing_rule_file_is_not_found() {
        let err = load_rules(&RuleSource::Flag(PathBuf::from("/nonexistent/rules.toml")))
            .unwrap_err();
        assert!(matches!(err, ConformError::NotFound(_)));
    }

    #[test]
    fn project_rules_are_compiled() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join(".agent-conform")).unwrap();
        std::fs::write(
            tmp.path().join(PROJECT_RULES_PATH),
            "[[sections]]\nlabel = \"Mission\"\n",
        )
        .unwrap();
        let source = locate_rules(None, None, tmp.path());
        let rules = load_rules(&source).unwrap();
        assert_eq!(rules.section_labels().collect::<Vec<_>>(), vec!["Mission"]);
    }
}

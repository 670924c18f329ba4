//! Structural rule sets.
//!
//! A rule set is authored as TOML (`RuleSetConfig`) and compiled once into an
//! immutable [`RuleSet`]: regexes are built, labels normalized, and every
//! shape error is rejected as a configuration error before any document is
//! looked at.
//!
//! ```toml
//! [document]
//! frontmatter_delimiter = "---"
//! heading_levels = [2, 3]
//!
//! [[sections]]
//! label = "Agent Metadata"
//!
//! [[frontmatter]]
//! key = "model"
//! required = true
//! one_of = ["sonnet", "auto"]
//!
//! [[cross_field]]
//! id = "model_tier"
//! severity = "warning"
//! predicate = "equals_ignore_case"
//! left = { frontmatter = "model" }
//! right = { section = "Agent Metadata", pattern = '(?i)model tier\**:\s*`?([A-Za-z0-9.-]+)' }
//!
//! [identity]
//! section = "Agent Metadata"
//! pattern = '(?i)agent id\**:\s*`?([a-z0-9-]+)'
//! ```

use crate::core::error::ConformError;
use crate::core::report::Severity;
use regex::Regex;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DELIMITER: &str = "---";
pub const DEFAULT_HEADING_LEVELS: [u8; 2] = [2, 3];
pub const DEFAULT_IDENTITY_PATTERN: &str = r"(?i)agent[ _-]?id\**\s*:\s*\**\s*`?([A-Za-z0-9_-]+)`?";

// ===== Authored form =====

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSetConfig {
    #[serde(default)]
    pub document: DocumentConfig,
    #[serde(default)]
    pub sections: Vec<SectionConfig>,
    #[serde(default)]
    pub frontmatter: Vec<FrontmatterKeyConfig>,
    #[serde(default)]
    pub cross_field: Vec<CrossFieldConfig>,
    #[serde(default)]
    pub identity: Option<IdentityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentConfig {
    #[serde(default = "default_delimiter")]
    pub frontmatter_delimiter: String,
    #[serde(default = "default_heading_levels")]
    pub heading_levels: Vec<u8>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            frontmatter_delimiter: default_delimiter(),
            heading_levels: default_heading_levels(),
        }
    }
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

fn default_heading_levels() -> Vec<u8> {
    DEFAULT_HEADING_LEVELS.to_vec()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionConfig {
    pub label: String,
    /// Heading regex; when absent the label is compared case- and
    /// whitespace-insensitively.
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrontmatterKeyConfig {
    pub key: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub one_of: Option<Vec<String>>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub non_empty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrossFieldConfig {
    pub id: String,
    #[serde(default)]
    pub severity: Severity,
    pub predicate: Predicate,
    #[serde(default)]
    pub values: Vec<String>,
    pub left: SourceConfig,
    pub right: SourceConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Equals,
    EqualsIgnoreCase,
    /// Left value appears within the right value.
    Contains,
    /// Both values are members of `values`.
    OneOf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceConfig {
    Frontmatter { frontmatter: String },
    Section { section: String, pattern: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub section: String,
    #[serde(default)]
    pub pattern: Option<String>,
}

fn default_true() -> bool {
    true
}

// ===== Compiled form =====

#[derive(Debug, Clone)]
pub struct SectionRule {
    pub label: String,
    pub(crate) normalized: String,
    pub(crate) pattern: Option<Regex>,
}

impl SectionRule {
    /// Whether a detected heading satisfies this requirement.
    pub fn matches(&self, heading: &str) -> bool {
        match &self.pattern {
            Some(re) => re.is_match(heading.trim()),
            None => normalize_heading(heading) == self.normalized,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrontmatterRule {
    pub key: String,
    pub required: bool,
    pub one_of: Option<Vec<String>>,
    pub pattern: Option<Regex>,
    pub non_empty: bool,
}

impl FrontmatterRule {
    /// Reason the value is rejected, if any.
    pub fn check_value(&self, value: &str) -> Option<String> {
        if self.non_empty && value.trim().is_empty() {
            return Some("value must not be empty".to_string());
        }
        if let Some(allowed) = &self.one_of
            && !allowed.iter().any(|a| a == value)
        {
            return Some(format!("must be one of [{}]", allowed.join(", ")));
        }
        if let Some(re) = &self.pattern
            && !re.is_match(value)
        {
            return Some(format!("must match /{}/", re.as_str()));
        }
        None
    }
}

#[derive(Debug, Clone)]
pub enum ValueSource {
    Frontmatter(String),
    Section { section: String, pattern: Regex },
}

impl ValueSource {
    pub fn describe(&self) -> String {
        match self {
            Self::Frontmatter(key) => format!("frontmatter.{}", key),
            Self::Section { section, .. } => format!("section \"{}\"", section),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrossFieldRule {
    pub id: String,
    pub severity: Severity,
    pub predicate: Predicate,
    pub values: Vec<String>,
    pub left: ValueSource,
    pub right: ValueSource,
}

impl CrossFieldRule {
    pub fn holds(&self, left: &str, right: &str) -> bool {
        let (left, right) = (left.trim(), right.trim());
        match self.predicate {
            Predicate::Equals => left == right,
            Predicate::EqualsIgnoreCase => left.eq_ignore_ascii_case(right),
            Predicate::Contains => right.contains(left),
            Predicate::OneOf => {
                self.values.iter().any(|v| v == left) && self.values.iter().any(|v| v == right)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdentityRule {
    pub section: String,
    pub pattern: Regex,
}

/// Immutable, validated rule set.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub delimiter: String,
    pub heading_levels: Vec<u8>,
    pub sections: Vec<SectionRule>,
    pub frontmatter: Vec<FrontmatterRule>,
    pub cross_field: Vec<CrossFieldRule>,
    pub identity: Option<IdentityRule>,
}

impl RuleSet {
    pub fn from_toml_str(content: &str) -> Result<Self, ConformError> {
        let config: RuleSetConfig = toml::from_str(content)?;
        Self::from_config(&config)
    }

    pub fn from_config(config: &RuleSetConfig) -> Result<Self, ConformError> {
        let doc = &config.document;
        if doc.frontmatter_delimiter.chars().count() != 3 {
            return Err(config_err(format!(
                "frontmatter_delimiter must be exactly 3 characters, got {:?}",
                doc.frontmatter_delimiter
            )));
        }
        if doc.heading_levels.is_empty() {
            return Err(config_err("heading_levels must not be empty"));
        }
        if let Some(bad) = doc.heading_levels.iter().find(|l| !(1..=6).contains(*l)) {
            return Err(config_err(format!("heading level {} is outside 1..=6", bad)));
        }

        if config.sections.is_empty() {
            return Err(config_err("rule set requires at least one section"));
        }
        let mut seen_labels = FxHashSet::default();
        let mut sections = Vec::with_capacity(config.sections.len());
        for s in &config.sections {
            let normalized = normalize_heading(&s.label);
            if normalized.is_empty() {
                return Err(config_err("section label must not be empty"));
            }
            if !seen_labels.insert(normalized.clone()) {
                return Err(config_err(format!("duplicate section label {:?}", s.label)));
            }
            sections.push(SectionRule {
                label: s.label.trim().to_string(),
                normalized,
                pattern: s
                    .pattern
                    .as_deref()
                    .map(|p| compile(p, &format!("section {:?}", s.label)))
                    .transpose()?,
            });
        }

        let mut seen_keys = FxHashSet::default();
        let mut frontmatter = Vec::with_capacity(config.frontmatter.len());
        for f in &config.frontmatter {
            if f.key.trim().is_empty() {
                return Err(config_err("frontmatter key must not be empty"));
            }
            if !seen_keys.insert(f.key.as_str()) {
                return Err(config_err(format!("duplicate frontmatter key {:?}", f.key)));
            }
            if f.one_of.as_ref().is_some_and(|v| v.is_empty()) {
                return Err(config_err(format!(
                    "frontmatter key {:?} has an empty one_of set",
                    f.key
                )));
            }
            frontmatter.push(FrontmatterRule {
                key: f.key.clone(),
                required: f.required,
                one_of: f.one_of.clone(),
                pattern: f
                    .pattern
                    .as_deref()
                    .map(|p| compile(p, &format!("frontmatter key {:?}", f.key)))
                    .transpose()?,
                non_empty: f.non_empty,
            });
        }

        let mut seen_ids = FxHashSet::default();
        let mut cross_field = Vec::with_capacity(config.cross_field.len());
        for c in &config.cross_field {
            if c.id.trim().is_empty() {
                return Err(config_err("cross_field id must not be empty"));
            }
            if !seen_ids.insert(c.id.as_str()) {
                return Err(config_err(format!("duplicate cross_field id {:?}", c.id)));
            }
            if c.predicate == Predicate::OneOf && c.values.is_empty() {
                return Err(config_err(format!(
                    "cross_field {:?} uses one_of without values",
                    c.id
                )));
            }
            cross_field.push(CrossFieldRule {
                id: c.id.clone(),
                severity: c.severity,
                predicate: c.predicate,
                values: c.values.clone(),
                left: compile_source(&c.left, &c.id)?,
                right: compile_source(&c.right, &c.id)?,
            });
        }

        let identity = match &config.identity {
            Some(id) if id.enabled => Some(IdentityRule {
                section: id.section.clone(),
                pattern: compile_extractor(
                    id.pattern.as_deref().unwrap_or(DEFAULT_IDENTITY_PATTERN),
                    "identity",
                )?,
            }),
            _ => None,
        };

        Ok(RuleSet {
            delimiter: doc.frontmatter_delimiter.clone(),
            heading_levels: doc.heading_levels.clone(),
            sections,
            frontmatter,
            cross_field,
            identity,
        })
    }

    /// Required section labels in canonical order.
    pub fn section_labels(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.label.as_str())
    }

    pub fn find_section(&self, label: &str) -> Option<&SectionRule> {
        let normalized = normalize_heading(label);
        self.sections.iter().find(|s| s.normalized == normalized)
    }
}

/// Lowercase and collapse runs of whitespace.
pub fn normalize_heading(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn config_err(msg: impl Into<String>) -> ConformError {
    ConformError::ConfigurationError(msg.into())
}

fn compile(pattern: &str, owner: &str) -> Result<Regex, ConformError> {
    Regex::new(pattern).map_err(|e| config_err(format!("invalid pattern for {}: {}", owner, e)))
}

/// Extraction patterns must expose the value as capture group 1.
fn compile_extractor(pattern: &str, owner: &str) -> Result<Regex, ConformError> {
    let re = compile(pattern, owner)?;
    if re.captures_len() < 2 {
        return Err(config_err(format!(
            "pattern for {} needs a capture group",
            owner
        )));
    }
    Ok(re)
}

fn compile_source(source: &SourceConfig, owner: &str) -> Result<ValueSource, ConformError> {
    match source {
        SourceConfig::Frontmatter { frontmatter } => Ok(ValueSource::Frontmatter(frontmatter.clone())),
        SourceConfig::Section { section, pattern } => Ok(ValueSource::Section {
            section: section.clone(),
            pattern: compile_extractor(pattern, &format!("cross_field {:?}", owner))?,
        }),
    }
}

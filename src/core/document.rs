//! Documents and their structural skeleton.

use crate::core::frontmatter::{self, Frontmatter};
use crate::core::rules::{RuleSet, normalize_heading};
use std::path::Path;

/// Raw text of one agent file plus its file-name-derived identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// Build a document whose identifier is derived from `path`'s file name.
    pub fn from_path(path: &Path, text: impl Into<String>) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        Self::new(agent_id_from_file_name(name), text)
    }
}

/// `API Contract_Agent.md` -> `api-contract-agent`.
pub fn agent_id_from_file_name(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    let mut out = String::with_capacity(stem.len());
    for c in stem.trim().chars() {
        let c = if c.is_whitespace() || c == '_' { '-' } else { c };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.extend(c.to_lowercase());
    }
    out.trim_matches('-').to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub text: String,
    pub level: u8,
    /// Byte offset of the heading line within the document.
    pub offset: usize,
    /// Byte offset just past the heading line.
    pub body_start: usize,
    /// 1-based line number.
    pub line: usize,
}

/// Per-call structural view of a document. Never mutated after `parse`.
#[derive(Debug, Clone)]
pub struct ParsedDocument<'a> {
    /// Document text without a leading byte-order mark; heading offsets
    /// index into this.
    pub text: &'a str,
    pub frontmatter: Frontmatter,
    pub headings: Vec<Heading>,
    pub agent_id: Option<String>,
}

impl<'a> ParsedDocument<'a> {
    pub fn parse(document: &'a Document, rules: &RuleSet) -> Self {
        let text = document.text.strip_prefix('\u{feff}').unwrap_or(document.text.as_str());
        let frontmatter = frontmatter::split_frontmatter(text, &rules.delimiter);
        let headings = detect_headings(text, frontmatter.line_count, &rules.heading_levels);
        let mut parsed = ParsedDocument {
            text,
            frontmatter,
            headings,
            agent_id: None,
        };
        if let Some(identity) = &rules.identity {
            parsed.agent_id = parsed
                .section_text(&identity.section, rules)
                .and_then(|body| identity.pattern.captures(body))
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string());
        }
        parsed
    }

    /// First heading whose text matches `label`, using the rule set's notion
    /// of a match when the label is a required section.
    pub fn find_heading(&self, label: &str, rules: &RuleSet) -> Option<usize> {
        match rules.find_section(label) {
            Some(rule) => self.headings.iter().position(|h| rule.matches(&h.text)),
            None => {
                let wanted = normalize_heading(label);
                self.headings
                    .iter()
                    .position(|h| normalize_heading(&h.text) == wanted)
            }
        }
    }

    /// Text under the heading at `idx`, up to the next heading of the same or
    /// a higher level.
    pub fn body_at(&self, idx: usize) -> &'a str {
        let heading = &self.headings[idx];
        let end = self.headings[idx + 1..]
            .iter()
            .find(|h| h.level <= heading.level)
            .map(|h| h.offset)
            .unwrap_or(self.text.len());
        &self.text[heading.body_start..end]
    }

    pub fn section_text(&self, label: &str, rules: &RuleSet) -> Option<&'a str> {
        self.find_heading(label, rules).map(|idx| self.body_at(idx))
    }
}

/// ATX headings at the given levels, skipping the first `skip_lines` lines and
/// anything inside fenced code blocks.
pub fn detect_headings(text: &str, skip_lines: usize, levels: &[u8]) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut fence: Option<(char, usize)> = None;
    let mut offset = 0usize;

    for (idx, raw) in text.split_inclusive('\n').enumerate() {
        let start = offset;
        offset += raw.len();
        if idx < skip_lines {
            continue;
        }
        let line = raw.trim_end_matches(['\n', '\r']);

        if let Some(marker) = fence_marker(line) {
            match fence {
                None => fence = Some(marker),
                Some((ch, len)) if marker.0 == ch && marker.1 >= len && is_closing_fence(line) => {
                    fence = None
                }
                Some(_) => {}
            }
            continue;
        }
        if fence.is_some() {
            continue;
        }

        if let Some((level, heading_text)) = parse_atx_heading(line)
            && levels.contains(&level)
        {
            headings.push(Heading {
                text: heading_text.to_string(),
                level,
                offset: start,
                body_start: offset,
                line: idx + 1,
            });
        }
    }

    headings
}

fn leading_spaces_ok(line: &str) -> Option<&str> {
    let trimmed = line.trim_start_matches(' ');
    (line.len() - trimmed.len() <= 3).then_some(trimmed)
}

fn fence_marker(line: &str) -> Option<(char, usize)> {
    let trimmed = leading_spaces_ok(line)?;
    let ch = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = trimmed.chars().take_while(|c| *c == ch).count();
    (len >= 3).then_some((ch, len))
}

fn is_closing_fence(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.chars().all(|c| c == '`' || c == '~')
}

fn parse_atx_heading(line: &str) -> Option<(u8, &str)> {
    let trimmed = leading_spaces_ok(line)?;
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    let mut text = rest.trim();
    let without_closing = text.trim_end_matches('#');
    if without_closing.is_empty() || without_closing.ends_with([' ', '\t']) {
        text = without_closing.trim_end();
    }
    Some((hashes as u8, text))
}

//! Delimited `key: value` block at the top of an agent document.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontmatterStatus {
    Present,
    /// The first line is not the opening delimiter.
    Missing,
    /// The opening delimiter has no matching closing line.
    Unterminated,
}

#[derive(Debug, Clone)]
pub struct Frontmatter {
    pub status: FrontmatterStatus,
    pub fields: BTreeMap<String, String>,
    /// `(line number, raw line)` for every line that is not `key: value`.
    pub malformed_lines: Vec<(usize, String)>,
    /// Number of leading lines the block occupies, delimiters included.
    pub line_count: usize,
}

impl Frontmatter {
    fn empty(status: FrontmatterStatus) -> Self {
        Self {
            status,
            fields: BTreeMap::new(),
            malformed_lines: Vec::new(),
            line_count: 0,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Split the leading frontmatter block out of `text`.
///
/// Line numbers in `malformed_lines` are 1-based and count from the top of the
/// document, so they can be reported as-is.
pub fn split_frontmatter(text: &str, delimiter: &str) -> Frontmatter {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let lines: Vec<&str> = text.lines().collect();

    if lines.first().map(|l| l.trim_end()) != Some(delimiter) {
        return Frontmatter::empty(FrontmatterStatus::Missing);
    }

    let end_idx = lines
        .iter()
        .enumerate()
        .skip(1)
        .find_map(|(i, line)| (line.trim() == delimiter).then_some(i));

    let Some(end_idx) = end_idx else {
        return Frontmatter::empty(FrontmatterStatus::Unterminated);
    };

    let mut fm = Frontmatter::empty(FrontmatterStatus::Present);
    fm.line_count = end_idx + 1;
    let mut current_list_key: Option<String> = None;

    for (idx, raw_line) in lines[1..end_idx].iter().enumerate() {
        let line_num = idx + 2;
        let line = raw_line.trim_end();
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(item) = trimmed.strip_prefix("- ") {
            match current_list_key.as_ref().and_then(|k| fm.fields.get_mut(k)) {
                Some(existing) => {
                    if !existing.is_empty() {
                        existing.push_str(", ");
                    }
                    existing.push_str(strip_quotes(item));
                }
                None => fm.malformed_lines.push((line_num, line.to_string())),
            }
            continue;
        }

        let Some((key, value)) = parse_key_value(line) else {
            fm.malformed_lines.push((line_num, line.to_string()));
            current_list_key = None;
            continue;
        };

        if value.is_empty() {
            current_list_key = Some(key.to_string());
        } else {
            current_list_key = None;
        }
        fm.fields
            .insert(key.to_string(), strip_quotes(value).to_string());
    }

    fm
}

fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return None;
    }
    Some((key, value.trim()))
}

fn strip_quotes(value: &str) -> &str {
    let value = value.trim();
    if value.len() >= 2 {
        let bytes = value.as_bytes();
        let (first, last) = (bytes[0], bytes[value.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

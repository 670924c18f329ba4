//! Structural conformance check for a single agent document.
//!
//! `validate` is a pure function of `(document, rule_set)`: it never touches
//! the filesystem, never prints, and always runs every check so one report
//! carries every problem. Malformed input is reported as violations; the only
//! error is a rule set that cannot be used.
//!
//! Check order (and therefore emission order):
//!
//! 1. Frontmatter block present and terminated
//! 2. Required frontmatter keys and their value predicates
//! 3. Heading skeleton (levels from the rule set, fenced code ignored)
//! 4. Required sections present, in canonical order
//! 5. Cross-field consistency rules
//! 6. File identifier vs. the metadata `Agent ID`

use crate::core::document::{Document, ParsedDocument};
use crate::core::error::ConformError;
use crate::core::frontmatter::FrontmatterStatus;
use crate::core::report::{Location, Severity, ValidationReport, Violation, ViolationSink, codes};
use crate::core::rules::{CrossFieldRule, RuleSet, ValueSource};

pub fn validate(document: &Document, rules: &RuleSet) -> Result<ValidationReport, ConformError> {
    if rules.sections.is_empty() {
        return Err(ConformError::ConfigurationError(
            "rule set requires at least one section".into(),
        ));
    }

    let parsed = ParsedDocument::parse(document, rules);
    let mut sink = ViolationSink::new();

    check_frontmatter_block(&parsed, rules, &mut sink);
    check_frontmatter_keys(&parsed, rules, &mut sink);
    check_sections(&parsed, rules, &mut sink);
    check_cross_fields(&parsed, rules, &mut sink);
    check_identity(document, &parsed, rules, &mut sink);

    Ok(sink.finish(document.id.clone()))
}

fn check_frontmatter_block(parsed: &ParsedDocument<'_>, rules: &RuleSet, sink: &mut ViolationSink) {
    match parsed.frontmatter.status {
        FrontmatterStatus::Present => {
            for (line, raw) in &parsed.frontmatter.malformed_lines {
                sink.push(Violation::warning(
                    codes::MALFORMED_FRONTMATTER_LINE,
                    Location::Line { line: *line },
                    format!("Frontmatter line is not `key: value`: {}", raw.trim()),
                ));
            }
        }
        FrontmatterStatus::Missing => sink.push(Violation::error(
            codes::MISSING_FRONTMATTER,
            Location::Line { line: 1 },
            format!(
                "Document must open with a `{}` frontmatter block",
                rules.delimiter
            ),
        )),
        FrontmatterStatus::Unterminated => sink.push(Violation::error(
            codes::UNTERMINATED_FRONTMATTER,
            Location::Line { line: 1 },
            format!(
                "Frontmatter block opened with `{}` is never closed",
                rules.delimiter
            ),
        )),
    }
}

fn check_frontmatter_keys(parsed: &ParsedDocument<'_>, rules: &RuleSet, sink: &mut ViolationSink) {
    for rule in &rules.frontmatter {
        let location = Location::Frontmatter {
            key: rule.key.clone(),
        };
        match parsed.frontmatter.get(&rule.key) {
            None if rule.required => sink.push(Violation::error(
                codes::MISSING_FRONTMATTER_KEY,
                location,
                format!("Required frontmatter key `{}` is missing", rule.key),
            )),
            None => {}
            Some(value) => {
                if let Some(reason) = rule.check_value(value) {
                    sink.push(Violation::error(
                        codes::INVALID_FRONTMATTER_VALUE,
                        location,
                        format!("Frontmatter `{}: {}` {}", rule.key, value, reason),
                    ));
                }
            }
        }
    }
}

/// Presence and canonical order of the required sections.
///
/// Each label is placed at its first matching heading. The longest run of
/// placed labels whose headings already ascend in canonical order is kept as
/// the anchor; every other placed label is out of order. A single moved
/// section is therefore the only one reported, whichever direction it moved.
fn check_sections(parsed: &ParsedDocument<'_>, rules: &RuleSet, sink: &mut ViolationSink) {
    let placed: Vec<Option<usize>> = rules
        .sections
        .iter()
        .map(|section| parsed.headings.iter().position(|h| section.matches(&h.text)))
        .collect();
    let anchored = ordered_anchor(&placed);

    for (rank, section) in rules.sections.iter().enumerate() {
        let location = Location::Section {
            name: section.label.clone(),
        };
        match placed[rank] {
            None => sink.push(Violation::error(
                codes::MISSING_SECTION,
                location,
                format!("Required section `{}` is missing", section.label),
            )),
            Some(_) if anchored[rank] => {}
            Some(idx) => sink.push(Violation::error(
                codes::SECTION_OUT_OF_ORDER,
                location,
                format!(
                    "Section `{}` (line {}) is out of canonical order",
                    section.label, parsed.headings[idx].line
                ),
            )),
        }
    }
}

/// Marks the ranks that form the longest strictly ascending run of heading
/// positions. Ties go to the run that keeps earlier canonical ranks.
fn ordered_anchor(placed: &[Option<usize>]) -> Vec<bool> {
    let mut length = vec![0usize; placed.len()];
    let mut prev: Vec<Option<usize>> = vec![None; placed.len()];

    for (i, slot) in placed.iter().enumerate() {
        let Some(pos) = *slot else { continue };
        length[i] = 1;
        for (j, earlier) in placed[..i].iter().enumerate() {
            if let Some(earlier) = *earlier
                && earlier < pos
                && length[j] + 1 > length[i]
            {
                length[i] = length[j] + 1;
                prev[i] = Some(j);
            }
        }
    }

    let mut anchored = vec![false; placed.len()];
    let mut best: Option<usize> = None;
    for (i, len) in length.iter().enumerate() {
        if *len > 0 && best.is_none_or(|b| *len > length[b]) {
            best = Some(i);
        }
    }
    while let Some(i) = best {
        anchored[i] = true;
        best = prev[i];
    }
    anchored
}

fn check_cross_fields(parsed: &ParsedDocument<'_>, rules: &RuleSet, sink: &mut ViolationSink) {
    for rule in &rules.cross_field {
        let left = resolve(&rule.left, parsed, rules);
        let right = resolve(&rule.right, parsed, rules);
        let message = match (left, right) {
            (Some(l), Some(r)) if rule.holds(&l, &r) => continue,
            (Some(l), Some(r)) => format!(
                "{} `{}` does not satisfy {:?} against {} `{}`",
                rule.left.describe(),
                l,
                rule.predicate,
                rule.right.describe(),
                r
            ),
            (None, _) => format!("Could not resolve {}", rule.left.describe()),
            (_, None) => format!("Could not resolve {}", rule.right.describe()),
        };
        sink.push(cross_field_violation(rule, message));
    }
}

fn cross_field_violation(rule: &CrossFieldRule, message: String) -> Violation {
    let location = match &rule.right {
        ValueSource::Section { section, .. } => Location::Section {
            name: section.clone(),
        },
        ValueSource::Frontmatter(key) => Location::Frontmatter { key: key.clone() },
    };
    match rule.severity {
        Severity::Error => Violation::error(&rule.id, location, message),
        Severity::Warning => Violation::warning(&rule.id, location, message),
    }
}

fn resolve(source: &ValueSource, parsed: &ParsedDocument<'_>, rules: &RuleSet) -> Option<String> {
    match source {
        ValueSource::Frontmatter(key) => parsed.frontmatter.get(key).map(str::to_string),
        ValueSource::Section { section, pattern } => parsed
            .section_text(section, rules)
            .and_then(|body| pattern.captures(body))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string()),
    }
}

fn check_identity(
    document: &Document,
    parsed: &ParsedDocument<'_>,
    rules: &RuleSet,
    sink: &mut ViolationSink,
) {
    let Some(identity) = &rules.identity else {
        return;
    };
    let location = Location::Section {
        name: identity.section.clone(),
    };
    match parsed.agent_id.as_deref() {
        Some(id) if id == document.id => {}
        Some(id) => sink.push(Violation::error(
            codes::ID_MISMATCH,
            location,
            format!(
                "Agent ID `{}` does not match file identifier `{}`",
                id, document.id
            ),
        )),
        None => sink.push(Violation::error(
            codes::ID_MISMATCH,
            location,
            format!(
                "No Agent ID found under `{}` to match file identifier `{}`",
                identity.section, document.id
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &str = r#"
[[sections]]
label = "Mission"

[[sections]]
label = "Agent Metadata"

[[sections]]
label = "Handoff Protocol"

[[frontmatter]]
key = "name"
required = true

[[frontmatter]]
key = "model"
required = true
one_of = ["sonnet", "auto"]

[identity]
section = "Agent Metadata"
"#;

    fn rules() -> RuleSet {
        RuleSet::from_toml_str(RULES).unwrap()
    }

    fn doc(id: &str, model: &str, body: &str) -> Document {
        Document::new(id, format!("---\nname: {id}\nmodel: {model}\n---\n{body}"))
    }

    const GOOD_BODY: &str = "# Agent\n\n## Mission\nShip it.\n\n## Agent Metadata\n- **Agent ID**: api-contract-agent\n\n## Notes\n\n## Handoff Protocol\n```json\n{}\n```\n";

    #[test]
    fn conforming_document_passes_clean() {
        let report = validate(&doc("api-contract-agent", "sonnet", GOOD_BODY), &rules()).unwrap();
        assert!(report.pass);
        assert!(report.violations.is_empty(), "{:?}", report.violations);
    }

    #[test]
    fn missing_section_is_reported_once() {
        let body = GOOD_BODY.replace("## Mission\n", "");
        let report = validate(&doc("api-contract-agent", "sonnet", &body), &rules()).unwrap();
        let missing: Vec<_> = report.by_rule(codes::MISSING_SECTION).collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(
            missing[0].location,
            Location::Section {
                name: "Mission".into()
            }
        );
        assert!(!report.pass);
    }

    #[test]
    fn swapped_sections_are_out_of_order() {
        let body = "## Agent Metadata\nAgent ID: api-contract-agent\n## Mission\n## Handoff Protocol\n";
        let report = validate(&doc("api-contract-agent", "sonnet", body), &rules()).unwrap();
        let rules_hit: Vec<_> = report.violations.iter().map(|v| v.rule.as_str()).collect();
        assert_eq!(rules_hit, vec![codes::SECTION_OUT_OF_ORDER]);
        assert_eq!(
            report.violations[0].location,
            Location::Section {
                name: "Agent Metadata".into()
            }
        );
    }

    #[test]
    fn first_section_moved_to_the_end_is_the_only_one_flagged() {
        let rules = RuleSet::from_toml_str(
            "[[sections]]\nlabel = \"A\"\n[[sections]]\nlabel = \"B\"\n[[sections]]\nlabel = \"C\"\n[[sections]]\nlabel = \"D\"\n",
        )
        .unwrap();
        let document = Document::new("x", "---\nname: x\n---\n## B\n## C\n## D\n## A\n");
        let report = validate(&document, &rules).unwrap();
        let flagged: Vec<_> = report.violations.iter().map(|v| v.location.clone()).collect();
        assert_eq!(flagged, vec![Location::Section { name: "A".into() }]);
        assert_eq!(report.violations[0].rule, codes::SECTION_OUT_OF_ORDER);
        assert!(report.violations[0].message.contains("line 7"));
    }

    #[test]
    fn ordered_anchor_keeps_the_longest_ascending_run() {
        assert_eq!(ordered_anchor(&[Some(3), Some(0), Some(1), Some(2)]), vec![false, true, true, true]);
        assert_eq!(ordered_anchor(&[Some(1), Some(0), Some(2)]), vec![true, false, true]);
        assert_eq!(ordered_anchor(&[Some(0), None, Some(1)]), vec![true, false, true]);
        assert_eq!(ordered_anchor(&[None, None]), vec![false, false]);
    }

    #[test]
    fn byte_order_mark_before_the_first_heading() {
        let rules = RuleSet::from_toml_str(
            "[[sections]]\nlabel = \"A\"\n[[sections]]\nlabel = \"B\"\n",
        )
        .unwrap();
        let document = Document::new("x", "\u{feff}## A\n## B\n");
        let report = validate(&document, &rules).unwrap();
        let hit: Vec<_> = report.violations.iter().map(|v| v.rule.as_str()).collect();
        assert_eq!(hit, vec![codes::MISSING_FRONTMATTER]);
    }

    #[test]
    fn invalid_enum_value() {
        let report = validate(&doc("api-contract-agent", "opus", GOOD_BODY), &rules()).unwrap();
        let invalid: Vec<_> = report.by_rule(codes::INVALID_FRONTMATTER_VALUE).collect();
        assert_eq!(invalid.len(), 1);
        assert_eq!(
            invalid[0].location,
            Location::Frontmatter {
                key: "model".into()
            }
        );
    }

    #[test]
    fn missing_frontmatter_still_checks_everything() {
        let document = Document::new("api-contract-agent", "## Mission\n## Handoff Protocol\n");
        let report = validate(&document, &rules()).unwrap();
        let hit: Vec<_> = report.violations.iter().map(|v| v.rule.as_str()).collect();
        assert_eq!(
            hit,
            vec![
                codes::MISSING_FRONTMATTER,
                codes::MISSING_FRONTMATTER_KEY,
                codes::MISSING_FRONTMATTER_KEY,
                codes::MISSING_SECTION,
                codes::ID_MISMATCH,
            ]
        );
    }

    #[test]
    fn identifier_mismatch() {
        let ok = validate(&doc("api-contract-agent", "sonnet", GOOD_BODY), &rules()).unwrap();
        assert_eq!(ok.by_rule(codes::ID_MISMATCH).count(), 0);
        let bad = validate(&doc("foo-agent", "sonnet", GOOD_BODY), &rules()).unwrap();
        assert_eq!(bad.by_rule(codes::ID_MISMATCH).count(), 1);
    }

    #[test]
    fn cross_field_uses_configured_severity() {
        let rules = RuleSet::from_toml_str(&format!(
            "{RULES}\n[[cross_field]]\nid = \"model_tier\"\nseverity = \"warning\"\npredicate = \"equals_ignore_case\"\nleft = {{ frontmatter = \"model\" }}\nright = {{ section = \"Agent Metadata\", pattern = '(?i)model tier\\**:\\s*`?([A-Za-z0-9.-]+)' }}\n"
        ))
        .unwrap();
        let body = GOOD_BODY.replace(
            "- **Agent ID**: api-contract-agent\n",
            "- **Agent ID**: api-contract-agent\n- **Model Tier**: Opus\n",
        );
        let report = validate(&doc("api-contract-agent", "sonnet", &body), &rules).unwrap();
        assert!(report.pass);
        let drift: Vec<_> = report.by_rule("model_tier").collect();
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].severity, Severity::Warning);

        let body = body.replace("Opus", "Sonnet");
        let report = validate(&doc("api-contract-agent", "sonnet", &body), &rules).unwrap();
        assert!(report.violations.is_empty(), "{:?}", report.violations);
    }

    #[test]
    fn empty_rule_set_fails_fast() {
        let mut empty = rules();
        empty.sections.clear();
        let err = validate(&doc("a", "sonnet", GOOD_BODY), &empty).unwrap_err();
        assert!(matches!(err, ConformError::ConfigurationError(_)));
    }

    #[test]
    fn validation_is_deterministic() {
        let document = doc("foo-agent", "opus", "## Handoff Protocol\n## Mission\n");
        let a = serde_json::to_string(&validate(&document, &rules()).unwrap()).unwrap();
        let b = serde_json::to_string(&validate(&document, &rules()).unwrap()).unwrap();
        assert_eq!(a, b);
    }
}

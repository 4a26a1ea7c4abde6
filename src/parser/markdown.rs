//! Minimal markdown tokenizer shared by intent (`.ic`) and validation
//! (`.icv`) parsing (base spec §4.1, component C1).
//!
//! Produces an ordered sequence of sections (header level 1-6, title,
//! trimmed body) plus a flat metadata map harvested from `key: value` lines
//! that appear directly in a section body (not inside a parameter bullet
//! list, and not inside a fenced code block).

use std::collections::BTreeMap;

/// One `#`..`######` delimited section of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub level: u8,
    pub title: String,
    pub content: String,
}

/// A parsed document: ordered sections plus harvested metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub sections: Vec<Section>,
    pub metadata: BTreeMap<String, String>,
}

/// Parse `text` into a `Document`.
///
/// Header level is the count of leading `#` characters followed by a
/// space; `#notaheader` is body, not a header. Levels beyond 6 degrade to
/// body text. Fenced code blocks (```` ``` ````) toggle an "inside code"
/// state; `#`-prefixed lines inside a code block are body, never headers.
pub fn parse(text: &str) -> Document {
    let mut sections: Vec<Section> = Vec::new();
    let mut current_level: u8 = 0;
    let mut current_title = String::new();
    let mut current_body: Vec<&str> = Vec::new();
    let mut inside_code = false;

    let flush = |sections: &mut Vec<Section>,
                 level: u8,
                 title: &str,
                 body: &[&str]| {
        if level == 0 && title.is_empty() && body.iter().all(|l| l.trim().is_empty()) {
            return;
        }
        sections.push(Section {
            level,
            title: title.to_string(),
            content: body.join("\n").trim().to_string(),
        });
    };

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            inside_code = !inside_code;
            current_body.push(line);
            continue;
        }

        if !inside_code {
            if let Some((level, title)) = header_level_and_title(line) {
                flush(&mut sections, current_level, &current_title, &current_body);
                current_level = level;
                current_title = title;
                current_body = Vec::new();
                continue;
            }
        }

        current_body.push(line);
    }
    flush(&mut sections, current_level, &current_title, &current_body);

    let metadata = harvest_metadata(&sections);

    Document { sections, metadata }
}

/// Returns `Some((level, title))` when `line` is a valid header line: 1-6
/// leading `#` characters followed by a literal space, then the title.
fn header_level_and_title(line: &str) -> Option<(u8, String)> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    let title = rest.strip_prefix(' ')?;
    Some((hashes as u8, title.trim().to_string()))
}

/// A bullet parameter line: `- key: value`.
fn parameter_line(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix("- ")?;
    let (key, value) = rest.split_once(':')?;
    let key = key.trim();
    if key.is_empty() || key.chars().any(|c| c.is_whitespace()) {
        return None;
    }
    Some((key, value.trim()))
}

/// A bare metadata line: `key: value` where `key` contains no whitespace,
/// is not itself a bullet parameter line.
fn metadata_line(line: &str) -> Option<(&str, &str)> {
    if line.trim_start().starts_with('-') {
        return None;
    }
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() || key.chars().any(|c| c.is_whitespace()) {
        return None;
    }
    Some((key, value.trim()))
}

fn harvest_metadata(sections: &[Section]) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    for section in sections {
        for line in section.content.lines() {
            if let Some((key, value)) = metadata_line(line) {
                metadata.insert(key.to_string(), value.to_string());
            }
        }
    }
    metadata
}

/// A typed parameter value harvested from a `- key: value` bullet list.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    String(String),
    List(Vec<String>),
}

/// Parse a `### Parameters`-style bullet block (consecutive `- key: value`
/// lines) into a key -> typed-value map, preserving insertion order.
pub fn parse_parameter_block(content: &str) -> Vec<(String, ParamValue)> {
    let mut params = Vec::new();
    for line in content.lines() {
        if let Some((key, raw_value)) = parameter_line(line) {
            params.push((key.to_string(), parse_param_value(raw_value)));
        }
    }
    params
}

fn parse_param_value(raw: &str) -> ParamValue {
    let trimmed = raw.trim();
    if trimmed == "true" {
        return ParamValue::Bool(true);
    }
    if trimmed == "false" {
        return ParamValue::Bool(false);
    }
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        if let Ok(serde_json::Value::Array(items)) = serde_json::from_str(trimmed) {
            let list = items
                .into_iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect();
            return ParamValue::List(list);
        }
    }
    ParamValue::String(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_into_sections_by_header_level() {
        let doc = parse("# Title\nbody\n## Sub\nmore\n");
        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.sections[0].level, 1);
        assert_eq!(doc.sections[0].title, "Title");
        assert_eq!(doc.sections[0].content, "body");
        assert_eq!(doc.sections[1].level, 2);
        assert_eq!(doc.sections[1].title, "Sub");
    }

    #[test]
    fn not_a_header_without_space() {
        let doc = parse("#notaheader\nbody");
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].level, 0);
        assert!(doc.sections[0].content.contains("#notaheader"));
    }

    #[test]
    fn levels_above_six_degrade_to_body() {
        let doc = parse("####### too deep\ntext");
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].level, 0);
    }

    #[test]
    fn fenced_code_block_suppresses_headers() {
        let doc = parse("# Real\n```\n# not a header\n```\nafter");
        assert_eq!(doc.sections.len(), 1);
        assert!(doc.sections[0].content.contains("# not a header"));
    }

    #[test]
    fn harvests_bare_key_value_metadata() {
        let doc = parse("# T\nType: FileCheck\nHidden: true\n");
        assert_eq!(doc.metadata.get("Type").map(String::as_str), Some("FileCheck"));
        assert_eq!(doc.metadata.get("Hidden").map(String::as_str), Some("true"));
    }

    #[test]
    fn parameter_block_parses_bool_string_and_list() {
        let params = parse_parameter_block(
            "- exists: true\n- file: out/a.out\n- contains_files: [\"a.txt\", \"b.txt\"]\n",
        );
        assert_eq!(params[0], ("exists".to_string(), ParamValue::Bool(true)));
        assert_eq!(
            params[1],
            ("file".to_string(), ParamValue::String("out/a.out".to_string()))
        );
        assert_eq!(
            params[2],
            (
                "contains_files".to_string(),
                ParamValue::List(vec!["a.txt".to_string(), "b.txt".to_string()])
            )
        );
    }

    #[test]
    fn round_trip_stability_for_recognized_subset() {
        let text = "# Feature: a\nDepends On: b, c\n## Intent\nDo the thing.\n";
        let doc1 = parse(text);
        let doc2 = parse(text);
        assert_eq!(doc1, doc2);
    }
}

//! `.ic` intent file grammar (base spec §3 "Intent", §6 "Intent file
//! grammar") built on top of the generic markdown tokenizer.

use std::path::{Path, PathBuf};

use crate::error::IntentcError;
use crate::parser::markdown::{self, Document};

/// One parsed `.ic` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub name: String,
    pub dependencies: Vec<String>,
    pub raw_content: String,
    pub file_path: PathBuf,
}

impl Intent {
    /// Parse `path`'s contents as an intent for feature `name`.
    pub fn parse_file(name: &str, path: &Path) -> Result<Intent, IntentcError> {
        let raw_content = std::fs::read_to_string(path)?;
        Ok(Intent::parse_str(name, &raw_content, path.to_path_buf()))
    }

    /// Parse already-read `raw_content`. Exposed directly for tests and for
    /// round-trip-stability checks that don't want to touch disk twice.
    pub fn parse_str(name: &str, raw_content: &str, file_path: PathBuf) -> Intent {
        let document = markdown::parse(raw_content);
        let dependencies = extract_dependencies(raw_content, &document);
        Intent {
            name: name.to_string(),
            dependencies,
            raw_content: raw_content.to_string(),
            file_path,
        }
    }
}

/// Dependencies come from either an immediately-recognized `Depends On:`
/// line (comma-separated) or a `## Dependencies` section whose body is a
/// bullet list of names. Either form yields the same ordered, deduplicated
/// sequence.
fn extract_dependencies(raw_content: &str, document: &Document) -> Vec<String> {
    if let Some(names) = depends_on_line(raw_content) {
        return dedup_preserve_order(names);
    }

    for section in &document.sections {
        if section.title.eq_ignore_ascii_case("Dependencies") {
            let names = section
                .content
                .lines()
                .filter_map(|line| line.trim_start().strip_prefix("- "))
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect::<Vec<_>>();
            return dedup_preserve_order(names);
        }
    }

    Vec::new()
}

fn depends_on_line(raw_content: &str) -> Option<Vec<String>> {
    for line in raw_content.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("Depends On:") {
            let names = rest
                .split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect::<Vec<_>>();
            return Some(names);
        }
    }
    None
}

fn dedup_preserve_order(names: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

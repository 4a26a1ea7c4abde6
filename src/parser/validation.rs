//! `.icv` validation file grammar (base spec §3 "ValidationFile", §4.8,
//! §6 "Validation file grammar").

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::IntentcError;
use crate::parser::markdown;
pub use crate::parser::markdown::ParamValue;

/// The closed set of recognized check types (base spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckType {
    FileCheck,
    FolderCheck,
    CommandLineCheck,
    WebCheck,
    ProjectCheck,
}

impl CheckType {
    /// Parses case-insensitively, as required by §4.8 ("case-insensitive on
    /// input").
    pub fn parse(tag: &str) -> Option<CheckType> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "filecheck" => Some(CheckType::FileCheck),
            "foldercheck" => Some(CheckType::FolderCheck),
            "commandlinecheck" => Some(CheckType::CommandLineCheck),
            "webcheck" => Some(CheckType::WebCheck),
            "projectcheck" => Some(CheckType::ProjectCheck),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckType::FileCheck => "FileCheck",
            CheckType::FolderCheck => "FolderCheck",
            CheckType::CommandLineCheck => "CommandLineCheck",
            CheckType::WebCheck => "WebCheck",
            CheckType::ProjectCheck => "ProjectCheck",
        }
    }
}

/// One declared check, parsed from a level-2 section of an `.icv` file.
#[derive(Debug, Clone)]
pub struct Validation {
    pub name: String,
    pub check_type: CheckType,
    pub description: String,
    pub parameters: BTreeMap<String, ParamValue>,
    pub hidden: bool,
}

impl Validation {
    pub fn param_str(&self, key: &str) -> Option<&str> {
        match self.parameters.get(key) {
            Some(ParamValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn param_bool(&self, key: &str) -> Option<bool> {
        match self.parameters.get(key) {
            Some(ParamValue::Bool(b)) => Some(*b),
            Some(ParamValue::String(s)) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn param_i64(&self, key: &str) -> Option<i64> {
        match self.parameters.get(key) {
            Some(ParamValue::String(s)) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn param_list(&self, key: &str) -> Option<&[String]> {
        match self.parameters.get(key) {
            Some(ParamValue::List(items)) => Some(items.as_slice()),
            _ => None,
        }
    }
}

/// One `.icv` file: an ordered sequence of `Validation` records.
#[derive(Debug, Clone)]
pub struct ValidationFile {
    pub file_path: PathBuf,
    pub validations: Vec<Validation>,
}

impl ValidationFile {
    pub fn parse_file(path: &Path) -> Result<ValidationFile, IntentcError> {
        let raw = std::fs::read_to_string(path)?;
        ValidationFile::parse_str(&raw, path.to_path_buf())
    }

    pub fn parse_str(raw: &str, file_path: PathBuf) -> Result<ValidationFile, IntentcError> {
        let document = markdown::parse(raw);
        let mut validations = Vec::new();

        let mut index = 0;
        while index < document.sections.len() {
            let section = &document.sections[index];
            if section.level != 2 {
                index += 1;
                continue;
            }

            // Gather the immediate level-3 subsections (Parameters,
            // Description) until the next level-2-or-shallower header.
            let mut subsection_end = index + 1;
            while subsection_end < document.sections.len()
                && document.sections[subsection_end].level > 2
            {
                subsection_end += 1;
            }

            let own_metadata = markdown::parse(&section.content).metadata;
            let type_tag = own_metadata.get("Type").ok_or_else(|| {
                IntentcError::Discovery(format!(
                    "validation '{}' in {} is missing a Type: line",
                    section.title,
                    file_path.display()
                ))
            })?;
            let check_type = CheckType::parse(type_tag).ok_or_else(|| {
                IntentcError::Discovery(format!(
                    "validation '{}' in {} has unrecognized type '{}'",
                    section.title,
                    file_path.display(),
                    type_tag
                ))
            })?;
            let hidden = own_metadata
                .get("Hidden")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false);

            let mut parameters = BTreeMap::new();
            let mut description = String::new();
            for sub in &document.sections[index + 1..subsection_end] {
                if sub.title.eq_ignore_ascii_case("Parameters") {
                    for (key, value) in markdown::parse_parameter_block(&sub.content) {
                        parameters.insert(key, value);
                    }
                } else if sub.title.eq_ignore_ascii_case("Description") {
                    description = sub.content.trim().to_string();
                }
            }

            validations.push(Validation {
                name: section.title.clone(),
                check_type,
                description,
                parameters,
                hidden,
            });

            index = subsection_end;
        }

        Ok(ValidationFile {
            file_path,
            validations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
## Output file exists
Type: FileCheck

### Parameters
- file: out/t.out
- exists: true

### Description
The build must produce an output file.

## Hidden smoke check
Type: FileCheck
Hidden: true

### Parameters
- file: out/missing.out
- exists: true

### Description
Never actually passes; used to test hidden-but-counted semantics.
";

    #[test]
    fn parses_multiple_checks_with_parameters_and_description() {
        let file = ValidationFile::parse_str(SAMPLE, PathBuf::from("t.icv")).unwrap();
        assert_eq!(file.validations.len(), 2);

        let first = &file.validations[0];
        assert_eq!(first.name, "Output file exists");
        assert_eq!(first.check_type, CheckType::FileCheck);
        assert!(!first.hidden);
        assert_eq!(first.param_str("file"), Some("out/t.out"));
        assert_eq!(first.param_bool("exists"), Some(true));
        assert!(first.description.contains("output file"));

        let second = &file.validations[1];
        assert!(second.hidden);
    }

    #[test]
    fn type_tag_is_case_insensitive() {
        assert_eq!(CheckType::parse("filecheck"), Some(CheckType::FileCheck));
        assert_eq!(CheckType::parse("FILECHECK"), Some(CheckType::FileCheck));
        assert_eq!(CheckType::parse("bogus"), None);
    }

    #[test]
    fn missing_type_tag_is_an_error() {
        let text = "## No type here\n### Description\nWhoops.\n";
        let result = ValidationFile::parse_str(text, PathBuf::from("bad.icv"));
        assert!(result.is_err());
    }
}

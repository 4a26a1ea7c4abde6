//! Persisted data model for the state manager (base spec §3, §4.5).

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Record of one agent invocation for a target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildResult {
    pub target: String,
    pub generation_id: String,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    pub generated_at: String,
    pub files: Vec<String>,
    #[serde(default)]
    pub build_name: Option<String>,
    #[serde(default)]
    pub build_path: Option<PathBuf>,
    /// Dependency name -> the `generation_id` it was at when this result was
    /// recorded. Implements the "staleness vs. dependency commit identity"
    /// open question (base spec §9) — see DESIGN.md.
    #[serde(default)]
    pub dep_generation_ids: BTreeMap<String, String>,
}

/// Build status vocabulary (base spec §3, §6: "any other string observed in
/// `status.json` is treated as `pending`").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    Pending,
    Building,
    Built,
    Failed,
    Outdated,
}

impl<'de> Deserialize<'de> for TargetStatus {
    fn deserialize<D>(deserializer: D) -> Result<TargetStatus, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(TargetStatus::from_str(&raw))
    }
}

impl TargetStatus {
    pub fn from_str(raw: &str) -> TargetStatus {
        match raw {
            "pending" => TargetStatus::Pending,
            "building" => TargetStatus::Building,
            "built" => TargetStatus::Built,
            "failed" => TargetStatus::Failed,
            "outdated" => TargetStatus::Outdated,
            _ => TargetStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetStatus::Pending => "pending",
            TargetStatus::Building => "building",
            TargetStatus::Built => "built",
            TargetStatus::Failed => "failed",
            TargetStatus::Outdated => "outdated",
        }
    }
}

/// The persisted `status.json` shape: target name -> status.
pub type StatusMap = BTreeMap<String, TargetStatus>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_status_string_degrades_to_pending() {
        assert_eq!(TargetStatus::from_str("bogus"), TargetStatus::Pending);
        assert_eq!(TargetStatus::from_str("built"), TargetStatus::Built);
    }

    #[test]
    fn build_result_round_trips_through_json() {
        let result = BuildResult {
            target: "a".to_string(),
            generation_id: "g1".to_string(),
            success: true,
            error: None,
            generated_at: "1700000000Z".to_string(),
            files: vec!["out/a.out".to_string()],
            build_name: None,
            build_path: None,
            dep_generation_ids: BTreeMap::new(),
        };
        let json = serde_json::to_string(&result).unwrap();
        let parsed: BuildResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, parsed);
    }
}

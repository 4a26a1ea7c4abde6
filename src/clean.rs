//! Cleaner (base spec §4.9, component C9).
//!
//! Removes generated output, either for one target and its transitive
//! dependents or for an entire named build. Best-effort and defensive the
//! way the teacher's workspace cleanup helpers are: a missing path is not an
//! error, only a path that exists but can't be removed is.

use std::fs;
use std::path::{Path, PathBuf};

use crate::dag::DependencyDag;
use crate::error::IntentcError;
use crate::registry::TargetRegistry;
use crate::state::{StateManager, TargetStatus};

/// What `clean` removed, for the CLI's report.
#[derive(Debug, Clone, Default)]
pub struct CleanReport {
    pub removed: Vec<PathBuf>,
    pub dry_run: bool,
}

pub struct Cleaner<'a> {
    registry: &'a TargetRegistry,
    dag: &'a DependencyDag,
    state: &'a StateManager,
}

impl<'a> Cleaner<'a> {
    pub fn new(registry: &'a TargetRegistry, dag: &'a DependencyDag, state: &'a StateManager) -> Cleaner<'a> {
        Cleaner { registry, dag, state }
    }

    fn remove_path(path: &Path, dry_run: bool, report: &mut CleanReport) -> Result<(), IntentcError> {
        if !path.exists() {
            return Ok(());
        }
        if !dry_run {
            if path.is_dir() {
                fs::remove_dir_all(path)?;
            } else {
                fs::remove_file(path)?;
            }
        }
        report.removed.push(path.to_path_buf());
        Ok(())
    }

    fn target_output_dir(&self, target: &str) -> Result<PathBuf, IntentcError> {
        let info = self
            .registry
            .get(target)
            .ok_or_else(|| IntentcError::NotFound(format!("target '{target}' is not registered")))?;
        Ok(info
            .intent_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| self.registry.project_root().to_path_buf()))
    }

    /// Resolve `target`'s transitive dependents (base spec §4.9: target
    /// mode), and for each delete the files recorded in its latest
    /// `BuildResult` (silent on already-missing) and reset its status to
    /// `pending`. Dry-run reports the plan without touching disk or state.
    pub fn clean_target(
        &self,
        target: &str,
        build_name: Option<&str>,
        dry_run: bool,
    ) -> Result<CleanReport, IntentcError> {
        // Confirm the requested target exists before fanning out.
        self.registry
            .get(target)
            .ok_or_else(|| IntentcError::NotFound(format!("target '{target}' is not registered")))?;

        let mut report = CleanReport {
            removed: Vec::new(),
            dry_run,
        };

        for affected in self.dag.find_affected_nodes(target) {
            let output_dir = self.target_output_dir(&affected)?;
            if let Some(latest) = self.state.get_latest_build_result(&affected, build_name)? {
                for file in &latest.files {
                    Self::remove_path(&output_dir.join(file), dry_run, &mut report)?;
                }
            }
            if !dry_run {
                self.state.set_status(&affected, TargetStatus::Pending, build_name)?;
            }
        }

        Ok(report)
    }

    /// Remove an entire named build's state tree (`.intentc/state/builds/<name>`).
    pub fn clean_build(&self, build_name: &str, dry_run: bool) -> Result<CleanReport, IntentcError> {
        let mut report = CleanReport {
            removed: Vec::new(),
            dry_run,
        };
        let path = self
            .registry
            .project_root()
            .join(".intentc")
            .join("state")
            .join("builds")
            .join(build_name);
        Self::remove_path(&path, dry_run, &mut report)?;
        Ok(report)
    }
}

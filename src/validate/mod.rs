//! Validation runner (base spec §4.8, component C8).
//!
//! Runs every check declared in a target's `.icv` files and tallies the
//! result, mirroring the pass/fail/info bookkeeping in the teacher's own
//! gate harness (`src/core/validate.rs`). `parallel` dispatches through
//! `rayon`; sequential mode is the default and is what the CLI uses when
//! `config.yaml`'s `build.parallel` is unset.
//!
//! Checks marked `Hidden: true` are never executed — they exist to probe
//! whether an agent special-cased the declared checks rather than actually
//! satisfying the intent — but they are still counted toward `total`, so a
//! report's `total` can exceed `results.len()` (base spec §4.8, scenario
//! S5).

pub mod checks;

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use rayon::prelude::*;

use crate::agent::{Agent, BuildContext};
use crate::error::IntentcError;
use crate::parser::validation::Validation;
use crate::registry::TargetRegistry;
use checks::RunResult;

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub parallel: bool,
    pub timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> RunOptions {
        RunOptions {
            parallel: false,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Tallied outcome of a validation run for one target.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub target: String,
    /// Results for checks that actually ran; excludes hidden checks.
    pub results: Vec<RunResult>,
    /// All checks declared for the target, hidden or not.
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Check name -> error message, for checks that errored out rather
    /// than producing a pass/fail verdict (e.g. a missing parameter). A
    /// single bad check never aborts its siblings (base spec §7).
    pub errors: BTreeMap<String, String>,
}

impl ValidationReport {
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.errors.is_empty()
    }
}

fn build_context(registry: &TargetRegistry, target: &str, target_dir: &Path, timeout: Duration) -> BuildContext {
    let info = registry.get(target).expect("target looked up before building context");
    let mut dependency_outputs = BTreeMap::new();
    for dep in &info.intent.dependencies {
        if let Some(dep_info) = registry.get(dep) {
            if let Some(parent) = dep_info.intent_path.parent() {
                dependency_outputs.insert(dep.clone(), parent.to_path_buf());
            }
        }
    }
    BuildContext {
        target: target.to_string(),
        project_root: registry.project_root().to_path_buf(),
        intent: info.intent.clone(),
        dependency_outputs,
        output_dir: target_dir.to_path_buf(),
        timeout,
    }
}

/// Run every non-hidden validation attached to `target` in `registry`
/// against its output directory (`<project_root>/intent/<target>/`).
pub fn run_for_target(
    registry: &TargetRegistry,
    target: &str,
    options: RunOptions,
    agent: &dyn Agent,
) -> Result<ValidationReport, IntentcError> {
    let info = registry
        .get(target)
        .ok_or_else(|| IntentcError::NotFound(format!("target '{target}' is not registered")))?;

    let all: Vec<&Validation> = info.validations.iter().flat_map(|f| f.validations.iter()).collect();
    let total = all.len();
    let runnable: Vec<&Validation> = all.into_iter().filter(|v| !v.hidden).collect();

    let target_dir = info
        .intent_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| registry.project_root().to_path_buf());
    let ctx = build_context(registry, target, &target_dir, options.timeout);

    tracing::debug!(%target, total, runnable = runnable.len(), parallel = options.parallel, "running validation checks");

    let outcomes: Vec<(String, Result<RunResult, IntentcError>)> = if options.parallel {
        runnable
            .par_iter()
            .map(|v| (v.name.clone(), checks::run_check(v, &target_dir, agent, &ctx)))
            .collect()
    } else {
        runnable
            .iter()
            .map(|v| (v.name.clone(), checks::run_check(v, &target_dir, agent, &ctx)))
            .collect()
    };

    let mut results = Vec::new();
    let mut errors = BTreeMap::new();
    for (name, outcome) in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(err) => {
                errors.insert(name, err.to_string());
            }
        }
    }

    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;
    tracing::debug!(%target, passed, failed, errors = errors.len(), "validation run complete");

    Ok(ValidationReport {
        target: target.to_string(),
        results,
        total,
        passed,
        failed,
        errors,
    })
}

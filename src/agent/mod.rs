//! Agent contract (base spec §4.6, component C6).
//!
//! The engine treats the AI agent as an opaque subprocess capability: give
//! it an intent and its dependencies' outputs, get back generated files or
//! a failure. Grounded on the teacher's static dispatch-table pattern for
//! subsystem fan-out (`src/subsystems.rs`) and its subprocess conventions
//! (`src/core/workspace.rs`).

pub mod cli_adapter;
pub mod mock;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::IntentcError;
use crate::parser::validation::Validation;
use crate::parser::Intent;

/// Everything an agent invocation needs besides the target's own intent.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub target: String,
    pub project_root: PathBuf,
    pub intent: Intent,
    /// Dependency name -> path to that dependency's latest generated output
    /// directory, so the agent can read what it depends on.
    pub dependency_outputs: BTreeMap<String, PathBuf>,
    pub output_dir: PathBuf,
    pub timeout: Duration,
}

/// Outcome of a single `generate`/`decompile` invocation.
#[derive(Debug, Clone)]
pub struct AgentOutput {
    /// Paths (relative to `BuildContext::output_dir`) the agent produced.
    pub files: Vec<String>,
    pub log: String,
}

/// Outcome of a `validate` invocation: a pass/fail verdict plus the agent's
/// free-form explanation, distinct from the structured `validate` runner
/// (component C8) which checks concrete files/commands/URLs.
#[derive(Debug, Clone)]
pub struct AgentValidation {
    pub passed: bool,
    pub message: String,
    /// Set when the adapter cannot perform this specific check at all (e.g.
    /// a generic CLI agent asked to judge a URL it has no way to reach).
    /// Base spec §4.8: adapters that can't perform the check report a
    /// sentinel meaning "skip, report passed-with-note" rather than fail
    /// the check outright. `passed` is always `true` alongside this.
    pub skipped: bool,
}

/// The contract every agent backend implements (base spec §4.6: Generate,
/// Validate, Decompile).
pub trait Agent: Send + Sync {
    /// Produce the target's output files from its intent.
    fn generate(&self, ctx: &BuildContext) -> Result<AgentOutput, IntentcError>;

    /// Judge whether `ctx`'s output satisfies `check` — the delegation
    /// point for the validation runner's agent-backed check types,
    /// `WebCheck` and `ProjectCheck` (base spec §4.8).
    fn validate(&self, ctx: &BuildContext, check: &Validation) -> Result<AgentValidation, IntentcError>;

    /// Reverse-engineer an intent description from existing output — the
    /// inverse of `generate`, used to backfill `.ic` files for code that
    /// predates intentc.
    fn decompile(&self, ctx: &BuildContext) -> Result<String, IntentcError>;
}

/// Select a backend from `config.yaml`'s `agent` block: `mock` (the
/// default, used for tests and dry demos) or any other provider name, which
/// requires `agent.command` to be set and shells out through [`CliAgent`].
pub fn from_config(config: &crate::config::AgentConfig) -> Result<Box<dyn Agent>, IntentcError> {
    match config.provider.as_str() {
        "mock" => Ok(Box::new(mock::MockAgent::new())),
        other => {
            let command = config.command.clone().ok_or_else(|| {
                IntentcError::Agent(format!(
                    "agent provider '{other}' requires 'agent.command' to be set in config.yaml"
                ))
            })?;
            Ok(Box::new(cli_adapter::CliAgent::new(
                command,
                config.cli_args.clone(),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Intent;
    use std::path::PathBuf;

    pub fn sample_context(target: &str) -> BuildContext {
        BuildContext {
            target: target.to_string(),
            project_root: PathBuf::from("/tmp/project"),
            intent: Intent {
                name: target.to_string(),
                dependencies: Vec::new(),
                raw_content: "# Target\n\nDo the thing.\n".to_string(),
                file_path: PathBuf::from(format!("/tmp/project/intent/{target}/{target}.ic")),
            },
            dependency_outputs: BTreeMap::new(),
            output_dir: PathBuf::from(format!("/tmp/project/intent/{target}")),
            timeout: Duration::from_secs(30),
        }
    }
}

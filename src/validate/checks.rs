//! Concrete check implementations (base spec §4.8: FileCheck, FolderCheck,
//! CommandLineCheck, WebCheck, ProjectCheck).
//!
//! Grounded on the teacher's gate-harness shape in `src/core/validate.rs`
//! (a tally of pass/fail/info per gate) and its `Command::new(...).output()`
//! subprocess convention for anything that shells out. The two agent-backed
//! check types (`WebCheck`, `ProjectCheck`) delegate to `Agent::validate`
//! instead, per base spec §4.8 ("delegated to the agent's Validate").

use std::io::Read;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::agent::{Agent, BuildContext};
use crate::error::IntentcError;
use crate::parser::validation::{CheckType, Validation};

/// Outcome of running a single validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub name: String,
    pub check_type: CheckType,
    pub passed: bool,
    pub message: String,
}

/// Execute `validation` against `target_dir` (the intent's own output
/// directory), depending on its check type. `agent` and `ctx` are consulted
/// by the two agent-backed check types, `WebCheck` and `ProjectCheck`, both
/// of which are judged against the whole project rather than one target's
/// output directory.
pub fn run_check(
    validation: &Validation,
    target_dir: &Path,
    agent: &dyn Agent,
    ctx: &BuildContext,
) -> Result<RunResult, IntentcError> {
    let (passed, message) = match validation.check_type {
        CheckType::FileCheck => run_file_check(validation, target_dir),
        CheckType::FolderCheck => run_folder_check(validation, target_dir),
        CheckType::CommandLineCheck => run_command_check(validation, target_dir, ctx.timeout),
        CheckType::ProjectCheck => run_agent_check(agent, ctx, validation),
        CheckType::WebCheck => run_agent_check(agent, ctx, validation),
    }?;
    Ok(RunResult {
        name: validation.name.clone(),
        check_type: validation.check_type,
        passed,
        message,
    })
}

fn require_param(validation: &Validation, key: &str) -> Result<String, IntentcError> {
    validation.param_str(key).map(str::to_string).ok_or_else(|| {
        IntentcError::Validation(format!(
            "check '{}' is missing required parameter '{key}'",
            validation.name
        ))
    })
}

fn run_file_check(validation: &Validation, target_dir: &Path) -> Result<(bool, String), IntentcError> {
    let rel_path = require_param(validation, "file")?;
    let path = target_dir.join(&rel_path);
    let exists = path.is_file();
    let expect_exists = validation.param_bool("exists").unwrap_or(true);
    if exists != expect_exists {
        return Ok((
            false,
            format!(
                "file '{}' {}, expected it to {}",
                path.display(),
                if exists { "exists" } else { "does not exist" },
                if expect_exists { "exist" } else { "not exist" }
            ),
        ));
    }
    if expect_exists {
        if let Some(needle) = validation.param_str("contains") {
            let content = std::fs::read_to_string(&path)?;
            if !content.contains(needle) {
                return Ok((
                    false,
                    format!("file '{}' does not contain '{needle}'", path.display()),
                ));
            }
        }
    }
    Ok((true, format!("file '{}' satisfies check", path.display())))
}

fn run_folder_check(validation: &Validation, target_dir: &Path) -> Result<(bool, String), IntentcError> {
    let rel_path = require_param(validation, "folder")?;
    let path = target_dir.join(&rel_path);
    let exists = path.is_dir();
    let expect_exists = validation.param_bool("exists").unwrap_or(true);
    if exists != expect_exists {
        return Ok((
            false,
            format!(
                "folder '{}' {}, expected it to {}",
                path.display(),
                if exists { "exists" } else { "does not exist" },
                if expect_exists { "exist" } else { "not exist" }
            ),
        ));
    }
    if !expect_exists {
        return Ok((true, format!("folder '{}' satisfies check", path.display())));
    }

    if let Some(members) = validation.param_list("contains_files") {
        for member in members {
            if !path.join(member).is_file() {
                return Ok((
                    false,
                    format!("folder '{}' is missing required member '{member}'", path.display()),
                ));
            }
        }
    }

    if let Some(min_files) = validation.param_i64("min_files") {
        let count = std::fs::read_dir(&path)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .count() as i64;
        if count < min_files {
            return Ok((
                false,
                format!(
                    "folder '{}' has {count} file(s), expected at least {min_files}",
                    path.display()
                ),
            ));
        }
    }

    Ok((true, format!("folder '{}' satisfies check", path.display())))
}

fn run_command_check(
    validation: &Validation,
    cwd: &Path,
    timeout: Duration,
) -> Result<(bool, String), IntentcError> {
    let command_line = require_param(validation, "command")?;
    let expect_exit_code = validation.param_i64("exit_code").unwrap_or(0);
    let expect_output = validation.param_str("output_contains");
    let expect_error = validation.param_str("error_contains");

    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(&command_line)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let output = run_command_with_timeout(&mut cmd, timeout)?;

    let code = output.status.code().unwrap_or(-1) as i64;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if code != expect_exit_code {
        return Ok((
            false,
            format!("command '{command_line}' exited with {code}, expected {expect_exit_code}"),
        ));
    }
    if let Some(needle) = expect_output {
        if !stdout.contains(needle) {
            return Ok((
                false,
                format!("command '{command_line}' stdout did not contain '{needle}'"),
            ));
        }
    }
    if let Some(needle) = expect_error {
        if !stderr.contains(needle) {
            return Ok((
                false,
                format!("command '{command_line}' stderr did not contain '{needle}'"),
            ));
        }
    }
    Ok((true, format!("command '{command_line}' satisfies check")))
}

/// Poll-loop subprocess runner with a kill-on-timeout, mirroring
/// `agent::cli_adapter::run_with_timeout` for the same reason: a hung
/// command check must not hang the whole validation run.
fn run_command_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, IntentcError> {
    let mut child = cmd
        .spawn()
        .map_err(|e| IntentcError::Validation(format!("failed to spawn check command: {e}")))?;
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            let mut stdout = Vec::new();
            let mut stderr = Vec::new();
            if let Some(mut out) = child.stdout.take() {
                out.read_to_end(&mut stdout)?;
            }
            if let Some(mut err) = child.stderr.take() {
                err.read_to_end(&mut stderr)?;
            }
            return Ok(Output { status, stdout, stderr });
        }
        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(IntentcError::Validation(format!(
                "check command timed out after {timeout:?}"
            )));
        }
        thread::sleep(Duration::from_millis(20));
    }
}

fn run_agent_check(
    agent: &dyn Agent,
    ctx: &BuildContext,
    validation: &Validation,
) -> Result<(bool, String), IntentcError> {
    let result = agent.validate(ctx, validation)?;
    Ok((result.passed, result.message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::mock::MockAgent;
    use crate::parser::validation::ParamValue;
    use crate::parser::Intent;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn validation(check_type: CheckType, params: &[(&str, ParamValue)]) -> Validation {
        Validation {
            name: "check".to_string(),
            check_type,
            description: String::new(),
            parameters: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
            hidden: false,
        }
    }

    fn sample_ctx(dir: &Path) -> BuildContext {
        BuildContext {
            target: "t".to_string(),
            project_root: dir.to_path_buf(),
            intent: Intent {
                name: "t".to_string(),
                dependencies: Vec::new(),
                raw_content: "# t\n\nDo it.\n".to_string(),
                file_path: dir.join("t.ic"),
            },
            dependency_outputs: BTreeMap::new(),
            output_dir: dir.to_path_buf(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn file_check_passes_when_file_exists_and_contains_needle() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("out.txt"), "hello world").unwrap();
        let v = validation(
            CheckType::FileCheck,
            &[
                ("file", ParamValue::String("out.txt".to_string())),
                ("contains", ParamValue::String("world".to_string())),
            ],
        );
        let agent = MockAgent::new();
        let ctx = sample_ctx(dir.path());
        let result = run_check(&v, dir.path(), &agent, &ctx).unwrap();
        assert!(result.passed);
    }

    #[test]
    fn file_check_fails_when_file_missing() {
        let dir = tempdir().unwrap();
        let v = validation(
            CheckType::FileCheck,
            &[("file", ParamValue::String("missing.txt".to_string()))],
        );
        let agent = MockAgent::new();
        let ctx = sample_ctx(dir.path());
        let result = run_check(&v, dir.path(), &agent, &ctx).unwrap();
        assert!(!result.passed);
    }

    #[test]
    fn file_check_honors_exists_false_for_absence_assertions() {
        let dir = tempdir().unwrap();
        let v = validation(
            CheckType::FileCheck,
            &[
                ("file", ParamValue::String("missing.txt".to_string())),
                ("exists", ParamValue::Bool(false)),
            ],
        );
        let agent = MockAgent::new();
        let ctx = sample_ctx(dir.path());
        let result = run_check(&v, dir.path(), &agent, &ctx).unwrap();
        assert!(result.passed);

        std::fs::write(dir.path().join("missing.txt"), "now it's here").unwrap();
        let result = run_check(&v, dir.path(), &agent, &ctx).unwrap();
        assert!(!result.passed);
    }

    #[test]
    fn folder_check_enforces_minimum_file_count() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("out")).unwrap();
        std::fs::write(dir.path().join("out/a.txt"), "x").unwrap();
        let v = validation(
            CheckType::FolderCheck,
            &[
                ("folder", ParamValue::String("out".to_string())),
                ("min_files", ParamValue::String("2".to_string())),
            ],
        );
        let agent = MockAgent::new();
        let ctx = sample_ctx(dir.path());
        let result = run_check(&v, dir.path(), &agent, &ctx).unwrap();
        assert!(!result.passed);
    }

    #[test]
    fn folder_check_enforces_contains_files() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("out")).unwrap();
        std::fs::write(dir.path().join("out/a.txt"), "x").unwrap();
        let v = validation(
            CheckType::FolderCheck,
            &[
                ("folder", ParamValue::String("out".to_string())),
                (
                    "contains_files",
                    ParamValue::List(vec!["a.txt".to_string(), "b.txt".to_string()]),
                ),
            ],
        );
        let agent = MockAgent::new();
        let ctx = sample_ctx(dir.path());
        let result = run_check(&v, dir.path(), &agent, &ctx).unwrap();
        assert!(!result.passed);

        std::fs::write(dir.path().join("out/b.txt"), "y").unwrap();
        let result = run_check(&v, dir.path(), &agent, &ctx).unwrap();
        assert!(result.passed);
    }

    #[test]
    fn command_line_check_matches_exit_code() {
        let dir = tempdir().unwrap();
        let v = validation(
            CheckType::CommandLineCheck,
            &[("command", ParamValue::String("exit 0".to_string()))],
        );
        let agent = MockAgent::new();
        let ctx = sample_ctx(dir.path());
        let result = run_check(&v, dir.path(), &agent, &ctx).unwrap();
        assert!(result.passed);
    }

    #[test]
    fn command_line_check_honors_error_contains() {
        let dir = tempdir().unwrap();
        let v = validation(
            CheckType::CommandLineCheck,
            &[
                ("command", ParamValue::String("echo oops 1>&2".to_string())),
                ("error_contains", ParamValue::String("oops".to_string())),
            ],
        );
        let agent = MockAgent::new();
        let ctx = sample_ctx(dir.path());
        let result = run_check(&v, dir.path(), &agent, &ctx).unwrap();
        assert!(result.passed);

        let v = validation(
            CheckType::CommandLineCheck,
            &[
                ("command", ParamValue::String("echo oops 1>&2".to_string())),
                ("error_contains", ParamValue::String("never happens".to_string())),
            ],
        );
        let result = run_check(&v, dir.path(), &agent, &ctx).unwrap();
        assert!(!result.passed);
    }

    #[test]
    fn web_and_project_checks_delegate_to_the_agent() {
        let dir = tempdir().unwrap();
        let agent = MockAgent::new();
        let ctx = sample_ctx(dir.path());

        let web = validation(CheckType::WebCheck, &[]);
        let result = run_check(&web, dir.path(), &agent, &ctx).unwrap();
        assert!(result.passed);

        let project = validation(CheckType::ProjectCheck, &[]);
        let result = run_check(&project, dir.path(), &agent, &ctx).unwrap();
        assert!(result.passed);
    }

    #[test]
    fn missing_required_parameter_is_a_validation_error() {
        let dir = tempdir().unwrap();
        let v = validation(CheckType::FileCheck, &[]);
        let agent = MockAgent::new();
        let ctx = sample_ctx(dir.path());
        let result = run_check(&v, dir.path(), &agent, &ctx);
        assert!(result.is_err());
    }
}

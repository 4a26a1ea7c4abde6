//! Generic subprocess agent adapter (base spec §4.6, §6 `agent.command`).
//!
//! Invokes `{command} {subcommand} --target <name> --intent <path> --output
//! <dir> {cli_args}` and polls for completion rather than blocking on
//! `Child::wait`, so a hung agent process can be killed once `timeout`
//! elapses (base spec §5: agent calls are bounded by a timeout). Grounded
//! on the teacher's subprocess-shelling convention in `src/core/workspace.rs`.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::agent::{Agent, AgentOutput, AgentValidation, BuildContext};
use crate::error::IntentcError;
use crate::parser::markdown::ParamValue;
use crate::parser::validation::Validation;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct CliAgent {
    pub command: String,
    pub cli_args: Vec<String>,
}

impl CliAgent {
    pub fn new(command: String, cli_args: Vec<String>) -> CliAgent {
        CliAgent { command, cli_args }
    }

    fn run(&self, subcommand: &str, ctx: &BuildContext, extra_args: &[String]) -> Result<Output, IntentcError> {
        let mut cmd = Command::new(&self.command);
        cmd.arg(subcommand)
            .arg("--target")
            .arg(&ctx.target)
            .arg("--intent")
            .arg(&ctx.intent.file_path)
            .arg("--output")
            .arg(&ctx.output_dir)
            .args(extra_args)
            .args(&self.cli_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        run_with_timeout(&mut cmd, ctx.timeout)
    }

    fn run_ok(&self, subcommand: &str, ctx: &BuildContext) -> Result<Output, IntentcError> {
        let output = self.run(subcommand, ctx, &[])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IntentcError::Agent(format!(
                "agent {subcommand} for '{}' exited with {}: {stderr}",
                ctx.target, output.status
            )));
        }
        Ok(output)
    }
}

/// Flags describing a declared check, forwarded to a generic CLI agent's
/// `validate` subcommand: `--check-type <type>` plus a repeated
/// `--param key=value` per declared parameter.
fn check_args(check: &Validation) -> Vec<String> {
    let mut args = vec!["--check-type".to_string(), check.check_type.as_str().to_string()];
    for (key, value) in &check.parameters {
        args.push("--param".to_string());
        args.push(format!("{key}={}", param_value_to_string(value)));
    }
    args
}

fn param_value_to_string(value: &ParamValue) -> String {
    match value {
        ParamValue::Bool(b) => b.to_string(),
        ParamValue::String(s) => s.clone(),
        ParamValue::List(items) => items.join(","),
    }
}

fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, IntentcError> {
    let mut child = cmd
        .spawn()
        .map_err(|e| IntentcError::Agent(format!("failed to spawn agent process: {e}")))?;
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
            return Err(IntentcError::Agent(format!(
                "agent process timed out after {timeout:?}"
            )));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Everything the agent wrote to `output_dir` during `generate`/`decompile`,
/// relative to it, sorted for determinism.
fn list_output_files(output_dir: &PathBuf) -> Result<Vec<String>, IntentcError> {
    let mut files = Vec::new();
    if !output_dir.exists() {
        return Ok(files);
    }
    for entry in fs::read_dir(output_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    files.sort();
    Ok(files)
}

impl Agent for CliAgent {
    fn generate(&self, ctx: &BuildContext) -> Result<AgentOutput, IntentcError> {
        fs::create_dir_all(&ctx.output_dir)?;
        let output = self.run_ok("generate", ctx)?;
        Ok(AgentOutput {
            files: list_output_files(&ctx.output_dir)?,
            log: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }

    fn validate(&self, ctx: &BuildContext, check: &Validation) -> Result<AgentValidation, IntentcError> {
        let output = self.run("validate", ctx, &check_args(check))?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if let Some(note) = stdout.strip_prefix("SKIP:") {
            return Ok(AgentValidation {
                passed: true,
                message: note.trim().to_string(),
                skipped: true,
            });
        }
        Ok(AgentValidation {
            passed: output.status.success(),
            message: stdout,
            skipped: false,
        })
    }

    fn decompile(&self, ctx: &BuildContext) -> Result<String, IntentcError> {
        let output = self.run_ok("decompile", ctx)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

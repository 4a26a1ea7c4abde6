//! Git-backed `VcsBackend`, shelling out to the `git` binary.
//!
//! Grounded on the subprocess-shelling convention the teacher uses for its
//! own worktree/git plumbing: `Command::new("git").args([...]).output()`,
//! checking `status.success()` and surfacing stderr on failure.

use std::path::Path;
use std::process::Command;

use crate::error::IntentcError;
use crate::vcs::{CommitLogEntry, VcsBackend, VcsStatus};

#[derive(Debug, Default)]
pub struct GitBackend;

impl GitBackend {
    pub fn new() -> GitBackend {
        GitBackend
    }

    fn run(&self, path: &Path, args: &[&str]) -> Result<std::process::Output, IntentcError> {
        Command::new("git")
            .arg("-C")
            .arg(path)
            .args(args)
            .output()
            .map_err(IntentcError::Io)
    }

    fn run_ok(&self, path: &Path, args: &[&str], what: &str) -> Result<String, IntentcError> {
        tracing::debug!(%what, args = ?args, "running git command");
        let output = self.run(path, args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(%what, %stderr, "git command failed");
            return Err(IntentcError::Vcs(format!("{what} failed: {stderr}")));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl VcsBackend for GitBackend {
    fn is_repo(&self, path: &Path) -> bool {
        self.run(path, &["rev-parse", "--is-inside-work-tree"])
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn init(&self, path: &Path) -> Result<(), IntentcError> {
        if self.is_repo(path) {
            return Ok(());
        }
        self.run_ok(path, &["init"], "git init")?;
        Ok(())
    }

    fn add(&self, path: &Path, files: &[String]) -> Result<(), IntentcError> {
        if files.is_empty() {
            return Ok(());
        }
        let mut args: Vec<&str> = vec!["add", "--"];
        args.extend(files.iter().map(String::as_str));
        self.run_ok(path, &args, "git add")?;
        Ok(())
    }

    fn commit(&self, path: &Path, message: &str) -> Result<String, IntentcError> {
        self.run_ok(path, &["commit", "-m", message, "--allow-empty"], "git commit")?;
        self.current_commit(path)
    }

    fn current_branch(&self, path: &Path) -> Result<String, IntentcError> {
        self.run_ok(path, &["rev-parse", "--abbrev-ref", "HEAD"], "git rev-parse")
    }

    fn current_commit(&self, path: &Path) -> Result<String, IntentcError> {
        self.run_ok(path, &["rev-parse", "HEAD"], "git rev-parse")
    }

    fn checkout(&self, path: &Path, commit_id: &str) -> Result<(), IntentcError> {
        self.run_ok(path, &["checkout", commit_id], "git checkout")?;
        Ok(())
    }

    fn create_branch(&self, path: &Path, name: &str) -> Result<(), IntentcError> {
        self.run_ok(path, &["branch", name], "git branch")?;
        Ok(())
    }

    fn status(&self, path: &Path) -> Result<VcsStatus, IntentcError> {
        let raw = self.run_ok(path, &["status", "--porcelain"], "git status")?;
        let mut status = VcsStatus::default();
        for line in raw.lines() {
            if line.len() < 3 {
                continue;
            }
            let index_state = line.as_bytes()[0];
            let worktree_state = line.as_bytes()[1];
            let file = line[3..].to_string();
            if index_state == b'?' && worktree_state == b'?' {
                status.untracked.push(file);
            } else {
                if index_state != b' ' {
                    status.staged.push(file.clone());
                }
                if worktree_state != b' ' {
                    status.modified.push(file);
                }
            }
        }
        status.clean =
            status.modified.is_empty() && status.untracked.is_empty() && status.staged.is_empty();
        Ok(status)
    }

    fn log(&self, path: &Path, limit: usize) -> Result<Vec<CommitLogEntry>, IntentcError> {
        let raw = self.run_ok(
            path,
            &["log", &format!("-{limit}"), "--pretty=format:%H%x1f%s"],
            "git log",
        )?;
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        Ok(raw
            .lines()
            .filter_map(|line| {
                let mut parts = line.splitn(2, '\u{1f}');
                let commit_id = parts.next()?.to_string();
                let message = parts.next().unwrap_or_default().to_string();
                Some(CommitLogEntry { commit_id, message })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn is_repo_false_for_non_repo_is_not_an_error() {
        let dir = tempdir().unwrap();
        let backend = GitBackend::new();
        assert!(!backend.is_repo(dir.path()));
    }

    #[test]
    fn init_add_commit_and_log_round_trip() {
        let dir = tempdir().unwrap();
        let backend = GitBackend::new();
        backend.init(dir.path()).unwrap();
        Command::new("git")
            .args(["-C", dir.path().to_str().unwrap(), "config", "user.email", "t@t.com"])
            .output()
            .unwrap();
        Command::new("git")
            .args(["-C", dir.path().to_str().unwrap(), "config", "user.name", "t"])
            .output()
            .unwrap();

        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        backend.add(dir.path(), &["a.txt".to_string()]).unwrap();
        let commit_id = backend.commit(dir.path(), "initial").unwrap();
        assert!(!commit_id.is_empty());

        let log = backend.log(dir.path(), 10).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].message, "initial");

        let status = backend.status(dir.path()).unwrap();
        assert!(status.clean);
    }
}

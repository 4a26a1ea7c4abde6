//! VCS adapter (base spec §4.3 "C4", design note §9: "VCS presence as a
//! runtime choice").
//!
//! The state manager consumes version control through this trait and is
//! oblivious to which concrete backend is active. `IsRepo` returning
//! `false` is never an error; only a requested-but-failed operation is.

pub mod git;
pub mod noop;

use std::path::Path;

use crate::error::IntentcError;

/// Working-tree status as reported by `status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VcsStatus {
    pub modified: Vec<String>,
    pub untracked: Vec<String>,
    pub staged: Vec<String>,
    pub clean: bool,
}

/// One entry of `log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitLogEntry {
    pub commit_id: String,
    pub message: String,
}

/// Abstract capability set over a commit-based version-control store.
pub trait VcsBackend: Send + Sync {
    /// Whether `path` is (already) a VCS working tree. Never an error.
    fn is_repo(&self, path: &Path) -> bool;

    /// Initialize/ensure a repo exists at `path`.
    fn init(&self, path: &Path) -> Result<(), IntentcError>;

    /// Stage the given paths (relative to the repo root).
    fn add(&self, path: &Path, files: &[String]) -> Result<(), IntentcError>;

    /// Commit currently-staged changes with `message`.
    fn commit(&self, path: &Path, message: &str) -> Result<String, IntentcError>;

    fn current_branch(&self, path: &Path) -> Result<String, IntentcError>;

    fn current_commit(&self, path: &Path) -> Result<String, IntentcError>;

    fn checkout(&self, path: &Path, commit_id: &str) -> Result<(), IntentcError>;

    fn create_branch(&self, path: &Path, name: &str) -> Result<(), IntentcError>;

    fn status(&self, path: &Path) -> Result<VcsStatus, IntentcError>;

    fn log(&self, path: &Path, limit: usize) -> Result<Vec<CommitLogEntry>, IntentcError>;
}

/// Pick a backend for `path`: the real git adapter if `path` is (or can be)
/// a git working tree, the no-op adapter otherwise.
pub fn detect_backend(path: &Path) -> Box<dyn VcsBackend> {
    let git = git::GitBackend::new();
    if git.is_repo(path) {
        Box::new(git)
    } else {
        Box::new(noop::NoopBackend::new())
    }
}

//! No-op VCS backend, selected when no version control is present so the
//! engine runs identically either way (base spec §4.4).

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::IntentcError;
use crate::time::now_epoch_z;
use crate::vcs::{CommitLogEntry, VcsBackend, VcsStatus};

/// A synthetic commit id derived from wall-clock time, monotonically
/// disambiguated within a process so two rapid commits never collide.
#[derive(Debug, Default)]
pub struct NoopBackend {
    counter: AtomicU64,
}

impl NoopBackend {
    pub fn new() -> NoopBackend {
        NoopBackend::default()
    }

    fn synthetic_commit_id(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("noop-{}-{seq}", now_epoch_z())
    }
}

impl VcsBackend for NoopBackend {
    fn is_repo(&self, _path: &Path) -> bool {
        false
    }

    fn init(&self, _path: &Path) -> Result<(), IntentcError> {
        Ok(())
    }

    fn add(&self, _path: &Path, _files: &[String]) -> Result<(), IntentcError> {
        Ok(())
    }

    fn commit(&self, _path: &Path, _message: &str) -> Result<String, IntentcError> {
        Ok(self.synthetic_commit_id())
    }

    fn current_branch(&self, _path: &Path) -> Result<String, IntentcError> {
        Ok("no-vcs".to_string())
    }

    fn current_commit(&self, _path: &Path) -> Result<String, IntentcError> {
        Ok(self.synthetic_commit_id())
    }

    fn checkout(&self, _path: &Path, _commit_id: &str) -> Result<(), IntentcError> {
        Ok(())
    }

    fn create_branch(&self, _path: &Path, _name: &str) -> Result<(), IntentcError> {
        Ok(())
    }

    fn status(&self, _path: &Path) -> Result<VcsStatus, IntentcError> {
        Ok(VcsStatus {
            clean: true,
            ..Default::default()
        })
    }

    fn log(&self, _path: &Path, _limit: usize) -> Result<Vec<CommitLogEntry>, IntentcError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn is_repo_is_always_false_and_not_an_error() {
        let backend = NoopBackend::new();
        assert!(!backend.is_repo(&PathBuf::from("/nonexistent")));
    }

    #[test]
    fn staging_and_commit_succeed_silently() {
        let backend = NoopBackend::new();
        let path = PathBuf::from("/nonexistent");
        backend.add(&path, &["a.txt".to_string()]).unwrap();
        let id1 = backend.commit(&path, "msg").unwrap();
        let id2 = backend.commit(&path, "msg").unwrap();
        assert_ne!(id1, id2);
    }
}

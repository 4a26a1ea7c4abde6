//! State manager (base spec §4.5, component C5).
//!
//! All mutation goes through a single in-process mutex so concurrent
//! validation/build threads never interleave a read-modify-write cycle —
//! the "thin waist" single-writer contract the teacher's broker enforces
//! around its own cache, carried here without the SQL backing store (see
//! DESIGN.md: "dropped teacher dependencies").
//!
//! Every write follows the teacher's context-capsule shape: ensure the
//! parent directory exists, serialize with `serde_json::to_vec_pretty`, then
//! `fs::write` the whole file.

pub mod models;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub use models::{BuildResult, StatusMap, TargetStatus};

use crate::error::IntentcError;
use crate::vcs::VcsBackend;

/// Reads and writes `.intentc/state/**` under a project root.
pub struct StateManager {
    project_root: PathBuf,
    write_lock: Mutex<()>,
}

impl StateManager {
    pub fn new(project_root: impl Into<PathBuf>) -> StateManager {
        StateManager {
            project_root: project_root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(".intentc").join("state")
    }

    /// Create `.intentc/state` (and, for a named build, its mirror
    /// subdirectory) if they don't already exist.
    pub fn initialize(&self) -> Result<(), IntentcError> {
        let _guard = self.write_lock.lock().expect("state lock poisoned");
        fs::create_dir_all(self.state_dir())?;
        Ok(())
    }

    fn build_root(&self, build_name: Option<&str>) -> PathBuf {
        match build_name {
            Some(name) => self.state_dir().join("builds").join(name),
            None => self.state_dir(),
        }
    }

    fn status_path(&self, build_name: Option<&str>) -> PathBuf {
        self.build_root(build_name).join("status.json")
    }

    /// `state/builds/<target>/…`, or `state/builds/<build_name>/<target>/…`
    /// for a named build (base spec §4.5, §6 on-disk layout).
    fn results_dir(&self, build_name: Option<&str>, target: &str) -> PathBuf {
        match build_name {
            Some(name) => self.state_dir().join("builds").join(name).join(target),
            None => self.state_dir().join("builds").join(target),
        }
    }

    fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<(), IntentcError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(value)?;
        fs::write(path, bytes)?;
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &Path,
    ) -> Result<Option<T>, IntentcError> {
        match fs::read_to_string(path) {
            Ok(raw) if raw.trim().is_empty() => Ok(None),
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(IntentcError::Io(e)),
        }
    }

    fn load_status_map(&self, build_name: Option<&str>) -> Result<StatusMap, IntentcError> {
        Ok(self
            .read_json(&self.status_path(build_name))?
            .unwrap_or_default())
    }

    /// Current status for `target`, defaulting to `Pending` when unrecorded
    /// (base spec §4.5: unknown targets are pending, not an error).
    pub fn get_status(
        &self,
        target: &str,
        build_name: Option<&str>,
    ) -> Result<TargetStatus, IntentcError> {
        let map = self.load_status_map(build_name)?;
        Ok(map.get(target).copied().unwrap_or(TargetStatus::Pending))
    }

    pub fn set_status(
        &self,
        target: &str,
        status: TargetStatus,
        build_name: Option<&str>,
    ) -> Result<(), IntentcError> {
        let _guard = self.write_lock.lock().expect("state lock poisoned");
        let mut map = self
            .read_json::<StatusMap>(&self.status_path(build_name))?
            .unwrap_or_default();
        map.insert(target.to_string(), status);
        self.write_json(&self.status_path(build_name), &map)
    }

    /// Persist a build result under `builds/<target>/<generation_id>.json`
    /// and refresh `builds/<target>/latest.json`. When `result.build_name`
    /// is set, also mirrors both files under `builds/<build_name>/<target>/…`
    /// so a named build's history doesn't clobber the project-wide one.
    pub fn save_build_result(&self, result: &BuildResult) -> Result<(), IntentcError> {
        let _guard = self.write_lock.lock().expect("state lock poisoned");

        let dir = self.results_dir(None, &result.target);
        self.write_json(&dir.join(format!("{}.json", result.generation_id)), result)?;
        self.write_json(&dir.join("latest.json"), result)?;

        if let Some(build_name) = result.build_name.as_deref() {
            let named_dir = self.results_dir(Some(build_name), &result.target);
            self.write_json(
                &named_dir.join(format!("{}.json", result.generation_id)),
                result,
            )?;
            self.write_json(&named_dir.join("latest.json"), result)?;
        }

        Ok(())
    }

    pub fn get_build_result(
        &self,
        target: &str,
        generation_id: &str,
        build_name: Option<&str>,
    ) -> Result<Option<BuildResult>, IntentcError> {
        let path = self
            .results_dir(build_name, target)
            .join(format!("{generation_id}.json"));
        self.read_json(&path)
    }

    /// The most recently recorded result for `target`, or `None` if it has
    /// never been built — absence is not an error (base spec §4.5).
    pub fn get_latest_build_result(
        &self,
        target: &str,
        build_name: Option<&str>,
    ) -> Result<Option<BuildResult>, IntentcError> {
        let path = self.results_dir(build_name, target).join("latest.json");
        self.read_json(&path)
    }

    /// Stage `files` and commit them through `vcs`, returning the new
    /// commit id. The state manager never picks a backend itself; callers
    /// (the orchestrator's `post_build_hook`) decide which one is active.
    pub fn commit_changes(
        &self,
        vcs: &dyn VcsBackend,
        files: &[String],
        message: &str,
    ) -> Result<String, IntentcError> {
        vcs.add(&self.project_root, files)?;
        vcs.commit(&self.project_root, message)
    }
}

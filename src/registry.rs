//! Target registry (base spec §4.2, component C2).
//!
//! Discovers `<project>/intent/*` feature directories, parses their single
//! `.ic` file plus sibling `.icv` files, and exposes name -> `TargetInfo`
//! lookup with an mtime+TTL cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Instant, SystemTime};

use crate::error::IntentcError;
use crate::parser::{Intent, ValidationFile};

/// Cache validity window (base spec §3 "TargetInfo": "fixed TTL (5 minutes)").
const CACHE_TTL_SECS: u64 = 300;

struct CacheEntry {
    intent: Intent,
    mtime: SystemTime,
    inserted_at: Instant,
}

/// A target: one intent plus its attached validation files.
#[derive(Debug, Clone)]
pub struct TargetInfo {
    pub name: String,
    pub intent: Intent,
    pub validations: Vec<ValidationFile>,
    pub intent_path: PathBuf,
    pub last_modified: SystemTime,
}

/// Discovers and caches targets under `<project>/intent/`.
pub struct TargetRegistry {
    project_root: PathBuf,
    targets: HashMap<String, TargetInfo>,
    aliases: HashMap<String, Vec<String>>,
    cache: Mutex<HashMap<PathBuf, CacheEntry>>,
}

impl TargetRegistry {
    /// Discover every feature directory under `<project>/intent/*` that
    /// contains exactly one `.ic` file. Directories with zero `.ic` files
    /// are silently skipped; directories with more than one are a hard
    /// error naming the directory and the offending files.
    pub fn load(project_root: &Path) -> Result<TargetRegistry, IntentcError> {
        let intent_dir = project_root.join("intent");
        let mut targets = HashMap::new();
        let mut cache = HashMap::new();

        if intent_dir.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(&intent_dir)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect();
            entries.sort();

            for dir in entries {
                let name = dir
                    .file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default()
                    .to_string();

                let ic_files: Vec<PathBuf> = std::fs::read_dir(&dir)?
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("ic"))
                    .collect();

                if ic_files.is_empty() {
                    continue;
                }
                if ic_files.len() > 1 {
                    let names: Vec<String> = ic_files
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect();
                    tracing::warn!(dir = %dir.display(), files = ?names, "multiple .ic files in one target directory");
                    return Err(IntentcError::Discovery(format!(
                        "directory {} contains multiple .ic files: {}",
                        dir.display(),
                        names.join(", ")
                    )));
                }

                let intent_path = ic_files.into_iter().next().expect("checked non-empty");
                let intent = Intent::parse_file(&name, &intent_path)?;
                let mtime = std::fs::metadata(&intent_path)?.modified()?;

                let icv_files: Vec<PathBuf> = std::fs::read_dir(&dir)?
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("icv"))
                    .collect();
                let validations = icv_files
                    .iter()
                    .map(|p| ValidationFile::parse_file(p))
                    .collect::<Result<Vec<_>, _>>()?;

                cache.insert(
                    intent_path.clone(),
                    CacheEntry {
                        intent: intent.clone(),
                        mtime,
                        inserted_at: Instant::now(),
                    },
                );

                targets.insert(
                    name.clone(),
                    TargetInfo {
                        name,
                        intent,
                        validations,
                        intent_path,
                        last_modified: mtime,
                    },
                );
            }
        }

        tracing::debug!(count = targets.len(), root = %intent_dir.display(), "discovered targets");

        let mut aliases = HashMap::new();
        let all: Vec<String> = targets.keys().cloned().collect();
        let project: Vec<String> = all
            .iter()
            .filter(|n| n.starts_with("project-"))
            .cloned()
            .collect();
        let features: Vec<String> = all
            .iter()
            .filter(|n| !n.starts_with("project-"))
            .cloned()
            .collect();
        aliases.insert("all".to_string(), all);
        aliases.insert("project".to_string(), project);
        aliases.insert("features".to_string(), features);

        Ok(TargetRegistry {
            project_root: project_root.to_path_buf(),
            targets,
            aliases,
            cache: Mutex::new(cache),
        })
    }

    pub fn get(&self, name: &str) -> Option<&TargetInfo> {
        self.targets.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.targets.keys()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Resolve a registered alias (`all`, `project`, `features`, or any
    /// programmatically-added one) to its member target names.
    pub fn resolve_alias(&self, name: &str) -> Option<&[String]> {
        self.aliases.get(name).map(Vec::as_slice)
    }

    /// Register (or overwrite) an alias programmatically.
    pub fn add_alias(&mut self, name: &str, members: Vec<String>) {
        self.aliases.insert(name.to_string(), members);
    }

    /// Whether the cached entry for `path` is still valid: inserted within
    /// the TTL window AND the file's mtime has not advanced past what was
    /// cached.
    fn cache_entry_is_valid(entry: &CacheEntry, current_mtime: SystemTime) -> bool {
        entry.inserted_at.elapsed().as_secs() < CACHE_TTL_SECS && current_mtime <= entry.mtime
    }

    /// Invalidate the cache and registry entry for `name` and re-read it
    /// from disk.
    pub fn refresh(&mut self, name: &str) -> Result<(), IntentcError> {
        let target = self
            .targets
            .get(name)
            .ok_or_else(|| IntentcError::NotFound(name.to_string()))?;
        let intent_path = target.intent_path.clone();
        let dir = intent_path
            .parent()
            .ok_or_else(|| IntentcError::Discovery(format!("{} has no parent dir", name)))?
            .to_path_buf();

        self.cache.lock().expect("cache mutex poisoned").remove(&intent_path);

        let intent = Intent::parse_file(name, &intent_path)?;
        let mtime = std::fs::metadata(&intent_path)?.modified()?;
        let icv_files: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("icv"))
            .collect();
        let validations = icv_files
            .iter()
            .map(|p| ValidationFile::parse_file(p))
            .collect::<Result<Vec<_>, _>>()?;

        self.cache.lock().expect("cache mutex poisoned").insert(
            intent_path.clone(),
            CacheEntry {
                intent: intent.clone(),
                mtime,
                inserted_at: Instant::now(),
            },
        );

        self.targets.insert(
            name.to_string(),
            TargetInfo {
                name: name.to_string(),
                intent,
                validations,
                intent_path,
                last_modified: mtime,
            },
        );
        Ok(())
    }

    /// Whether the per-path cache currently considers `path` fresh. Exposed
    /// mainly for tests exercising the TTL/mtime contract directly.
    pub fn is_cache_fresh(&self, path: &Path) -> bool {
        let cache = self.cache.lock().expect("cache mutex poisoned");
        match (cache.get(path), std::fs::metadata(path).and_then(|m| m.modified())) {
            (Some(entry), Ok(mtime)) => Self::cache_entry_is_valid(entry, mtime),
            _ => false,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }
}

//! Build orchestrator (base spec §4.7, component C7).
//!
//! Builds a restricted topological plan (requested targets plus their
//! transitive dependencies), skips anything not stale, and invokes the
//! agent sequentially — rate-limited and retried per `config.yaml`'s
//! `agent` block. Grounded on the teacher's `Instant`-based rate/backoff
//! bookkeeping in `src/core/broker.rs` and its pass/fail tally pattern in
//! `src/core/validate.rs`.

use std::collections::{BTreeMap, BTreeSet};
use std::thread;
use std::time::{Duration, Instant};

use crate::agent::{Agent, BuildContext};
use crate::config::AgentConfig;
use crate::dag::DependencyDag;
use crate::error::IntentcError;
use crate::registry::TargetRegistry;
use crate::state::{BuildResult, StateManager, TargetStatus};
use crate::time::{now_epoch_z, new_generation_id};

/// Hook invoked after each target finishes building, successfully or not —
/// the seam the CLI's `build` command uses to commit changes per target
/// (DESIGN.md: "commit grouping on build").
pub type PostBuildHook<'a> = dyn Fn(&BuildResult) -> Result<(), IntentcError> + 'a;

fn mtime_secs(path: &std::path::Path) -> Option<u64> {
    path.metadata()
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
}

pub struct Orchestrator<'a> {
    registry: &'a TargetRegistry,
    dag: &'a DependencyDag,
    state: &'a StateManager,
    agent: &'a dyn Agent,
    agent_config: AgentConfig,
    build_name: Option<String>,
    force_rebuild: bool,
    last_invocation: Option<Instant>,
    post_build_hook: Option<Box<PostBuildHook<'a>>>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        registry: &'a TargetRegistry,
        dag: &'a DependencyDag,
        state: &'a StateManager,
        agent: &'a dyn Agent,
        agent_config: AgentConfig,
    ) -> Orchestrator<'a> {
        Orchestrator {
            registry,
            dag,
            state,
            agent,
            agent_config,
            build_name: None,
            force_rebuild: false,
            last_invocation: None,
            post_build_hook: None,
        }
    }

    pub fn with_build_name(mut self, build_name: Option<String>) -> Orchestrator<'a> {
        self.build_name = build_name;
        self
    }

    /// When set, every planned target is rebuilt regardless of staleness —
    /// wired from `config.yaml`'s `build.cache_enabled: false`.
    pub fn with_force_rebuild(mut self, force_rebuild: bool) -> Orchestrator<'a> {
        self.force_rebuild = force_rebuild;
        self
    }

    pub fn with_post_build_hook<F>(mut self, hook: F) -> Orchestrator<'a>
    where
        F: Fn(&BuildResult) -> Result<(), IntentcError> + 'a,
    {
        self.post_build_hook = Some(Box::new(hook));
        self
    }

    /// The requested targets plus every transitive dependency, in
    /// dependency-before-dependent order.
    fn plan(&self, requested: &[String]) -> Result<Vec<String>, IntentcError> {
        let full_order = self.dag.topological_sort()?;
        let mut needed: BTreeSet<String> = BTreeSet::new();
        let mut stack: Vec<String> = requested.to_vec();
        while let Some(name) = stack.pop() {
            if needed.insert(name.clone()) {
                stack.extend(self.dag.dependencies_of(&name));
            }
        }
        Ok(full_order.into_iter().filter(|n| needed.contains(n)).collect())
    }

    /// Whether `target` needs rebuilding: never built, a recorded artifact
    /// is missing or older than the intent file, or a dependency's
    /// generation id no longer matches what was recorded at that build
    /// (base spec §4.7, step 4).
    fn is_stale(&self, target: &str) -> Result<bool, IntentcError> {
        if self.force_rebuild {
            return Ok(true);
        }
        let Some(latest) = self.state.get_latest_build_result(target, self.build_name.as_deref())?
        else {
            tracing::debug!(%target, "stale: no prior successful build");
            return Ok(true);
        };
        if !latest.success {
            tracing::debug!(%target, "stale: prior build recorded as failed");
            return Ok(true);
        }

        let info = self
            .registry
            .get(target)
            .ok_or_else(|| IntentcError::NotFound(format!("target '{target}' is not registered")))?;
        let intent_mtime = mtime_secs(&info.intent.file_path);

        let output_dir = info
            .intent_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| self.registry.project_root().to_path_buf());
        for file in &latest.files {
            let artifact = output_dir.join(file);
            let Some(artifact_secs) = mtime_secs(&artifact) else {
                tracing::debug!(%target, file, "stale: recorded artifact is missing");
                return Ok(true);
            };
            if let Some(intent_secs) = intent_mtime {
                if artifact_secs < intent_secs {
                    tracing::debug!(%target, file, "stale: artifact older than intent");
                    return Ok(true);
                }
            }
        }

        for dep in self.dag.dependencies_of(target) {
            let recorded = latest.dep_generation_ids.get(&dep);
            let current = self
                .state
                .get_latest_build_result(&dep, self.build_name.as_deref())?
                .map(|r| r.generation_id);
            if recorded != current.as_ref() {
                tracing::debug!(%target, dep = %dep, "stale: dependency generation id changed");
                return Ok(true);
            }
        }

        tracing::trace!(%target, "not stale, skipping");
        Ok(false)
    }

    fn wait_for_rate_limit(&mut self) {
        if self.agent_config.rate_limit.is_zero() {
            return;
        }
        if let Some(last) = self.last_invocation {
            let elapsed = last.elapsed();
            if elapsed < self.agent_config.rate_limit {
                let wait = self.agent_config.rate_limit - elapsed;
                tracing::trace!(wait_ms = wait.as_millis() as u64, "sleeping to honor agent rate limit");
                thread::sleep(wait);
            }
        }
        self.last_invocation = Some(Instant::now());
    }

    fn build_one(&mut self, target: &str) -> Result<BuildResult, IntentcError> {
        let info = self
            .registry
            .get(target)
            .ok_or_else(|| IntentcError::NotFound(format!("target '{target}' is not registered")))?;

        let output_dir = info
            .intent_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| self.registry.project_root().to_path_buf());

        let mut dependency_outputs = BTreeMap::new();
        let mut dep_generation_ids = BTreeMap::new();
        for dep in self.dag.dependencies_of(target) {
            if let Some(dep_info) = self.registry.get(&dep) {
                if let Some(parent) = dep_info.intent_path.parent() {
                    dependency_outputs.insert(dep.clone(), parent.to_path_buf());
                }
            }
            if let Some(result) = self
                .state
                .get_latest_build_result(&dep, self.build_name.as_deref())?
            {
                dep_generation_ids.insert(dep, result.generation_id);
            }
        }

        let ctx = BuildContext {
            target: target.to_string(),
            project_root: self.registry.project_root().to_path_buf(),
            intent: info.intent.clone(),
            dependency_outputs,
            output_dir,
            timeout: self.agent_config.timeout,
        };

        let attempts = 1 + self.agent_config.retries;
        let mut last_error = None;
        for attempt in 1..=attempts {
            self.wait_for_rate_limit();
            tracing::info!(%target, attempt, attempts, "invoking agent");
            match self.agent.generate(&ctx) {
                Ok(output) => {
                    tracing::info!(%target, attempt, "agent invocation succeeded");
                    return Ok(BuildResult {
                        target: target.to_string(),
                        generation_id: new_generation_id(),
                        success: true,
                        error: None,
                        generated_at: now_epoch_z(),
                        files: output.files,
                        build_name: self.build_name.clone(),
                        build_path: None,
                        dep_generation_ids,
                    });
                }
                Err(e) => {
                    if attempt < attempts {
                        tracing::warn!(%target, attempt, error = %e, "agent invocation failed, retrying");
                    } else {
                        tracing::error!(%target, attempt, error = %e, "agent invocation failed, no retries left");
                    }
                    last_error = Some(e);
                    if attempt < attempts {
                        continue;
                    }
                }
            }
        }

        Ok(BuildResult {
            target: target.to_string(),
            generation_id: new_generation_id(),
            success: false,
            error: last_error.map(|e| e.to_string()),
            generated_at: now_epoch_z(),
            files: Vec::new(),
            build_name: self.build_name.clone(),
            build_path: None,
            dep_generation_ids,
        })
    }

    /// Build `requested` and every transitive dependency that is stale.
    /// Targets whose dependency failed this run are skipped without
    /// invoking the agent and remain in whatever status they already had.
    pub fn build(&mut self, requested: &[String]) -> Result<Vec<BuildResult>, IntentcError> {
        let plan = self.plan(requested)?;
        let mut results = Vec::new();
        let mut failed: BTreeSet<String> = BTreeSet::new();

        for target in plan {
            let deps_failed = self
                .dag
                .dependencies_of(&target)
                .iter()
                .any(|d| failed.contains(d));
            if deps_failed {
                failed.insert(target.clone());
                self.state
                    .set_status(&target, TargetStatus::Outdated, self.build_name.as_deref())?;
                continue;
            }

            if !self.is_stale(&target)? {
                self.state
                    .set_status(&target, TargetStatus::Built, self.build_name.as_deref())?;
                continue;
            }

            self.state
                .set_status(&target, TargetStatus::Building, self.build_name.as_deref())?;
            let result = self.build_one(&target)?;
            self.state.save_build_result(&result)?;

            if result.success {
                self.state
                    .set_status(&target, TargetStatus::Built, self.build_name.as_deref())?;
            } else {
                self.state
                    .set_status(&target, TargetStatus::Failed, self.build_name.as_deref())?;
                failed.insert(target.clone());
            }

            if let Some(hook) = &self.post_build_hook {
                hook(&result)?;
            }
            results.push(result);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::mock::MockAgent;
    use std::fs;
    use tempfile::tempdir;

    fn write_target(root: &std::path::Path, name: &str, deps: &[&str]) {
        let dir = root.join("intent").join(name);
        fs::create_dir_all(&dir).unwrap();
        let depends_on = if deps.is_empty() {
            String::new()
        } else {
            format!("Depends On: {}\n", deps.join(", "))
        };
        fs::write(dir.join(format!("{name}.ic")), format!("# {name}\n\n{depends_on}Do it.\n")).unwrap();
    }

    #[test]
    fn linear_chain_builds_in_dependency_order_and_records_results() {
        let dir = tempdir().unwrap();
        write_target(dir.path(), "a", &[]);
        write_target(dir.path(), "b", &["a"]);
        write_target(dir.path(), "c", &["b"]);

        let registry = TargetRegistry::load(dir.path()).unwrap();
        let dag = DependencyDag::build_from_intents(&registry).unwrap();
        let state = StateManager::new(dir.path());
        state.initialize().unwrap();
        let agent = MockAgent::new();
        let agent_config = AgentConfig {
            provider: "mock".to_string(),
            command: None,
            cli_args: Vec::new(),
            timeout: Duration::from_secs(5),
            retries: 0,
            rate_limit: Duration::from_secs(0),
        };

        let mut orchestrator = Orchestrator::new(&registry, &dag, &state, &agent, agent_config);
        let results = orchestrator.build(&["c".to_string()]).unwrap();

        let order: Vec<&str> = results.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(state.get_status("c", None).unwrap(), TargetStatus::Built);
    }

    #[test]
    fn unchanged_target_is_skipped_on_second_build() {
        let dir = tempdir().unwrap();
        write_target(dir.path(), "a", &[]);

        let registry = TargetRegistry::load(dir.path()).unwrap();
        let dag = DependencyDag::build_from_intents(&registry).unwrap();
        let state = StateManager::new(dir.path());
        state.initialize().unwrap();
        let agent = MockAgent::new();
        let agent_config = AgentConfig::default();

        let mut orchestrator = Orchestrator::new(&registry, &dag, &state, &agent, agent_config.clone());
        let first = orchestrator.build(&["a".to_string()]).unwrap();
        assert_eq!(first.len(), 1);

        let mut orchestrator2 = Orchestrator::new(&registry, &dag, &state, &agent, agent_config);
        let second = orchestrator2.build(&["a".to_string()]).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn failed_dependency_skips_its_dependents() {
        let dir = tempdir().unwrap();
        write_target(dir.path(), "a", &[]);
        write_target(dir.path(), "b", &["a"]);

        let registry = TargetRegistry::load(dir.path()).unwrap();
        let dag = DependencyDag::build_from_intents(&registry).unwrap();
        let state = StateManager::new(dir.path());
        state.initialize().unwrap();

        struct AlwaysFails;
        impl Agent for AlwaysFails {
            fn generate(&self, ctx: &BuildContext) -> Result<crate::agent::AgentOutput, IntentcError> {
                Err(IntentcError::Agent(format!("refused to build '{}'", ctx.target)))
            }
            fn validate(
                &self,
                _ctx: &BuildContext,
                _check: &crate::parser::validation::Validation,
            ) -> Result<crate::agent::AgentValidation, IntentcError> {
                unreachable!()
            }
            fn decompile(&self, _ctx: &BuildContext) -> Result<String, IntentcError> {
                unreachable!()
            }
        }

        let agent = AlwaysFails;
        let agent_config = AgentConfig {
            retries: 0,
            ..AgentConfig::default()
        };
        let mut orchestrator = Orchestrator::new(&registry, &dag, &state, &agent, agent_config);
        let results = orchestrator.build(&["b".to_string()]).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].target, "a");
        assert!(!results[0].success);
        assert_eq!(state.get_status("b", None).unwrap(), TargetStatus::Outdated);
    }

    #[test]
    fn retries_exhaust_before_marking_failed() {
        let dir = tempdir().unwrap();
        write_target(dir.path(), "a", &[]);

        let registry = TargetRegistry::load(dir.path()).unwrap();
        let dag = DependencyDag::build_from_intents(&registry).unwrap();
        let state = StateManager::new(dir.path());
        state.initialize().unwrap();

        use std::sync::atomic::{AtomicU32, Ordering};
        struct FailsTwice(AtomicU32);
        impl Agent for FailsTwice {
            fn generate(&self, ctx: &BuildContext) -> Result<crate::agent::AgentOutput, IntentcError> {
                let attempt = self.0.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    Err(IntentcError::Agent("transient failure".to_string()))
                } else {
                    MockAgent::new().generate(ctx)
                }
            }
            fn validate(
                &self,
                _ctx: &BuildContext,
                _check: &crate::parser::validation::Validation,
            ) -> Result<crate::agent::AgentValidation, IntentcError> {
                unreachable!()
            }
            fn decompile(&self, _ctx: &BuildContext) -> Result<String, IntentcError> {
                unreachable!()
            }
        }

        let agent = FailsTwice(AtomicU32::new(0));
        let agent_config = AgentConfig {
            retries: 2,
            ..AgentConfig::default()
        };
        let mut orchestrator = Orchestrator::new(&registry, &dag, &state, &agent, agent_config);
        let results = orchestrator.build(&["a".to_string()]).unwrap();
        assert!(results[0].success);
    }
}

//! CLI surface (base spec §A4). A thin `clap` layer: every subcommand loads
//! the registry/config/state for `--project`, does one thing, and renders
//! through [`crate::output`]. No business logic lives here.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::agent;
use crate::config::EngineConfig;
use crate::dag::DependencyDag;
use crate::error::IntentcError;
use crate::logging;
use crate::orchestrator::Orchestrator;
use crate::output;
use crate::registry::TargetRegistry;
use crate::state::StateManager;
use crate::validate::{self, RunOptions};
use crate::vcs;

#[derive(Parser, Debug)]
#[command(
    name = "intentc",
    version = env!("CARGO_PKG_VERSION"),
    about = "A declarative build system whose targets are natural-language intents, compiled by an AI agent."
)]
pub struct Cli {
    /// Project root (must contain an `intent/` directory).
    #[arg(long, global = true, default_value = ".")]
    pub project: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build one or more targets (and their stale dependencies).
    Build {
        /// Target names, or an alias (`all`, `project`, `features`). All
        /// targets if omitted.
        targets: Vec<String>,
        /// Record this build under a named build lineage.
        #[arg(long)]
        build_name: Option<String>,
        /// Rebuild even if nothing looks stale.
        #[arg(long)]
        force: bool,
    },
    /// Validate the project: discover every intent, build the dependency
    /// graph, and report cycles or missing dependencies without building.
    Check,
    /// Run the `.icv` checks attached to one or more targets. Checks marked
    /// `Hidden: true` are never executed but are still counted toward each
    /// target's declared total.
    Validate {
        targets: Vec<String>,
        #[arg(long)]
        parallel: bool,
    },
    /// Remove generated output for a target or an entire named build.
    Clean {
        targets: Vec<String>,
        #[arg(long)]
        build_name: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the dependency graph annotated with each target's build status.
    Status {
        #[arg(long)]
        build_name: Option<String>,
    },
    /// Print the dependency graph without status annotations.
    Graph,
}

fn resolve_targets(registry: &TargetRegistry, requested: &[String]) -> Vec<String> {
    if requested.is_empty() {
        return registry.names().cloned().collect();
    }
    let mut resolved = Vec::new();
    for name in requested {
        if let Some(members) = registry.resolve_alias(name) {
            resolved.extend(members.iter().cloned());
        } else {
            resolved.push(name.clone());
        }
    }
    resolved
}

/// Run `cli` to completion, returning the process exit code.
pub fn run(cli: Cli) -> Result<i32, IntentcError> {
    let project_root = cli.project.canonicalize().unwrap_or(cli.project.clone());
    let config = EngineConfig::load(&project_root)?;
    logging::init(&config.logging);

    match cli.command {
        Command::Build {
            targets,
            build_name,
            force,
        } => run_build(&project_root, &config, targets, build_name, force),
        Command::Check => run_check(&project_root),
        Command::Validate { targets, parallel } => run_validate(&project_root, &config, targets, parallel),
        Command::Clean {
            targets,
            build_name,
            dry_run,
        } => run_clean(&project_root, targets, build_name, dry_run),
        Command::Status { build_name } => run_status(&project_root, build_name),
        Command::Graph => run_graph(&project_root),
    }
}

fn run_build(
    project_root: &std::path::Path,
    config: &EngineConfig,
    targets: Vec<String>,
    build_name: Option<String>,
    force: bool,
) -> Result<i32, IntentcError> {
    let registry = TargetRegistry::load(project_root)?;
    let dag = DependencyDag::build_from_intents(&registry)?;
    let state = StateManager::new(project_root);
    state.initialize()?;

    let agent = agent::from_config(&config.agent)?;
    let effective_build_name = build_name.or_else(|| config.build.default_build_name.clone());

    let vcs_backend = vcs::detect_backend(project_root);
    let prefix = config.build.commit_message_prefix.clone();
    let auto_commit = config.build.auto_commit;
    let project_root_owned = project_root.to_path_buf();

    let mut orchestrator = Orchestrator::new(&registry, &dag, &state, agent.as_ref(), config.agent.clone())
        .with_build_name(effective_build_name)
        .with_force_rebuild(force || !config.build.cache_enabled);

    if auto_commit {
        orchestrator = orchestrator.with_post_build_hook(move |result| {
            if !result.success {
                return Ok(());
            }
            let files: Vec<String> = result
                .files
                .iter()
                .map(|f| format!("intent/{}/{f}", result.target))
                .collect();
            vcs_backend.add(&project_root_owned, &files)?;
            vcs_backend
                .commit(&project_root_owned, &format!("{prefix}{}", result.target))
                .map(|_| ())
        });
    }

    let resolved = resolve_targets(&registry, &targets);
    let results = orchestrator.build(&resolved)?;

    println!("{}", output::render_build_results(&results));
    let exit_code = if results.iter().all(|r| r.success) { 0 } else { 1 };
    Ok(exit_code)
}

fn run_check(project_root: &std::path::Path) -> Result<i32, IntentcError> {
    let registry = TargetRegistry::load(project_root)?;
    let dag = DependencyDag::build_from_intents(&registry)?;
    if let Some(cycle) = dag.detect_cycle() {
        eprintln!("cycle detected: {}", cycle.join(" -> "));
        return Ok(1);
    }
    println!("{} target(s), no cycles, all dependencies resolved", registry.len());
    Ok(0)
}

fn run_validate(
    project_root: &std::path::Path,
    config: &EngineConfig,
    targets: Vec<String>,
    parallel: bool,
) -> Result<i32, IntentcError> {
    let registry = TargetRegistry::load(project_root)?;
    let resolved = resolve_targets(&registry, &targets);
    let agent = agent::from_config(&config.agent)?;
    let options = RunOptions {
        parallel,
        timeout: config.agent.timeout,
    };

    let mut any_failed = false;
    for target in &resolved {
        let report = validate::run_for_target(&registry, target, options, agent.as_ref())?;
        any_failed |= !report.all_passed();
        println!("{}", output::render_validation_report(&report));
    }
    Ok(if any_failed { 1 } else { 0 })
}

fn run_clean(
    project_root: &std::path::Path,
    targets: Vec<String>,
    build_name: Option<String>,
    dry_run: bool,
) -> Result<i32, IntentcError> {
    let registry = TargetRegistry::load(project_root)?;
    let dag = DependencyDag::build_from_intents(&registry)?;
    let state = StateManager::new(project_root);
    state.initialize()?;
    let cleaner = crate::clean::Cleaner::new(&registry, &dag, &state);

    if targets.is_empty() {
        if let Some(name) = &build_name {
            let report = cleaner.clean_build(name, dry_run)?;
            println!("removed {} path(s)", report.removed.len());
            return Ok(0);
        }
        for target in registry.names() {
            let report = cleaner.clean_target(target, build_name.as_deref(), dry_run)?;
            for path in &report.removed {
                println!("removed {}", path.display());
            }
        }
        return Ok(0);
    }

    let resolved = resolve_targets(&registry, &targets);
    for target in &resolved {
        let report = cleaner.clean_target(target, build_name.as_deref(), dry_run)?;
        for path in &report.removed {
            println!("removed {}", path.display());
        }
    }
    Ok(0)
}

fn run_status(project_root: &std::path::Path, build_name: Option<String>) -> Result<i32, IntentcError> {
    let registry = TargetRegistry::load(project_root)?;
    let dag = DependencyDag::build_from_intents(&registry)?;
    let state = StateManager::new(project_root);

    let mut statuses = Vec::new();
    for name in registry.names() {
        let status = state.get_status(name, build_name.as_deref())?;
        statuses.push((name.clone(), status));
    }

    println!("{}", output::render_status_graph(&dag, &statuses));
    Ok(0)
}

fn run_graph(project_root: &std::path::Path) -> Result<i32, IntentcError> {
    let registry = TargetRegistry::load(project_root)?;
    let dag = DependencyDag::build_from_intents(&registry)?;
    println!("{}", dag.visualize());
    Ok(0)
}

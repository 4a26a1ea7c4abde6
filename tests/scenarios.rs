//! End-to-end scenarios from the base spec's testable-properties section:
//! S1 linear chain, S2 cycle, S3 missing dependency, S4 staleness after
//! intent edit, S5 mixed validation outcomes, S6 agent failure + retry.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use intentc::agent::mock::MockAgent;
use intentc::agent::{Agent, AgentOutput, AgentValidation, BuildContext};
use intentc::config::AgentConfig;
use intentc::dag::DependencyDag;
use intentc::error::IntentcError;
use intentc::orchestrator::Orchestrator;
use intentc::registry::TargetRegistry;
use intentc::state::{StateManager, TargetStatus};
use intentc::validate::{self, RunOptions};
use tempfile::tempdir;

fn write_intent(root: &Path, name: &str, deps: &[&str]) {
    let dir = root.join("intent").join(name);
    fs::create_dir_all(&dir).unwrap();
    let depends_on = if deps.is_empty() {
        String::new()
    } else {
        format!("Depends On: {}\n\n", deps.join(", "))
    };
    fs::write(
        dir.join(format!("{name}.ic")),
        format!("# {name}\n\n{depends_on}Produce the '{name}' output.\n"),
    )
    .unwrap();
}

fn default_agent_config() -> AgentConfig {
    AgentConfig {
        provider: "mock".to_string(),
        command: None,
        cli_args: Vec::new(),
        timeout: Duration::from_secs(5),
        retries: 0,
        rate_limit: Duration::from_secs(0),
    }
}

/// S1: a linear chain a <- b <- c builds in dependency order and every
/// target ends up Built with a recorded result.
#[test]
fn s1_linear_chain_builds_in_order() {
    let dir = tempdir().unwrap();
    write_intent(dir.path(), "a", &[]);
    write_intent(dir.path(), "b", &["a"]);
    write_intent(dir.path(), "c", &["b"]);

    let registry = TargetRegistry::load(dir.path()).unwrap();
    let dag = DependencyDag::build_from_intents(&registry).unwrap();
    let state = StateManager::new(dir.path());
    state.initialize().unwrap();
    let agent = MockAgent::new();

    let mut orchestrator = Orchestrator::new(&registry, &dag, &state, &agent, default_agent_config());
    let results = orchestrator.build(&["c".to_string()]).unwrap();

    assert_eq!(
        results.iter().map(|r| r.target.as_str()).collect::<Vec<_>>(),
        vec!["a", "b", "c"]
    );
    for target in ["a", "b", "c"] {
        assert_eq!(state.get_status(target, None).unwrap(), TargetStatus::Built);
        assert!(dir.path().join(format!("intent/{target}/{target}.out")).exists());
    }
}

/// S2: a cycle a -> b -> a is detected and neither build nor check can
/// proceed past it.
#[test]
fn s2_cycle_is_rejected() {
    let dir = tempdir().unwrap();
    write_intent(dir.path(), "a", &["b"]);
    write_intent(dir.path(), "b", &["a"]);

    let registry = TargetRegistry::load(dir.path()).unwrap();
    let dag = DependencyDag::build_from_intents(&registry).unwrap();

    let cycle = dag.detect_cycle().unwrap();
    assert_eq!(cycle.first(), cycle.last());
    assert!(matches!(dag.topological_sort(), Err(IntentcError::Graph(_))));
}

/// S3: declaring a dependency on a target that doesn't exist is a hard
/// error at graph-build time, naming both the missing name and requester.
#[test]
fn s3_missing_dependency_is_a_graph_error() {
    let dir = tempdir().unwrap();
    write_intent(dir.path(), "a", &["ghost"]);

    let registry = TargetRegistry::load(dir.path()).unwrap();
    let result = DependencyDag::build_from_intents(&registry);
    match result {
        Err(IntentcError::Graph(message)) => {
            assert!(message.contains("ghost"));
            assert!(message.contains('a'));
        }
        other => panic!("expected a graph error, got {other:?}"),
    }
}

/// S4: editing an intent after a successful build makes that target (and
/// only that target, here) stale on the next build.
#[test]
fn s4_editing_an_intent_makes_it_stale() {
    let dir = tempdir().unwrap();
    write_intent(dir.path(), "a", &[]);

    let registry = TargetRegistry::load(dir.path()).unwrap();
    let dag = DependencyDag::build_from_intents(&registry).unwrap();
    let state = StateManager::new(dir.path());
    state.initialize().unwrap();
    let agent = MockAgent::new();

    let mut orchestrator = Orchestrator::new(&registry, &dag, &state, &agent, default_agent_config());
    let first = orchestrator.build(&["a".to_string()]).unwrap();
    assert_eq!(first.len(), 1);

    let mut again = Orchestrator::new(&registry, &dag, &state, &agent, default_agent_config());
    assert!(again.build(&["a".to_string()]).unwrap().is_empty());

    std::thread::sleep(Duration::from_millis(1100));
    fs::write(
        dir.path().join("intent/a/a.ic"),
        "# a\n\nProduce a different 'a' output.\n",
    )
    .unwrap();

    let registry2 = TargetRegistry::load(dir.path()).unwrap();
    let dag2 = DependencyDag::build_from_intents(&registry2).unwrap();
    let mut rebuilt = Orchestrator::new(&registry2, &dag2, &state, &agent, default_agent_config());
    let second = rebuilt.build(&["a".to_string()]).unwrap();
    assert_eq!(second.len(), 1);
    assert!(second[0].success);
}

/// S5: a target with one passing and one failing check reports a mixed
/// outcome rather than an all-or-nothing result.
#[test]
fn s5_validation_reports_a_mixed_outcome() {
    let dir = tempdir().unwrap();
    let target_dir = dir.path().join("intent/a");
    fs::create_dir_all(&target_dir).unwrap();
    fs::write(target_dir.join("a.ic"), "# a\n\nProduce the 'a' output.\n").unwrap();
    fs::write(target_dir.join("a.out"), "hello from a").unwrap();
    fs::write(
        target_dir.join("a.icv"),
        "## output exists\nType: FileCheck\n\n\
         ### Parameters\n- file: a.out\n- contains: hello\n\n\
         ## output has unrelated content\nType: FileCheck\n\n\
         ### Parameters\n- file: a.out\n- contains: nonexistent-marker\n",
    )
    .unwrap();

    let registry = TargetRegistry::load(dir.path()).unwrap();
    let agent = MockAgent::new();
    let report = validate::run_for_target(&registry, "a", RunOptions::default(), &agent).unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.passed, 1);
    assert_eq!(report.failed, 1);
    assert!(!report.all_passed());
}

/// S5b: a check marked `Hidden: true` never runs but is still counted
/// toward the declared total (base spec §4.8).
#[test]
fn s5b_hidden_checks_are_skipped_but_counted() {
    let dir = tempdir().unwrap();
    let target_dir = dir.path().join("intent/a");
    fs::create_dir_all(&target_dir).unwrap();
    fs::write(target_dir.join("a.ic"), "# a\n\nProduce the 'a' output.\n").unwrap();
    fs::write(target_dir.join("a.out"), "hello from a").unwrap();
    fs::write(
        target_dir.join("a.icv"),
        "## output exists\nType: FileCheck\n\n\
         ### Parameters\n- file: a.out\n- contains: hello\n\n\
         ## hidden smoke check\nType: FileCheck\nHidden: true\n\n\
         ### Parameters\n- file: never-produced.out\n",
    )
    .unwrap();

    let registry = TargetRegistry::load(dir.path()).unwrap();
    let agent = MockAgent::new();
    let report = validate::run_for_target(&registry, "a", RunOptions::default(), &agent).unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.passed, 1);
    assert_eq!(report.failed, 0);
    assert!(report.all_passed());
}

/// S6: an agent that fails twice then succeeds is retried in place, with
/// the rate limit enforced as a minimum spacing between attempts.
#[test]
fn s6_agent_failure_is_retried_with_rate_limit_spacing() {
    let dir = tempdir().unwrap();
    write_intent(dir.path(), "a", &[]);

    let registry = TargetRegistry::load(dir.path()).unwrap();
    let dag = DependencyDag::build_from_intents(&registry).unwrap();
    let state = StateManager::new(dir.path());
    state.initialize().unwrap();

    struct FailsTwice(AtomicU32);
    impl Agent for FailsTwice {
        fn generate(&self, ctx: &BuildContext) -> Result<AgentOutput, IntentcError> {
            let attempt = self.0.fetch_add(1, Ordering::SeqCst);
            if attempt < 2 {
                Err(IntentcError::Agent("rate limited, try again".to_string()))
            } else {
                MockAgent::new().generate(ctx)
            }
        }
        fn validate(
            &self,
            _ctx: &BuildContext,
            _check: &intentc::parser::validation::Validation,
        ) -> Result<AgentValidation, IntentcError> {
            unreachable!()
        }
        fn decompile(&self, _ctx: &BuildContext) -> Result<String, IntentcError> {
            unreachable!()
        }
    }

    let agent = FailsTwice(AtomicU32::new(0));
    let agent_config = AgentConfig {
        retries: 2,
        rate_limit: Duration::from_millis(30),
        ..default_agent_config()
    };

    let start = std::time::Instant::now();
    let mut orchestrator = Orchestrator::new(&registry, &dag, &state, &agent, agent_config);
    let results = orchestrator.build(&["a".to_string()]).unwrap();
    let elapsed = start.elapsed();

    assert_eq!(results.len(), 1);
    assert!(results[0].success);
    assert_eq!(agent.0.load(Ordering::SeqCst), 3);
    assert!(elapsed >= Duration::from_millis(60));
}

//! Deterministic mock agent used by tests and by `provider: mock` in
//! `config.yaml` (base spec §6). It never shells out; it writes a small
//! `<target>.out` file derived from the intent's content hash, so repeated
//! builds of an unchanged intent produce byte-identical output.

use std::fs;

use sha2::{Digest, Sha256};

use crate::agent::{Agent, AgentOutput, AgentValidation, BuildContext};
use crate::error::IntentcError;
use crate::parser::validation::Validation;

#[derive(Debug, Default)]
pub struct MockAgent;

impl MockAgent {
    pub fn new() -> MockAgent {
        MockAgent
    }

    fn content_hash(ctx: &BuildContext) -> String {
        let mut hasher = Sha256::new();
        hasher.update(ctx.intent.raw_content.as_bytes());
        for (name, path) in &ctx.dependency_outputs {
            hasher.update(name.as_bytes());
            hasher.update(path.to_string_lossy().as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

impl Agent for MockAgent {
    fn generate(&self, ctx: &BuildContext) -> Result<AgentOutput, IntentcError> {
        fs::create_dir_all(&ctx.output_dir)?;
        let hash = Self::content_hash(ctx);
        let file_name = format!("{}.out", ctx.target);
        let body = format!(
            "generated by mock agent\ntarget: {}\nintent_hash: {}\n",
            ctx.target, hash
        );
        fs::write(ctx.output_dir.join(&file_name), &body)?;
        Ok(AgentOutput {
            files: vec![file_name],
            log: format!("mock agent generated '{}' (hash {})", ctx.target, hash),
        })
    }

    fn validate(&self, _ctx: &BuildContext, check: &Validation) -> Result<AgentValidation, IntentcError> {
        Ok(AgentValidation {
            passed: true,
            message: format!(
                "mock agent: simulated success for {} '{}'",
                check.check_type.as_str(),
                check.name
            ),
            skipped: false,
        })
    }

    fn decompile(&self, ctx: &BuildContext) -> Result<String, IntentcError> {
        Ok(format!(
            "# {}\n\nDescribe what '{}' should produce.\n",
            ctx.target, ctx.target
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tests::sample_context;
    use tempfile::tempdir;

    #[test]
    fn generate_writes_deterministic_output_for_unchanged_intent() {
        let dir = tempdir().unwrap();
        let mut ctx = sample_context("a");
        ctx.output_dir = dir.path().join("a");

        let agent = MockAgent::new();
        let first = agent.generate(&ctx).unwrap();
        let first_body = fs::read_to_string(ctx.output_dir.join(&first.files[0])).unwrap();

        fs::remove_dir_all(&ctx.output_dir).unwrap();
        let second = agent.generate(&ctx).unwrap();
        let second_body = fs::read_to_string(ctx.output_dir.join(&second.files[0])).unwrap();

        assert_eq!(first_body, second_body);
    }

    #[test]
    fn validate_always_simulates_success() {
        use crate::parser::validation::CheckType;
        use std::collections::BTreeMap;

        let ctx = sample_context("a");
        let agent = MockAgent::new();
        let check = Validation {
            name: "reachable".to_string(),
            check_type: CheckType::WebCheck,
            description: String::new(),
            parameters: BTreeMap::new(),
            hidden: false,
        };

        let result = agent.validate(&ctx, &check).unwrap();
        assert!(result.passed);
        assert!(!result.skipped);
    }
}

//! `.intentc/config.yaml` loading (base spec §6, expanded §A2).
//!
//! Every field defaults so a missing or partial config file is never an
//! error — only a malformed YAML document is.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::IntentcError;

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub version: u32,
    pub agent: AgentConfig,
    pub build: BuildConfig,
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            version: 1,
            agent: AgentConfig::default(),
            build: BuildConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub provider: String,
    pub command: Option<String>,
    pub cli_args: Vec<String>,
    #[serde(deserialize_with = "deserialize_duration", default = "default_timeout")]
    pub timeout: Duration,
    pub retries: u32,
    #[serde(
        deserialize_with = "deserialize_duration",
        default = "default_rate_limit"
    )]
    pub rate_limit: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            provider: "mock".to_string(),
            command: None,
            cli_args: Vec::new(),
            timeout: default_timeout(),
            retries: 0,
            rate_limit: default_rate_limit(),
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_rate_limit() -> Duration {
    Duration::from_secs(0)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub parallel: bool,
    pub cache_enabled: bool,
    pub default_build_name: Option<String>,
    /// Whether `build` should commit each successfully-built target via the
    /// detected VCS backend (DESIGN.md: "commit grouping on build").
    pub auto_commit: bool,
    pub commit_message_prefix: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            parallel: false,
            cache_enabled: true,
            default_build_name: None,
            auto_commit: false,
            commit_message_prefix: "intentc build: ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub sinks: Vec<LogSink>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            sinks: vec![LogSink {
                sink_type: "stderr".to_string(),
                colorize: true,
            }],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSink {
    #[serde(rename = "type")]
    pub sink_type: String,
    #[serde(default)]
    pub colorize: bool,
}

/// Accept either a bare integer (seconds) or a human duration string
/// (`"30s"`, `"2m"`, `"1h"`) for `timeout`/`rate_limit`.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DurationForm {
        Seconds(u64),
        Human(String),
    }

    match DurationForm::deserialize(deserializer)? {
        DurationForm::Seconds(secs) => Ok(Duration::from_secs(secs)),
        DurationForm::Human(text) => {
            parse_human_duration(&text).map_err(serde::de::Error::custom)
        }
    }
}

fn parse_human_duration(text: &str) -> Result<Duration, String> {
    let text = text.trim();
    let (number_part, unit) = text.split_at(
        text.find(|c: char| !c.is_ascii_digit())
            .unwrap_or(text.len()),
    );
    let value: u64 = number_part
        .parse()
        .map_err(|_| format!("invalid duration '{text}'"))?;
    let secs = match unit {
        "" | "s" => value,
        "m" => value * 60,
        "h" => value * 3600,
        other => return Err(format!("unknown duration unit '{other}' in '{text}'")),
    };
    Ok(Duration::from_secs(secs))
}

impl EngineConfig {
    /// Load `<project>/.intentc/config.yaml`. A missing file yields defaults.
    pub fn load(project_root: &Path) -> Result<EngineConfig, IntentcError> {
        let path = project_root.join(".intentc").join("config.yaml");
        if !path.exists() {
            return Ok(EngineConfig::default());
        }
        let text = std::fs::read_to_string(&path)?;
        if text.trim().is_empty() {
            return Ok(EngineConfig::default());
        }
        let config: EngineConfig = serde_yaml::from_str(&text)?;
        Ok(config)
    }
}

//! Canonical error type for all intentc operations.
//!
//! This module defines the error type returned by every fallible operation in
//! the engine. Subsystems return `Result<T, IntentcError>`; the CLI layer is
//! the only place that converts this into human-formatted text and an exit
//! code.

use std::io;
use thiserror::Error;

/// Canonical error type for intentc's build/state engine.
#[derive(Error, Debug)]
pub enum IntentcError {
    /// I/O error (auto-converts from `std::io::Error`).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// State file was valid UTF-8 but not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `.intentc/config.yaml` failed to parse.
    #[error("config error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Discovery errors: multiple `.ic` files in a feature directory, an
    /// unreadable intent file, or a malformed `.ic`/`.icv` document.
    #[error("discovery error: {0}")]
    Discovery(String),

    /// Graph errors: a missing dependency or a cycle in the intent graph.
    #[error("graph error: {0}")]
    Graph(String),

    /// Named target, validation type, or build name does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Agent invocation failed after exhausting retries.
    #[error("agent error: {0}")]
    Agent(String),

    /// State directory/file is inconsistent (legacy single-file `.intentc`,
    /// corrupt status map, etc).
    #[error("state error: {0}")]
    State(String),

    /// A VCS-backed action was requested but the adapter could not perform it.
    #[error("vcs error: {0}")]
    Vcs(String),

    /// A single validation check failed to execute (not the same as the
    /// check reporting a failed assertion — that is a `ValidationResult`).
    #[error("validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_prefixed_by_kind() {
        assert_eq!(
            format!("{}", IntentcError::Graph("cycle: a -> b -> a".into())),
            "graph error: cycle: a -> b -> a"
        );
        assert_eq!(
            format!("{}", IntentcError::NotFound("y".into())),
            "not found: y"
        );
    }

    #[test]
    fn io_error_converts_via_from() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: IntentcError = io_err.into();
        assert!(matches!(err, IntentcError::Io(_)));
    }
}

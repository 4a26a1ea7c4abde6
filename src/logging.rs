//! Leveled diagnostic logging (base spec §A3), separate from the
//! human-facing report in [`crate::output`].
//!
//! Grounded on `web3infra-foundation-git-internal`'s
//! `tracing_subscriber::fmt::Subscriber::builder()...try_init()` pattern —
//! the teacher itself has no logging crate, so this is learned from the
//! rest of the retrieval pack.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install a global `tracing` subscriber from `logging.level`/`logging.sinks`.
/// Safe to call more than once (e.g. across repeated test setup) — only the
/// first call wins, later ones are silently ignored via `try_init`.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let colorize = config
        .sinks
        .iter()
        .find(|s| s.sink_type == "stderr")
        .map(|s| s.colorize)
        .unwrap_or(true);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(colorize)
        .with_writer(std::io::stderr)
        .try_init();
}

//! Shared timestamp and generation-id helpers.

use ulid::Ulid;

/// Returns unix-epoch seconds with a `Z` suffix (e.g. `1771220592Z`), used
/// for every `generated_at` field that the engine itself stamps.
pub fn now_epoch_z() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{secs}Z")
}

/// A fresh opaque generation id. Implementations of the agent contract are
/// free to derive their own (typically from a VCS commit hash); this is the
/// fallback the orchestrator uses when no VCS is present.
pub fn new_generation_id() -> String {
    Ulid::new().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_epoch_z_format() {
        let stamp = now_epoch_z();
        assert!(stamp.ends_with('Z'));
        assert!(stamp.trim_end_matches('Z').parse::<u64>().is_ok());
    }

    #[test]
    fn generation_ids_are_unique() {
        assert_ne!(new_generation_id(), new_generation_id());
    }
}

//! Human-facing report rendering (base spec §A3: kept separate from the
//! leveled diagnostic log).
//!
//! Grounded on the teacher's `compact_line`/`preview_messages` helpers in
//! `src/core/output.rs` and its `colored::Colorize` usage for PASS/FAIL/WARN
//! lines in `src/core/tui.rs`.

use colored::Colorize;

use crate::dag::{DependencyDag, NodeStatus};
use crate::state::{BuildResult, TargetStatus};
use crate::validate::ValidationReport;

/// Collapse whitespace and bound length, as the teacher does for terminal
/// previews of arbitrary-length text (e.g. an agent's stderr).
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{preview}...")
    } else {
        preview
    }
}

fn status_icon(status: TargetStatus) -> NodeStatus {
    match status {
        TargetStatus::Built => NodeStatus::Built,
        TargetStatus::Failed => NodeStatus::Failed,
        TargetStatus::Pending => NodeStatus::Pending,
        TargetStatus::Building => NodeStatus::Building,
        TargetStatus::Outdated => NodeStatus::Outdated,
    }
}

/// One line per build result: `[✓] target` or `[✗] target: <error>`.
pub fn render_build_results(results: &[BuildResult]) -> String {
    let mut lines = Vec::new();
    for result in results {
        if result.success {
            lines.push(format!("{} {}", "[✓]".green(), result.target));
        } else {
            let error = result
                .error
                .as_deref()
                .map(|e| compact_line(e, 120))
                .unwrap_or_default();
            lines.push(format!("{} {}: {}", "[✗]".red(), result.target, error));
        }
    }
    lines.join("\n")
}

/// A validation report as PASS/FAIL lines, matching the teacher's gate
/// output register.
pub fn render_validation_report(report: &ValidationReport) -> String {
    let mut lines = vec![format!(
        "{} ({} passed, {} failed, {} total)",
        report.target, report.passed, report.failed, report.total
    )];
    for result in &report.results {
        let tag = if result.passed {
            "PASS".green()
        } else {
            "FAIL".red()
        };
        lines.push(format!(
            "  {} {} [{}]: {}",
            tag,
            result.name,
            result.check_type.as_str(),
            compact_line(&result.message, 120)
        ));
    }
    for (name, message) in &report.errors {
        lines.push(format!("  {} {}: {}", "ERROR".red(), name, compact_line(message, 120)));
    }
    lines.join("\n")
}

/// Render the dependency graph with each node's current status icon.
pub fn render_status_graph(dag: &DependencyDag, statuses: &[(String, TargetStatus)]) -> String {
    dag.visualize_with_status(|name| {
        statuses
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, status)| status_icon(*status))
    })
}

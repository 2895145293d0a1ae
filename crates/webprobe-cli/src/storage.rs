//! Run artifacts: workspace snapshot with results, text report, JSON summary
//!
//! `--save` writes the workspace back with the run's results attached, so
//! `webprobe report -w` can render it later without re-probing.

use std::path::Path;
use std::time::Duration;

use webprobe_core::{Severity, Summary, TestResult, Workspace, WorkspaceError, render_report};

/// Save `workspace` with `results` replacing its stored results.
pub fn save_workspace(
    workspace: &Workspace,
    results: &[TestResult],
    path: &Path,
) -> Result<(), WorkspaceError> {
    let mut snapshot = workspace.clone();
    snapshot.results = results.to_vec();
    snapshot.save(path)
}

/// Write the plain-text report, creating parent directories.
pub fn write_report(results: &[TestResult], path: &Path) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_report(results))
}

/// Exit code for a result set: the worst severity's code, 0 when empty.
pub fn exit_code(results: &[TestResult]) -> i32 {
    Summary::of(results).worst().map_or(0, Severity::exit_code)
}

/// Machine-readable summary for `--output json`.
pub fn summary_json(results: &[TestResult], shown: &[TestResult], wall: Duration) -> serde_json::Value {
    let summary = Summary::of(results);
    serde_json::json!({
        "verdict": {
            "worst": summary.worst().map(Severity::as_str),
            "exit_code": exit_code(results),
        },
        "stats": {
            "total": summary.total(),
            "ok": summary.ok,
            "warning": summary.warning,
            "danger": summary.danger,
            "critical": summary.critical,
        },
        "meta": {
            "duration_secs": wall.as_secs_f64(),
            "response_time_secs": summary.total_time.as_secs_f64(),
        },
        "results": shown,
    })
}

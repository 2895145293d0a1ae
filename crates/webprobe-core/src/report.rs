//! Plain-text test report
//!
//! ```text
//! Testing Report
//!
//! Endpoint                        Severity  Verdict                 Response time
//! POST http://localhost/login     Critical  Unmatched body type     12ms
//!
//! Total response time for tests: 12ms
//! Result count (Ok/Warning/Danger/Critical): 0/0/0/1
//! ```

use std::fmt::Write;
use std::time::Duration;

use crate::verdict::{Severity, TestResult};

/// Per-severity tallies and total elapsed time of a result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub ok: usize,
    pub warning: usize,
    pub danger: usize,
    pub critical: usize,
    pub total_time: Duration,
}

impl Summary {
    #[must_use]
    pub fn of(results: &[TestResult]) -> Self {
        results.iter().fold(Self::default(), |mut s, r| {
            match r.severity {
                Severity::Ok => s.ok += 1,
                Severity::Warning => s.warning += 1,
                Severity::Danger => s.danger += 1,
                Severity::Critical => s.critical += 1,
            }
            s.total_time += r.elapsed;
            s
        })
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.ok + self.warning + self.danger + self.critical
    }

    /// Highest severity present, `None` for an empty set.
    #[must_use]
    pub const fn worst(&self) -> Option<Severity> {
        if self.critical > 0 {
            Some(Severity::Critical)
        } else if self.danger > 0 {
            Some(Severity::Danger)
        } else if self.warning > 0 {
            Some(Severity::Warning)
        } else if self.ok > 0 {
            Some(Severity::Ok)
        } else {
            None
        }
    }
}

/// `850µs`, `12ms`, `3s`
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 0.001 {
        format!("{}µs", elapsed.as_micros())
    } else if secs < 1.0 {
        format!("{}ms", (secs * 1000.0).round() as u64)
    } else {
        format!("{}s", secs.round() as u64)
    }
}

/// Render the report table for `results` in the order given.
#[must_use]
pub fn render_report(results: &[TestResult]) -> String {
    let rows: Vec<[String; 4]> = results
        .iter()
        .map(|r| {
            [
                r.endpoint.label(),
                r.severity.to_string(),
                r.verdict.clone(),
                format_elapsed(r.elapsed),
            ]
        })
        .collect();

    let header = ["Endpoint", "Severity", "Verdict", "Response time"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::from("Testing Report\n\n");
    push_row(&mut out, &header.map(String::from), &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }

    let summary = Summary::of(results);
    let _ = writeln!(
        out,
        "\nTotal response time for tests: {}",
        format_elapsed(summary.total_time)
    );
    let _ = writeln!(
        out,
        "Result count (Ok/Warning/Danger/Critical): {}/{}/{}/{}",
        summary.ok, summary.warning, summary.danger, summary.critical
    );
    out
}

fn push_row(out: &mut String, cells: &[String; 4], widths: &[usize; 4]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &w)| format!("{cell:<w$}"))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::endpoint::Endpoint;
    use crate::verdict::ProbeKind;

    fn result(severity: Severity, verdict: &str, elapsed: Duration) -> TestResult {
        let mut r = TestResult::skipped(Arc::new(Endpoint::default()), ProbeKind::Match, verdict);
        r.severity = severity;
        r.elapsed = elapsed;
        r
    }

    #[test]
    fn elapsed_units() {
        assert_eq!(format_elapsed(Duration::from_micros(850)), "850µs");
        assert_eq!(format_elapsed(Duration::from_millis(12)), "12ms");
        assert_eq!(format_elapsed(Duration::from_millis(2600)), "3s");
    }

    #[test]
    fn summary_counts_and_worst() {
        let results = vec![
            result(Severity::Ok, "a", Duration::from_millis(10)),
            result(Severity::Danger, "b", Duration::from_millis(20)),
            result(Severity::Ok, "c", Duration::from_millis(30)),
        ];
        let s = Summary::of(&results);
        assert_eq!((s.ok, s.warning, s.danger, s.critical), (2, 0, 1, 0));
        assert_eq!(s.total(), 3);
        assert_eq!(s.total_time, Duration::from_millis(60));
        assert_eq!(s.worst(), Some(Severity::Danger));
        assert_eq!(Summary::default().worst(), None);
    }

    #[test]
    fn report_lists_every_result() {
        let results = vec![
            result(Severity::Critical, "Unmatched body type", Duration::from_millis(12)),
            result(Severity::Ok, "Got expected response", Duration::from_millis(2)),
        ];
        let text = render_report(&results);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Testing Report");
        assert!(lines[2].starts_with("Endpoint"));
        assert!(lines[3].starts_with("GET https://example.com/some/action"));
        assert!(lines[3].contains("Critical"));
        assert!(lines[3].ends_with("12ms"));
        assert!(lines[4].contains("Got expected response"));
        assert!(text.contains("Total response time for tests: 14ms"));
        assert!(text.contains("Result count (Ok/Warning/Danger/Critical): 1/0/0/1"));
    }

    #[test]
    fn columns_are_aligned() {
        let results = vec![
            result(Severity::Ok, "short", Duration::from_millis(1)),
            result(Severity::Critical, "a much longer verdict", Duration::from_millis(1)),
        ];
        let text = render_report(&results);
        let rows: Vec<&str> = text.lines().skip(2).take(3).collect();
        let col = rows[0].find("Response time").unwrap();
        assert_eq!(rows[1].find("1ms").unwrap(), col);
        assert_eq!(rows[2].find("1ms").unwrap(), col);
    }
}

//! Human-readable rendering of a batch report.

use crate::core::{BatchReport, ScanOutcome};

use std::fmt::Write;

/// Renders the report as plain text, one block per target.
///
/// Findings are listed most severe first.
pub fn render_text(report: &BatchReport) -> String {
    let mut out = String::new();

    for outcome in report.outcomes.values() {
        let target = outcome.target();
        match outcome {
            ScanOutcome::Success(s) => {
                let name = s.display_name.as_deref().unwrap_or(target.id());
                let _ = writeln!(
                    out,
                    "{} ok ({} {})",
                    name,
                    s.findings.len(),
                    plural(s.findings.len(), "finding", "findings")
                );
                let mut findings: Vec<_> = s.findings.iter().collect();
                findings.sort_by(|a, b| b.severity.rank().cmp(&a.severity.rank()));
                for finding in findings {
                    let _ = writeln!(
                        out,
                        "  [{}] {} in '{}'",
                        finding.severity, finding.title, finding.module_name
                    );
                }
                if let Some(warning) = &s.monitor_warning {
                    let _ = writeln!(out, "  monitor skipped: {}", warning);
                }
            }
            ScanOutcome::Failure(f) => {
                let _ = writeln!(out, "{} FAILED ({})", target, f.kind);
                let _ = writeln!(out, "  {}", f.cause);
            }
        }
    }

    let counts = report.severity_counts();
    let failed = report.failures().count();
    let _ = writeln!(
        out,
        "\n{} {} scanned, {} failed, {} {} (critical: {}, high: {}, medium: {}, low: {}, other: {}) in {:.1}s",
        report.len(),
        plural(report.len(), "target", "targets"),
        failed,
        counts.total(),
        plural(counts.total(), "finding", "findings"),
        counts.critical,
        counts.high,
        counts.medium,
        counts.low,
        counts.other,
        report.duration.as_secs_f64(),
    );
    let _ = writeln!(out, "status: {}", report.status().as_str());

    out
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        FailureKind, Finding, ScanFailure, ScanSuccess, ScanTarget, Severity,
    };
    use chrono::Utc;

    #[test]
    fn test_render_text() {
        let mut report = BatchReport::new();
        report.insert(
            ScanSuccess::new(
                ScanTarget::remote("repoA"),
                vec![Finding::new("Prototype Pollution", Severity::High, "lodash")],
                Utc::now(),
            )
            .with_monitor_warning("monitor failed: offline")
            .into(),
        );
        report.insert(
            ScanFailure::new(
                ScanTarget::remote("repoB"),
                FailureKind::Fetch,
                "authentication failed",
                Utc::now(),
            )
            .into(),
        );
        report.finish();

        let text = render_text(&report);
        assert!(text.contains("repoA ok (1 finding)"));
        assert!(text.contains("  [high] Prototype Pollution in 'lodash'"));
        assert!(text.contains("monitor skipped: monitor failed: offline"));
        assert!(text.contains("repoB FAILED (fetch)"));
        assert!(text.contains("2 targets scanned, 1 failed, 1 finding"));
        assert!(text.contains("status: partial_failure"));
    }

    #[test]
    fn test_findings_listed_most_severe_first() {
        let mut report = BatchReport::new();
        report.insert(
            ScanSuccess::new(
                ScanTarget::remote("repoA"),
                vec![
                    Finding::new("Information Exposure", Severity::Low, "debug"),
                    Finding::new("Advisory", "informational", "left-pad"),
                    Finding::new("Remote Code Execution", Severity::Critical, "ejs"),
                    Finding::new("Prototype Pollution", Severity::High, "lodash"),
                ],
                Utc::now(),
            )
            .into(),
        );

        let text = render_text(&report);
        let order: Vec<_> = ["ejs", "lodash", "debug", "left-pad"]
            .iter()
            .map(|m| text.find(&format!("'{}'", m)).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_render_empty() {
        let mut report = BatchReport::new();
        report.finish();
        let text = render_text(&report);
        assert!(text.contains("0 targets scanned, 0 failed, 0 findings"));
        assert!(text.contains("status: ok"));
    }

    #[test]
    fn test_display_name_used() {
        let mut report = BatchReport::new();
        report.insert(
            ScanSuccess::new(ScanTarget::project(7), Vec::new(), Utc::now())
                .with_display_name(Some("acme/api".into()))
                .into(),
        );
        let text = render_text(&report);
        assert!(text.contains("acme/api ok (0 findings)"));
    }
}

//! JSON rendering of a batch report.

use crate::core::{
    BatchReport, BatchStatus, FailureKind, Finding, ScanOutcome, SeverityCounts, TargetKind,
};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Serializable view of a [`BatchReport`] without raw scanner output.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    /// Batch identifier.
    pub id: &'a str,
    /// Aggregate status.
    pub status: BatchStatus,
    /// When the batch started.
    pub started_at: DateTime<Utc>,
    /// When the batch finished.
    pub completed_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Totals across all targets.
    pub summary: JsonSummary,
    /// One entry per target, sorted by identity.
    pub targets: Vec<JsonTarget<'a>>,
}

/// Batch totals.
#[derive(Debug, Serialize)]
pub struct JsonSummary {
    /// Number of targets.
    pub targets: usize,
    /// Targets scanned successfully.
    pub succeeded: usize,
    /// Targets that failed.
    pub failed: usize,
    /// Total findings.
    pub findings: usize,
    /// Findings by severity.
    pub severity: SeverityCounts,
}

/// One target's entry in the JSON report.
#[derive(Debug, Serialize)]
pub struct JsonTarget<'a> {
    /// Target identity.
    pub target: &'a str,
    /// Target kind.
    pub kind: &'a TargetKind,
    /// `success` or `failure`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Name from a project lookup.
    pub display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Findings, for successful targets.
    pub findings: Option<&'a [Finding]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Monitor output.
    pub monitor_report: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Why the monitor step failed.
    pub monitor_warning: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Failure classification.
    pub failure_kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Failure cause.
    pub cause: Option<&'a str>,
    /// Pipeline duration in milliseconds.
    pub duration_ms: u64,
}

impl<'a> From<&'a ScanOutcome> for JsonTarget<'a> {
    fn from(outcome: &'a ScanOutcome) -> Self {
        let target = outcome.target();
        let duration_ms = millis(outcome.duration());
        match outcome {
            ScanOutcome::Success(s) => Self {
                target: target.id(),
                kind: &target.kind,
                status: "success",
                display_name: s.display_name.as_deref(),
                findings: Some(s.findings.as_slice()),
                monitor_report: s.monitor_report.as_deref(),
                monitor_warning: s.monitor_warning.as_deref(),
                failure_kind: None,
                cause: None,
                duration_ms,
            },
            ScanOutcome::Failure(f) => Self {
                target: target.id(),
                kind: &target.kind,
                status: "failure",
                display_name: None,
                findings: None,
                monitor_report: None,
                monitor_warning: None,
                failure_kind: Some(f.kind),
                cause: Some(f.cause.as_str()),
                duration_ms,
            },
        }
    }
}

impl<'a> From<&'a BatchReport> for JsonReport<'a> {
    fn from(report: &'a BatchReport) -> Self {
        Self {
            id: &report.id,
            status: report.status(),
            started_at: report.started_at,
            completed_at: report.completed_at,
            duration_ms: millis(report.duration),
            summary: JsonSummary {
                targets: report.len(),
                succeeded: report.successes().count(),
                failed: report.failures().count(),
                findings: report.total_findings(),
                severity: report.severity_counts(),
            },
            targets: report.outcomes.values().map(JsonTarget::from).collect(),
        }
    }
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Renders the report as pretty-printed JSON.
pub fn render_json(report: &BatchReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonReport::from(report))
}

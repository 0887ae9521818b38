//! Audit event types and emission functions.

use crate::core::{BatchReport, ScanOutcome, ScanTarget};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base trait for audit events.
pub trait AuditEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Audit event for a finished target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetAuditEvent {
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Batch the target belongs to.
    pub batch_id: String,

    /// Target identity.
    pub target: String,

    /// `success` or `failure`.
    pub outcome: String,

    /// Failure kind, for failures.
    pub failure_kind: Option<String>,

    /// Number of findings, for successes.
    pub finding_count: usize,

    /// Whether the monitor step reported a problem.
    pub monitor_warning: bool,

    /// Pipeline duration in milliseconds.
    pub duration_ms: u64,
}

impl TargetAuditEvent {
    /// Builds the event for an outcome.
    pub fn from_outcome(batch_id: &str, outcome: &ScanOutcome) -> Self {
        let (result, failure_kind, finding_count, monitor_warning) = match outcome {
            ScanOutcome::Success(s) => (
                "success",
                None,
                s.findings.len(),
                s.monitor_warning.is_some(),
            ),
            ScanOutcome::Failure(f) => ("failure", Some(f.kind.to_string()), 0, false),
        };

        Self {
            timestamp: Utc::now(),
            batch_id: batch_id.to_string(),
            target: outcome.target().id().to_string(),
            outcome: result.to_string(),
            failure_kind,
            finding_count,
            monitor_warning,
            duration_ms: outcome.duration().as_millis() as u64,
        }
    }
}

impl AuditEvent for TargetAuditEvent {
    fn event_type(&self) -> &'static str {
        "target_completed"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Audit event for a finished batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAuditEvent {
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Batch ID.
    pub batch_id: String,

    /// `ok` or `partial_failure`.
    pub status: String,

    /// Number of targets.
    pub target_count: usize,

    /// Number of successful targets.
    pub success_count: usize,

    /// Number of failed targets.
    pub failure_count: usize,

    /// Findings across all successful targets.
    pub finding_count: usize,

    /// Batch duration in milliseconds.
    pub duration_ms: u64,
}

impl From<&BatchReport> for BatchAuditEvent {
    fn from(report: &BatchReport) -> Self {
        Self {
            timestamp: Utc::now(),
            batch_id: report.id.clone(),
            status: report.status().as_str().to_string(),
            target_count: report.len(),
            success_count: report.successes().count(),
            failure_count: report.failures().count(),
            finding_count: report.total_findings(),
            duration_ms: report.duration.as_millis() as u64,
        }
    }
}

impl AuditEvent for BatchAuditEvent {
    fn event_type(&self) -> &'static str {
        "batch_completed"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits an audit event for a batch starting.
pub fn emit_batch_started(batch_id: &str, target_count: usize, workers: usize) {
    tracing::info!(
        target: "scanfleet::audit",
        event_type = "batch_started",
        batch_id = %batch_id,
        target_count,
        workers,
        "Batch started"
    );
}

/// Emits an audit event for a target being dispatched to a worker.
pub fn emit_target_started(batch_id: &str, target: &ScanTarget, worker_id: usize) {
    tracing::info!(
        target: "scanfleet::audit",
        event_type = "target_started",
        batch_id = %batch_id,
        scan_target = %target.locator,
        kind = ?target.kind,
        worker_id,
        "Target started"
    );
}

/// Emits an audit event for a finished target.
pub fn emit_target_completed(batch_id: &str, outcome: &ScanOutcome) {
    let event = TargetAuditEvent::from_outcome(batch_id, outcome);

    tracing::info!(
        target: "scanfleet::audit",
        event_type = event.event_type(),
        batch_id = %event.batch_id,
        scan_target = %event.target,
        outcome = %event.outcome,
        failure_kind = ?event.failure_kind,
        finding_count = event.finding_count,
        monitor_warning = event.monitor_warning,
        duration_ms = event.duration_ms,
        "Target completed"
    );
}

/// Emits an audit event for a finished batch.
pub fn emit_batch_completed(report: &BatchReport) {
    let event = BatchAuditEvent::from(report);

    tracing::info!(
        target: "scanfleet::audit",
        event_type = event.event_type(),
        batch_id = %event.batch_id,
        status = %event.status,
        target_count = event.target_count,
        success_count = event.success_count,
        failure_count = event.failure_count,
        finding_count = event.finding_count,
        duration_ms = event.duration_ms,
        "Batch completed"
    );
}

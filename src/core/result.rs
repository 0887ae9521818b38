//! Scan outcome and batch report structures.
//!
//! Every target in a batch produces exactly one [`ScanOutcome`]. The
//! [`BatchReport`] keys those outcomes by target identity so the report is
//! independent of the order in which workers finished.

use crate::core::error::{FailureKind, PipelineError};
use crate::core::types::{Finding, ScanTarget, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// A target that was scanned to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSuccess {
    /// The scanned target.
    pub target: ScanTarget,

    /// Findings in the order the scanner reported them.
    pub findings: Vec<Finding>,

    /// Raw scanner output. Empty when the scan command was unsupported.
    #[serde(with = "raw_output_serde")]
    pub raw_output: Vec<u8>,

    /// Output of the monitor command, if it ran and succeeded.
    pub monitor_report: Option<String>,

    /// Why the monitor command failed, if it did.
    pub monitor_warning: Option<String>,

    /// Display name from a project lookup.
    pub display_name: Option<String>,

    /// When the pipeline started.
    pub started_at: DateTime<Utc>,

    /// When the pipeline finished.
    pub completed_at: DateTime<Utc>,

    /// How long the pipeline took.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl ScanSuccess {
    /// Creates a success with the given findings and timing.
    pub fn new(target: ScanTarget, findings: Vec<Finding>, started_at: DateTime<Utc>) -> Self {
        let completed_at = Utc::now();
        Self {
            target,
            findings,
            raw_output: Vec::new(),
            monitor_report: None,
            monitor_warning: None,
            display_name: None,
            started_at,
            completed_at,
            duration: elapsed(started_at, completed_at),
        }
    }

    /// Sets the raw scanner output.
    pub fn with_raw_output(mut self, raw: Vec<u8>) -> Self {
        self.raw_output = raw;
        self
    }

    /// Sets the monitor report.
    pub fn with_monitor_report(mut self, report: impl Into<String>) -> Self {
        self.monitor_report = Some(report.into());
        self
    }

    /// Sets the monitor warning.
    pub fn with_monitor_warning(mut self, warning: impl Into<String>) -> Self {
        self.monitor_warning = Some(warning.into());
        self
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        self.display_name = name;
        self
    }
}

/// A target that could not be scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanFailure {
    /// The target that failed.
    pub target: ScanTarget,

    /// Failure classification.
    pub kind: FailureKind,

    /// Human-readable cause.
    pub cause: String,

    /// When the pipeline started.
    pub started_at: DateTime<Utc>,

    /// When the failure was recorded.
    pub completed_at: DateTime<Utc>,

    /// How long the pipeline ran before failing.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl ScanFailure {
    /// Creates a failure from a pipeline error.
    pub fn from_error(target: ScanTarget, error: &PipelineError, started_at: DateTime<Utc>) -> Self {
        Self::new(target, error.kind(), error.to_string(), started_at)
    }

    /// Creates a failure with an explicit kind and cause.
    pub fn new(
        target: ScanTarget,
        kind: FailureKind,
        cause: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let completed_at = Utc::now();
        Self {
            target,
            kind,
            cause: cause.into(),
            started_at,
            completed_at,
            duration: elapsed(started_at, completed_at),
        }
    }
}

/// The per-target result of a scan pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// The target was scanned.
    Success(ScanSuccess),
    /// The target failed.
    Failure(ScanFailure),
}

impl ScanOutcome {
    /// Returns the target this outcome belongs to.
    pub fn target(&self) -> &ScanTarget {
        match self {
            Self::Success(s) => &s.target,
            Self::Failure(f) => &f.target,
        }
    }

    /// Returns `true` for a successful outcome.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns `true` for a failed outcome.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Returns the findings of a successful outcome.
    pub fn findings(&self) -> Option<&[Finding]> {
        match self {
            Self::Success(s) => Some(&s.findings),
            Self::Failure(_) => None,
        }
    }

    /// Returns the failure kind of a failed outcome.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(f) => Some(f.kind),
        }
    }

    /// Returns how long the pipeline ran.
    pub fn duration(&self) -> Duration {
        match self {
            Self::Success(s) => s.duration,
            Self::Failure(f) => f.duration,
        }
    }
}

impl From<ScanSuccess> for ScanOutcome {
    fn from(s: ScanSuccess) -> Self {
        Self::Success(s)
    }
}

impl From<ScanFailure> for ScanOutcome {
    fn from(f: ScanFailure) -> Self {
        Self::Failure(f)
    }
}

/// Aggregate status of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Every target succeeded (or the batch was empty).
    Ok,
    /// At least one target failed.
    PartialFailure,
}

impl BatchStatus {
    /// Returns the snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::PartialFailure => "partial_failure",
        }
    }
}

/// Finding counts by severity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    /// Critical findings.
    pub critical: usize,
    /// High findings.
    pub high: usize,
    /// Medium findings.
    pub medium: usize,
    /// Low findings.
    pub low: usize,
    /// Findings with a tool-specific severity.
    pub other: usize,
}

impl SeverityCounts {
    /// Counts one finding.
    pub fn record(&mut self, severity: &Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Other(_) => self.other += 1,
        }
    }

    /// Returns the total number of findings counted.
    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low + self.other
    }
}

/// The aggregated result of one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Unique identifier for this batch.
    pub id: String,

    /// Outcomes keyed by target identity.
    pub outcomes: BTreeMap<String, ScanOutcome>,

    /// When the batch started.
    pub started_at: DateTime<Utc>,

    /// When the batch finished.
    pub completed_at: DateTime<Utc>,

    /// Total wall-clock duration.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl BatchReport {
    /// Creates an empty report starting now.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            outcomes: BTreeMap::new(),
            started_at: now,
            completed_at: now,
            duration: Duration::ZERO,
        }
    }

    /// Records an outcome, keyed by its target's identity.
    ///
    /// Returns the previous outcome for the same identity, if any.
    pub fn insert(&mut self, outcome: ScanOutcome) -> Option<ScanOutcome> {
        let key = outcome.target().id().to_string();
        self.outcomes.insert(key, outcome)
    }

    /// Returns `true` if an outcome is recorded for this identity.
    pub fn contains(&self, id: &str) -> bool {
        self.outcomes.contains_key(id)
    }

    /// Returns the outcome for a target identity.
    pub fn get(&self, id: &str) -> Option<&ScanOutcome> {
        self.outcomes.get(id)
    }

    /// Stamps the completion time.
    pub fn finish(&mut self) {
        self.completed_at = Utc::now();
        self.duration = elapsed(self.started_at, self.completed_at);
    }

    /// Number of outcomes.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns `true` if no outcomes are recorded.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Returns `true` if any outcome is a failure.
    pub fn has_failures(&self) -> bool {
        self.outcomes.values().any(ScanOutcome::is_failure)
    }

    /// Returns the aggregate status.
    pub fn status(&self) -> BatchStatus {
        if self.has_failures() {
            BatchStatus::PartialFailure
        } else {
            BatchStatus::Ok
        }
    }

    /// Iterates over successful outcomes in identity order.
    pub fn successes(&self) -> impl Iterator<Item = &ScanSuccess> {
        self.outcomes.values().filter_map(|o| match o {
            ScanOutcome::Success(s) => Some(s),
            ScanOutcome::Failure(_) => None,
        })
    }

    /// Iterates over failed outcomes in identity order.
    pub fn failures(&self) -> impl Iterator<Item = &ScanFailure> {
        self.outcomes.values().filter_map(|o| match o {
            ScanOutcome::Failure(f) => Some(f),
            ScanOutcome::Success(_) => None,
        })
    }

    /// Total number of findings across all successful targets.
    pub fn total_findings(&self) -> usize {
        self.successes().map(|s| s.findings.len()).sum()
    }

    /// Finding counts by severity across all successful targets.
    pub fn severity_counts(&self) -> SeverityCounts {
        let mut counts = SeverityCounts::default();
        for finding in self.successes().flat_map(|s| s.findings.iter()) {
            counts.record(&finding.severity);
        }
        counts
    }
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}

fn elapsed(start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
    (end - start).to_std().unwrap_or_default()
}

/// Serde helper for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Raw tool output is written as lossy UTF-8 text.
mod raw_output_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(raw: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&String::from_utf8_lossy(raw))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Ok(text.into_bytes())
    }
}

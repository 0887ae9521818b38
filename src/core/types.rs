//! Core types used throughout the scanfleet library.
//!
//! This module defines scan targets, findings and their severities, and
//! the project metadata returned by a directory lookup.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a target's source tree is obtained.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// A repository that must be cloned into the workspace.
    Remote,
    /// A directory that already exists on this machine.
    Local,
    /// A numeric project id resolved through a project directory.
    Project(u64),
}

/// One repository, local directory or project id to scan.
///
/// The locator alone is the target's identity in the batch report: two
/// targets with the same locator are duplicates even when their kinds
/// differ, so `ScanTarget::project(42)` and `ScanTarget::local("42")`
/// collapse into one entry. [`ScanTarget::parse`] never produces both for
/// the same input.
///
/// # Examples
///
/// ```rust
/// use scanfleet::core::{ScanTarget, TargetKind};
///
/// let target = ScanTarget::parse("https://github.com/acme/api.git");
/// assert_eq!(target.kind, TargetKind::Remote);
///
/// let target = ScanTarget::parse("4242");
/// assert_eq!(target.kind, TargetKind::Project(4242));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanTarget {
    /// URL, path, or project id as given by the user.
    pub locator: String,
    /// Resolved kind.
    pub kind: TargetKind,
}

impl ScanTarget {
    /// Creates a target with an explicit kind.
    ///
    /// The kind does not take part in identity; see [`ScanTarget::id`].
    pub fn new(locator: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            locator: locator.into(),
            kind,
        }
    }

    /// Creates a remote target.
    pub fn remote(url: impl Into<String>) -> Self {
        Self::new(url, TargetKind::Remote)
    }

    /// Creates a local directory target.
    pub fn local(path: impl Into<String>) -> Self {
        Self::new(path, TargetKind::Local)
    }

    /// Creates a project-id target.
    pub fn project(id: u64) -> Self {
        Self::new(id.to_string(), TargetKind::Project(id))
    }

    /// Infers the kind of a user-supplied locator.
    ///
    /// All-digit input is a project id, anything that looks like a git URL
    /// is remote, everything else is treated as a local path.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = input.parse::<u64>() {
                return Self::project(id);
            }
        }
        if is_remote_locator(input) {
            Self::remote(input)
        } else {
            Self::local(input)
        }
    }

    /// Returns the identity used to key this target in a report.
    ///
    /// This is the locator string, independent of the kind.
    pub fn id(&self) -> &str {
        &self.locator
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TargetKind::Project(id) => write!(f, "project #{}", id),
            _ => f.write_str(&self.locator),
        }
    }
}

fn is_remote_locator(input: &str) -> bool {
    const SCHEMES: [&str; 5] = ["http://", "https://", "ssh://", "git://", "file://"];
    if SCHEMES.iter().any(|scheme| input.starts_with(scheme)) {
        return true;
    }
    // scp-like syntax: user@host:path
    match input.split_once(':') {
        Some((host, path)) => host.contains('@') && !host.contains('/') && !path.is_empty(),
        None => false,
    }
}

/// Severity of a finding.
///
/// Unknown tool-defined severities are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    /// Low severity.
    Low,
    /// Medium severity.
    Medium,
    /// High severity.
    High,
    /// Critical severity.
    Critical,
    /// A severity the tool defines that is not one of the above.
    Other(String),
}

impl Severity {
    /// Returns the severity as reported.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
            Self::Other(s) => s,
        }
    }

    /// Returns a rank for sorting; unknown severities rank lowest.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Other(_) => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }
}

impl From<&str> for Severity {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            "critical" => Self::Critical,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Severity> for String {
    fn from(s: Severity) -> Self {
        match s {
            Severity::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single vulnerability reported by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Vulnerability title (e.g. "Prototype Pollution").
    pub title: String,
    /// Reported severity.
    pub severity: Severity,
    /// Affected module or package.
    pub module_name: String,
}

impl Finding {
    /// Creates a new finding.
    pub fn new(
        title: impl Into<String>,
        severity: impl Into<Severity>,
        module_name: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            severity: severity.into(),
            module_name: module_name.into(),
        }
    }
}

/// Project metadata returned by a directory lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// The project id that was looked up.
    pub id: u64,
    /// Clone URL for the project's repository.
    pub locator: String,
    /// Human-readable project name.
    pub display_name: String,
    /// Browser URL, if the directory provides one.
    pub web_url: Option<String>,
}

impl ProjectInfo {
    /// Creates project info with required fields.
    pub fn new(id: u64, locator: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id,
            locator: locator.into(),
            display_name: display_name.into(),
            web_url: None,
        }
    }

    /// Sets the browser URL.
    pub fn with_web_url(mut self, url: impl Into<String>) -> Self {
        self.web_url = Some(url.into());
        self
    }
}

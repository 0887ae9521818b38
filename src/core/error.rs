//! Error types for the scanfleet library.
//!
//! Adapter errors (`ScannerError`, `FetchError`, `LookupError`,
//! `OutputFormatError`) describe what an external collaborator reported.
//! `PipelineError` classifies why a single target failed, and `FailureKind`
//! is the serializable tag that ends up in the batch report.
//!
//! The orchestrator itself never fails: every error in this module is
//! captured per target and turned into a failed outcome.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a scanning tool adapter.
///
/// Conditions the pipeline reacts to (an unsupported subcommand, missing
/// credentials) are explicit variants so that callers never have to match
/// on tool output text.
#[derive(Debug, Error)]
pub enum ScannerError {
    /// The tool does not know the requested subcommand.
    #[error("scanner '{tool}' does not support the '{command}' command")]
    UnsupportedCommand {
        /// Name of the scanner.
        tool: String,
        /// The subcommand that was rejected.
        command: String,
    },

    /// Credentials required by the tool are not configured.
    #[error("credentials for scanner '{tool}' are not configured: {hint}")]
    MissingCredentials {
        /// Name of the scanner.
        tool: String,
        /// How to configure them.
        hint: String,
    },

    /// The tool rejected the configured credentials.
    #[error("authentication failed for scanner '{tool}': {reason}")]
    Authentication {
        /// Name of the scanner.
        tool: String,
        /// Reason reported by the tool.
        reason: String,
    },

    /// The tool found nothing it knows how to analyze.
    #[error("scanner '{tool}' found no supported projects: {details}")]
    NoSupportedProjects {
        /// Name of the scanner.
        tool: String,
        /// Tool output describing the condition.
        details: String,
    },

    /// The tool binary could not be started.
    #[error("scanner binary '{binary}' could not be started: {reason}")]
    ToolNotFound {
        /// Binary that was invoked.
        binary: String,
        /// Spawn error.
        reason: String,
    },

    /// The tool did not finish in time.
    #[error("scanner '{tool}' timed out after {elapsed:?}")]
    Timeout {
        /// Name of the scanner.
        tool: String,
        /// Time limit that was exceeded.
        elapsed: Duration,
    },

    /// The tool exited with a failure status.
    #[error("'{tool} {command}' failed with exit status {status:?}: {output}")]
    CommandFailed {
        /// Name of the scanner.
        tool: String,
        /// Subcommand that failed.
        command: String,
        /// Exit code, if the process was not killed by a signal.
        status: Option<i32>,
        /// Captured tool output.
        output: String,
    },

    /// An I/O error occurred while driving the tool.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScannerError {
    /// Returns `true` if the tool rejected the subcommand itself.
    pub fn is_unsupported_command(&self) -> bool {
        matches!(self, Self::UnsupportedCommand { .. })
    }

    /// Returns the scanner name if this error is associated with one.
    pub fn tool(&self) -> Option<&str> {
        match self {
            Self::UnsupportedCommand { tool, .. }
            | Self::MissingCredentials { tool, .. }
            | Self::Authentication { tool, .. }
            | Self::NoSupportedProjects { tool, .. }
            | Self::Timeout { tool, .. }
            | Self::CommandFailed { tool, .. } => Some(tool),
            _ => None,
        }
    }

    /// Creates an `UnsupportedCommand` error.
    pub fn unsupported_command(tool: impl Into<String>, command: impl Into<String>) -> Self {
        Self::UnsupportedCommand {
            tool: tool.into(),
            command: command.into(),
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(tool: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            tool: tool.into(),
            elapsed,
        }
    }

    /// Creates a `CommandFailed` error.
    pub fn command_failed(
        tool: impl Into<String>,
        command: impl Into<String>,
        status: Option<i32>,
        output: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            command: command.into(),
            status,
            output: output.into(),
        }
    }
}

/// Errors reported by a source fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The remote rejected our credentials, or none were available.
    #[error("authentication failed for '{locator}': {message}")]
    Authentication {
        /// Locator being fetched.
        locator: String,
        /// Tool output.
        message: String,
    },

    /// The repository or path does not exist.
    #[error("'{locator}' was not found")]
    NotFound {
        /// Locator being fetched.
        locator: String,
    },

    /// The clone failed for another reason.
    #[error("failed to clone '{locator}': {message}")]
    CloneFailed {
        /// Locator being fetched.
        locator: String,
        /// Tool output.
        message: String,
    },

    /// The locator is not something this fetcher can retrieve.
    #[error("invalid locator '{locator}': {reason}")]
    InvalidLocator {
        /// The rejected locator.
        locator: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The fetch tool could not be started.
    #[error("fetch tool '{binary}' could not be started: {reason}")]
    ToolNotFound {
        /// Binary that was invoked.
        binary: String,
        /// Spawn error.
        reason: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Creates a `CloneFailed` error.
    pub fn clone_failed(locator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CloneFailed {
            locator: locator.into(),
            message: message.into(),
        }
    }

    /// Creates an `Authentication` error.
    pub fn authentication(locator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Authentication {
            locator: locator.into(),
            message: message.into(),
        }
    }

    /// Creates a `NotFound` error.
    pub fn not_found(locator: impl Into<String>) -> Self {
        Self::NotFound {
            locator: locator.into(),
        }
    }
}

/// Errors reported by a project directory lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The directory is missing a base URL or token.
    #[error("project directory is not configured: {reason}")]
    NotConfigured {
        /// What is missing.
        reason: String,
    },

    /// No project exists with this id.
    #[error("project {id} was not found")]
    NotFound {
        /// The requested id.
        id: u64,
    },

    /// The remote API answered with an error status.
    #[error("project directory API returned status {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("project directory request failed: {message}")]
    Transport {
        /// Transport error.
        message: String,
    },
}

impl LookupError {
    /// Creates a `NotConfigured` error.
    pub fn not_configured(reason: impl Into<String>) -> Self {
        Self::NotConfigured {
            reason: reason.into(),
        }
    }
}

/// The scanner's output could not be turned into findings.
#[derive(Debug, Error)]
pub enum OutputFormatError {
    /// The tool produced no output at all.
    #[error("scanner produced no output")]
    Empty,

    /// The output is not valid JSON of the expected shape.
    #[error("invalid scanner JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The output is well-formed but reports a tool-side error.
    #[error("scanner reported an error: {message}")]
    ToolReported {
        /// Error message embedded in the output.
        message: String,
    },
}

/// Classification of a failed target, as it appears in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Source retrieval failed.
    Fetch,
    /// No recognizable project descriptor was found.
    NoManifest,
    /// The scan capability failed.
    Scan,
    /// Scan output could not be parsed.
    OutputFormat,
    /// A project id could not be resolved to a locator.
    Lookup,
    /// The per-target workspace could not be created.
    Workspace,
    /// The target was never dispatched because the batch was cancelled.
    Cancelled,
    /// The pipeline panicked.
    Internal,
}

impl FailureKind {
    /// Returns the stable snake_case name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::NoManifest => "no_manifest",
            Self::Scan => "scan",
            Self::OutputFormat => "output_format",
            Self::Lookup => "lookup",
            Self::Workspace => "workspace",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a scan pipeline could not produce findings for one target.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The temporary workspace could not be created.
    #[error("failed to create workspace: {0}")]
    Workspace(#[source] std::io::Error),

    /// The project id could not be resolved.
    #[error("failed to look up project {id}: {source}")]
    Lookup {
        /// The project id.
        id: u64,
        /// Directory error.
        #[source]
        source: LookupError,
    },

    /// Source retrieval failed.
    #[error("failed to fetch '{locator}': {source}")]
    Fetch {
        /// The locator that was fetched.
        locator: String,
        /// Fetcher error.
        #[source]
        source: FetchError,
    },

    /// The source tree has no recognized manifest.
    #[error("no supported manifest found in '{}' (looked for {expected})", path.display())]
    NoManifest {
        /// Root of the source tree.
        path: PathBuf,
        /// Comma-separated manifest names.
        expected: String,
    },

    /// The scan capability failed.
    #[error("scan failed: {0}")]
    Scan(#[source] ScannerError),

    /// The scan output could not be parsed.
    #[error("could not parse scan output: {0}")]
    OutputFormat(#[source] OutputFormatError),

    /// The batch was cancelled before this target was dispatched.
    #[error("scan was cancelled before it started")]
    Cancelled,

    /// The pipeline panicked.
    #[error("pipeline panicked: {message}")]
    Panicked {
        /// Panic payload, if it was a string.
        message: String,
    },
}

impl PipelineError {
    /// Returns the report classification of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Workspace(_) => FailureKind::Workspace,
            Self::Lookup { .. } => FailureKind::Lookup,
            Self::Fetch { .. } => FailureKind::Fetch,
            Self::NoManifest { .. } => FailureKind::NoManifest,
            Self::Scan(_) => FailureKind::Scan,
            Self::OutputFormat(_) => FailureKind::OutputFormat,
            Self::Cancelled => FailureKind::Cancelled,
            Self::Panicked { .. } => FailureKind::Internal,
        }
    }
}

/// Errors raised while building the target list.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A target list file could not be read.
    #[error("failed to read target list '{}': {source}", path.display())]
    ReadFile {
        /// The list file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A directory walk failed.
    #[error("failed to walk '{}': {source}", path.display())]
    Walk {
        /// Root of the walk.
        path: PathBuf,
        /// Underlying walk error.
        #[source]
        source: walkdir::Error,
    },

    /// The root to discover projects in is not a directory.
    #[error("'{}' is not a directory", path.display())]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file '{}': {source}", path.display())]
    ReadFile {
        /// The config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML.
    #[error("failed to parse config file '{}': {source}", path.display())]
    ParseYaml {
        /// The config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },

    /// A value is present but unusable.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Setting name.
        key: String,
        /// Why it was rejected.
        reason: String,
    },
}

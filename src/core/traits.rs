//! Capability traits for the external collaborators of a scan pipeline.
//!
//! The pipeline only ever talks to a scanning tool, a source fetcher and an
//! optional project directory through these traits. Concrete adapters live
//! in [`crate::backends`].

use crate::core::error::{FetchError, LookupError, OutputFormatError, ScannerError};
use crate::core::types::{Finding, ProjectInfo};

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

/// A security scanning tool.
///
/// # Implementation Notes
///
/// - Implementations must be `Send + Sync` for use across worker tasks.
/// - `scan` and `monitor` may block for minutes; they are awaited without
///   holding any lock.
/// - Conditions the pipeline treats specially must be reported through the
///   matching [`ScannerError`] variant, never only as text.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use scanfleet::core::{Finding, OutputFormatError, Scanner, ScannerError};
/// use async_trait::async_trait;
/// use std::path::Path;
///
/// #[derive(Debug)]
/// struct EchoScanner;
///
/// #[async_trait]
/// impl Scanner for EchoScanner {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     async fn scan(&self, path: &Path) -> Result<Vec<u8>, ScannerError> {
///         Ok(br#"{"vulnerabilities":[]}"#.to_vec())
///     }
///
///     async fn monitor(&self, path: &Path) -> Result<Vec<u8>, ScannerError> {
///         Ok(b"monitored".to_vec())
///     }
///
///     fn parse_findings(&self, raw: &[u8]) -> Result<Vec<Finding>, OutputFormatError> {
///         scanfleet::backends::snyk::parse_test_output(raw)
///     }
/// }
/// ```
#[async_trait]
pub trait Scanner: Send + Sync + Debug {
    /// Returns a stable name for this tool, e.g. "snyk".
    fn name(&self) -> &str;

    /// Scans the source tree at `path` and returns the raw tool output.
    ///
    /// # Errors
    ///
    /// - `UnsupportedCommand` - the tool has no scan subcommand.
    /// - `MissingCredentials` / `Authentication` - credential problems.
    /// - `CommandFailed` - any other tool failure.
    async fn scan(&self, path: &Path) -> Result<Vec<u8>, ScannerError>;

    /// Registers the project at `path` with the tool's tracking dashboard.
    async fn monitor(&self, path: &Path) -> Result<Vec<u8>, ScannerError>;

    /// Turns raw scan output into findings, preserving the tool's order.
    fn parse_findings(&self, raw: &[u8]) -> Result<Vec<Finding>, OutputFormatError>;
}

/// Retrieves source code into a destination directory.
#[async_trait]
pub trait SourceFetcher: Send + Sync + Debug {
    /// Returns a stable name for this fetcher, e.g. "git".
    fn name(&self) -> &str;

    /// Fetches `locator` into `destination`.
    ///
    /// `destination` does not exist yet; its parent does.
    async fn fetch(&self, locator: &str, destination: &Path) -> Result<(), FetchError>;
}

/// Resolves numeric project ids into clone locators.
#[async_trait]
pub trait ProjectDirectory: Send + Sync + Debug {
    /// Returns a stable name for this directory, e.g. "gitlab".
    fn name(&self) -> &str;

    /// Looks up a project by id.
    async fn lookup(&self, id: u64) -> Result<ProjectInfo, LookupError>;
}

/// A boxed scanner, owned by exactly one pipeline.
pub type BoxedScanner = Box<dyn Scanner>;

/// A boxed fetcher, owned by exactly one pipeline.
pub type BoxedFetcher = Box<dyn SourceFetcher>;

/// A shared project directory.
pub type ArcDirectory = Arc<dyn ProjectDirectory>;

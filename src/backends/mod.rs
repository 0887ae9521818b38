//! Adapter implementations.
//!
//! ## Available Backends
//!
//! - [`snyk`] - Scanner driving the Snyk CLI
//! - [`git`] - Source fetcher driving `git clone`
//! - [`gitlab`] - Project directory over the GitLab REST API (requires `gitlab` feature)
//! - [`mock`] - Test doubles for all three traits
//!
//! ## Implementing a Custom Backend
//!
//! To add another scanning tool, implement the `Scanner` trait:
//!
//! ```rust,ignore
//! use scanfleet::core::{Finding, OutputFormatError, Scanner, ScannerError};
//! use async_trait::async_trait;
//! use std::path::Path;
//!
//! #[derive(Debug)]
//! pub struct MyScanner;
//!
//! #[async_trait]
//! impl Scanner for MyScanner {
//!     fn name(&self) -> &str {
//!         "my-scanner"
//!     }
//!
//!     async fn scan(&self, path: &Path) -> Result<Vec<u8>, ScannerError> {
//!         todo!()
//!     }
//!
//!     async fn monitor(&self, path: &Path) -> Result<Vec<u8>, ScannerError> {
//!         Err(ScannerError::unsupported_command("my-scanner", "monitor"))
//!     }
//!
//!     fn parse_findings(&self, raw: &[u8]) -> Result<Vec<Finding>, OutputFormatError> {
//!         todo!()
//!     }
//! }
//! ```

pub mod git;
pub mod mock;
pub mod snyk;

#[cfg(feature = "gitlab")]
pub mod gitlab;

// Re-exports
pub use git::GitCliFetcher;
pub use mock::{
    MockDirectory, MockFetchFailure, MockFetcher, MockMonitor, MockObservation, MockScan,
    MockScanner,
};
pub use snyk::SnykCliScanner;

#[cfg(feature = "gitlab")]
pub use gitlab::GitLabDirectory;

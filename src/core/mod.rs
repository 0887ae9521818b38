//! Core types and traits for the scanfleet library.
//!
//! - [`types`] - Targets, findings and project metadata
//! - [`traits`] - The `Scanner`, `SourceFetcher` and `ProjectDirectory` traits
//! - [`error`] - Structured error types and the failure taxonomy
//! - [`result`] - Per-target outcomes and the batch report

pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{
    ConfigError, FailureKind, FetchError, LookupError, OutputFormatError, PipelineError,
    ResolveError, ScannerError,
};
pub use result::{BatchReport, BatchStatus, ScanFailure, ScanOutcome, ScanSuccess, SeverityCounts};
pub use traits::{
    ArcDirectory, BoxedFetcher, BoxedScanner, ProjectDirectory, Scanner, SourceFetcher,
};
pub use types::{Finding, ProjectInfo, ScanTarget, Severity, TargetKind};

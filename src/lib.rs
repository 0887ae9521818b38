//! # scanfleet
//!
//! Concurrent security scanning for many repositories, with an isolated
//! workspace per target and a single report that survives partial failure.
//!
//! ## Overview
//!
//! scanfleet drives an external dependency scanner (the Snyk CLI by default)
//! across a batch of targets. Each target is a remote repository, a local
//! directory or a GitLab project id. A bounded pool of workers runs one
//! pipeline per target:
//!
//! - Acquire a fresh temporary workspace that no other target can see
//! - Resolve and fetch the source, or use the local path in place
//! - Require a recognised project manifest
//! - Scan, optionally register the project with the dashboard (best effort)
//! - Parse findings into a classified outcome
//!
//! One target failing never stops the others. Every target ends up in the
//! [`BatchReport`] either as a success or as a failure with a
//! [`FailureKind`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scanfleet::config::Settings;
//! use scanfleet::core::ScanTarget;
//! use scanfleet::manager::{ScanManager, WorkerPoolConfig};
//! use scanfleet::pipeline::{PipelineOptions, SettingsPipelineFactory};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Arc::new(Settings::load(None)?);
//!     let factory = SettingsPipelineFactory::new(settings, PipelineOptions::new());
//!
//!     let manager = ScanManager::new(WorkerPoolConfig::new(4));
//!     let report = manager
//!         .run(
//!             vec![
//!                 ScanTarget::parse("https://github.com/acme/api.git"),
//!                 ScanTarget::parse("https://github.com/acme/web.git"),
//!             ],
//!             factory,
//!         )
//!         .await;
//!
//!     println!("{}: {} findings", report.status().as_str(), report.total_findings());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `default` - Includes the GitLab project directory
//! - `gitlab` - GitLab REST API lookup for project-id targets
//!
//! ## Architecture
//!
//! - **Core**: Targets, outcomes, the batch report, adapter traits and errors
//! - **Backends**: Snyk, git and GitLab adapters plus test doubles
//! - **Config**: Settings from defaults, config file, `.env` and environment
//! - **Pipeline**: The per-target workspace lifecycle
//! - **Manager**: The worker pool that fans targets out and outcomes in
//! - **Resolver**: Target lists, local discovery and de-duplication
//! - **Report**: Text and JSON rendering
//! - **Audit**: Structured lifecycle events

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod backends;
pub mod cli;
pub mod config;
pub mod core;
pub mod manager;
pub mod pipeline;
pub mod report;
pub mod resolver;

// Re-export commonly used types at the crate root
pub use crate::core::{
    BatchReport, BatchStatus, FailureKind, Finding, ScanFailure, ScanOutcome, ScanSuccess,
    ScanTarget, Scanner, Severity, SourceFetcher, TargetKind,
};

pub use crate::config::Settings;
pub use crate::manager::{ScanManager, WorkerPoolConfig};
pub use crate::pipeline::{PipelineFactory, PipelineOptions, ScanPipeline};

/// Prelude module for convenient imports.
///
/// ```rust
/// use scanfleet::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::core::{
        BatchReport, BatchStatus, FailureKind, Finding, ProjectDirectory, ScanFailure,
        ScanOutcome, ScanSuccess, ScanTarget, Scanner, Severity, SourceFetcher, TargetKind,
    };
    pub use crate::manager::{ScanManager, WorkerPoolConfig};
    pub use crate::pipeline::{
        PipelineFactory, PipelineOptions, ScanPipeline, SettingsPipelineFactory,
    };
}

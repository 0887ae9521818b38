//! Per-target scan pipeline.
//!
//! A pipeline takes one [`ScanTarget`](crate::core::ScanTarget) through the
//! following steps, each of which either continues or ends the run with a
//! classified failure:
//!
//! 1. acquire an isolated [`Workspace`]
//! 2. resolve a project id through the project directory
//! 3. fetch remote source into the workspace, or check the local path
//! 4. require a recognised manifest at the source root
//! 5. scan, optionally monitor, and parse findings
//!
//! The workspace is removed on every exit path.

pub mod factory;
pub mod manifest;
pub mod scan_pipeline;
pub mod workspace;

pub use factory::SettingsPipelineFactory;
pub use manifest::{ManifestSet, DEFAULT_MANIFESTS};
pub use scan_pipeline::{PipelineFactory, PipelineOptions, ScanPipeline};
pub use workspace::{Workspace, WORKSPACE_PREFIX};

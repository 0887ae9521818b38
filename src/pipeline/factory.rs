//! Pipeline factory backed by real adapters.

use crate::backends::{GitCliFetcher, SnykCliScanner};
use crate::config::Settings;
use crate::core::ArcDirectory;
use crate::pipeline::scan_pipeline::{PipelineFactory, PipelineOptions, ScanPipeline};

use std::sync::Arc;

/// Builds pipelines with the Snyk CLI scanner, the git fetcher and, when the
/// `gitlab` feature is enabled, the GitLab project directory.
///
/// Scanner and fetcher are constructed per pipeline from the shared
/// settings. The directory holds only an HTTP client and is shared.
#[derive(Debug, Clone)]
pub struct SettingsPipelineFactory {
    settings: Arc<Settings>,
    options: PipelineOptions,
    directory: Option<ArcDirectory>,
}

impl SettingsPipelineFactory {
    /// Creates a factory.
    pub fn new(settings: Arc<Settings>, options: PipelineOptions) -> Self {
        let directory = default_directory(&settings);
        Self {
            settings,
            options,
            directory,
        }
    }

    /// Replaces the project directory.
    pub fn with_directory(mut self, directory: ArcDirectory) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Returns the shared settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl PipelineFactory for SettingsPipelineFactory {
    fn build(&self) -> ScanPipeline {
        let pipeline = ScanPipeline::new(
            SnykCliScanner::from_settings(&self.settings.snyk),
            GitCliFetcher::from_settings(&self.settings.git),
            self.options.clone(),
        );
        match &self.directory {
            Some(directory) => pipeline.with_directory(Arc::clone(directory)),
            None => pipeline,
        }
    }
}

#[cfg(feature = "gitlab")]
fn default_directory(settings: &Settings) -> Option<ArcDirectory> {
    match crate::backends::GitLabDirectory::new(&settings.gitlab) {
        Ok(directory) => Some(Arc::new(directory)),
        Err(e) => {
            tracing::warn!(error = %e, "GitLab directory unavailable");
            None
        }
    }
}

#[cfg(not(feature = "gitlab"))]
fn default_directory(_settings: &Settings) -> Option<ArcDirectory> {
    None
}

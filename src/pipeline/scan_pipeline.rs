//! The per-target scan pipeline.

use crate::core::{
    ArcDirectory, BoxedFetcher, BoxedScanner, FetchError, LookupError, PipelineError,
    ScanFailure, ScanOutcome, ScanSuccess, ScanTarget, Scanner, ScannerError, SourceFetcher,
    TargetKind,
};
use crate::pipeline::manifest::ManifestSet;
use crate::pipeline::workspace::Workspace;

use chrono::{DateTime, Utc};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options shared by every pipeline in a batch.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Whether to register each project with the scanner's dashboard.
    pub monitor: bool,

    /// Upper bound for each scan and monitor invocation.
    pub scan_timeout: Option<Duration>,

    /// Files that mark a directory as scannable.
    pub manifests: ManifestSet,

    /// Parent directory for workspaces. Defaults to the system temp dir.
    pub workspace_root: Option<PathBuf>,
}

impl PipelineOptions {
    /// Creates options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the monitor step.
    pub fn with_monitor(mut self, monitor: bool) -> Self {
        self.monitor = monitor;
        self
    }

    /// Sets the scan timeout.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = Some(timeout);
        self
    }

    /// Replaces the manifest set.
    pub fn with_manifests(mut self, manifests: ManifestSet) -> Self {
        self.manifests = manifests;
        self
    }

    /// Sets the parent directory for workspaces.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }
}

/// Runs one target from workspace acquisition to a final outcome.
///
/// A pipeline owns its adapters and is used for a single target; the
/// orchestrator builds a fresh one per target through a [`PipelineFactory`].
///
/// # Examples
///
/// ```rust,no_run
/// use scanfleet::backends::{MockFetcher, MockScanner};
/// use scanfleet::core::ScanTarget;
/// use scanfleet::pipeline::{PipelineOptions, ScanPipeline};
///
/// # async fn example() {
/// let pipeline = ScanPipeline::new(
///     MockScanner::new(),
///     MockFetcher::new(),
///     PipelineOptions::new().with_monitor(true),
/// );
/// let outcome = pipeline
///     .execute(&ScanTarget::remote("https://example.com/acme/api.git"))
///     .await;
/// assert!(outcome.is_success());
/// # }
/// ```
#[derive(Debug)]
pub struct ScanPipeline {
    scanner: BoxedScanner,
    fetcher: BoxedFetcher,
    directory: Option<ArcDirectory>,
    options: PipelineOptions,
}

impl ScanPipeline {
    /// Creates a pipeline from concrete adapters.
    pub fn new<S, F>(scanner: S, fetcher: F, options: PipelineOptions) -> Self
    where
        S: Scanner + 'static,
        F: SourceFetcher + 'static,
    {
        Self::from_boxed(Box::new(scanner), Box::new(fetcher), options)
    }

    /// Creates a pipeline from boxed adapters.
    pub fn from_boxed(scanner: BoxedScanner, fetcher: BoxedFetcher, options: PipelineOptions) -> Self {
        Self {
            scanner,
            fetcher,
            directory: None,
            options,
        }
    }

    /// Sets the directory used to resolve project-id targets.
    pub fn with_directory(mut self, directory: ArcDirectory) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Returns the pipeline options.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Scans one target. Every failure is folded into the returned outcome.
    pub async fn execute(&self, target: &ScanTarget) -> ScanOutcome {
        let started_at = Utc::now();

        match self.run(target, started_at).await {
            Ok(success) => {
                tracing::debug!(
                    scan_target = %target.locator,
                    findings = success.findings.len(),
                    monitored = success.monitor_report.is_some(),
                    "Pipeline succeeded"
                );
                ScanOutcome::Success(success)
            }
            Err(e) => {
                tracing::warn!(
                    scan_target = %target.locator,
                    kind = %e.kind(),
                    error = %e,
                    "Pipeline failed"
                );
                ScanOutcome::Failure(ScanFailure::from_error(target.clone(), &e, started_at))
            }
        }
    }

    async fn run(
        &self,
        target: &ScanTarget,
        started_at: DateTime<Utc>,
    ) -> Result<ScanSuccess, PipelineError> {
        let workspace = Workspace::acquire(self.options.workspace_root.as_deref())
            .map_err(PipelineError::Workspace)?;

        // The workspace is also removed by Drop if this future panics.
        let result = self.run_in(&workspace, target, started_at).await;
        workspace.release();
        result
    }

    async fn run_in(
        &self,
        workspace: &Workspace,
        target: &ScanTarget,
        started_at: DateTime<Utc>,
    ) -> Result<ScanSuccess, PipelineError> {
        let mut display_name = None;

        let source = match target.kind {
            TargetKind::Local => local_source(&target.locator)?,
            TargetKind::Remote => self.fetch(&target.locator, workspace).await?,
            TargetKind::Project(id) => {
                let project = self.lookup(id).await?;
                display_name = Some(project.display_name);
                self.fetch(&project.locator, workspace).await?
            }
        };

        if !self.options.manifests.contains_manifest(&source) {
            return Err(PipelineError::NoManifest {
                path: source,
                expected: self.options.manifests.describe(),
            });
        }

        let raw = match self.bounded(self.scanner.scan(&source)).await {
            Ok(raw) => Some(raw),
            Err(e) if e.is_unsupported_command() && self.options.monitor => {
                tracing::warn!(
                    scan_target = %target.locator,
                    scanner = self.scanner.name(),
                    "Scan command unsupported, continuing with monitor only"
                );
                None
            }
            Err(e) => return Err(PipelineError::Scan(e)),
        };

        let mut monitor_report = None;
        let mut monitor_warning = None;
        if self.options.monitor {
            match self.bounded(self.scanner.monitor(&source)).await {
                Ok(out) => {
                    monitor_report = Some(String::from_utf8_lossy(&out).trim().to_string());
                }
                Err(e) => {
                    tracing::warn!(
                        scan_target = %target.locator,
                        error = %e,
                        "Monitor failed, keeping scan result"
                    );
                    monitor_warning = Some(e.to_string());
                }
            }
        }

        let findings = match &raw {
            Some(raw) => self
                .scanner
                .parse_findings(raw)
                .map_err(PipelineError::OutputFormat)?,
            None => Vec::new(),
        };

        let mut success = ScanSuccess::new(target.clone(), findings, started_at)
            .with_raw_output(raw.unwrap_or_default())
            .with_display_name(display_name);
        success.monitor_report = monitor_report;
        success.monitor_warning = monitor_warning;
        Ok(success)
    }

    async fn lookup(&self, id: u64) -> Result<crate::core::ProjectInfo, PipelineError> {
        let directory = self.directory.as_ref().ok_or_else(|| PipelineError::Lookup {
            id,
            source: LookupError::not_configured("no project directory is configured"),
        })?;

        let project = directory
            .lookup(id)
            .await
            .map_err(|source| PipelineError::Lookup { id, source })?;

        tracing::debug!(
            project_id = id,
            name = %project.display_name,
            directory = directory.name(),
            "Resolved project"
        );
        Ok(project)
    }

    async fn fetch(&self, locator: &str, workspace: &Workspace) -> Result<PathBuf, PipelineError> {
        let destination = workspace.source_dir();
        self.fetcher
            .fetch(locator, &destination)
            .await
            .map_err(|source| PipelineError::Fetch {
                locator: locator.to_string(),
                source,
            })?;
        Ok(destination)
    }

    async fn bounded<F>(&self, call: F) -> Result<Vec<u8>, ScannerError>
    where
        F: Future<Output = Result<Vec<u8>, ScannerError>>,
    {
        match self.options.scan_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(ScannerError::timeout(self.scanner.name(), limit)),
            },
            None => call.await,
        }
    }
}

fn local_source(locator: &str) -> Result<PathBuf, PipelineError> {
    let path = Path::new(locator);
    let error = if !path.exists() {
        FetchError::not_found(locator)
    } else if !path.is_dir() {
        FetchError::InvalidLocator {
            locator: locator.to_string(),
            reason: "not a directory".to_string(),
        }
    } else {
        return Ok(path.to_path_buf());
    };
    Err(PipelineError::Fetch {
        locator: locator.to_string(),
        source: error,
    })
}

/// Builds a fresh [`ScanPipeline`] for every target.
///
/// Any `Fn() -> ScanPipeline` closure is a factory.
pub trait PipelineFactory: Send + Sync + 'static {
    /// Builds a new pipeline with its own adapters.
    fn build(&self) -> ScanPipeline;
}

impl<F> PipelineFactory for F
where
    F: Fn() -> ScanPipeline + Send + Sync + 'static,
{
    fn build(&self) -> ScanPipeline {
        self()
    }
}

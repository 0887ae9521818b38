//! Mock backends for testing.
//!
//! This module provides configurable test doubles for the scanner, the source
//! fetcher and the project directory, so pipelines and the orchestrator can
//! be exercised without external tools.
//!
//! Mocks are cheap to clone and clones share their configuration and
//! counters. A pipeline factory can therefore hand a fresh clone to every
//! pipeline while the test keeps one to inspect afterwards.
//!
//! [`MockFetcher`] writes a `.mock-target` marker containing the locator into
//! every tree it fetches. [`MockScanner`] reads that marker to pick the
//! response configured for the target. For trees without a marker (local
//! targets) the scanned path itself is the key.

use crate::core::{
    FetchError, Finding, LookupError, OutputFormatError, ProjectDirectory, ProjectInfo, Scanner,
    ScannerError, SourceFetcher,
};

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

/// Name of the marker file written by [`MockFetcher`].
pub const MOCK_TARGET_MARKER: &str = ".mock-target";

/// How [`MockScanner::scan`] responds for a target.
#[derive(Debug, Clone)]
pub enum MockScan {
    /// Succeed with Snyk-style JSON describing these findings.
    Findings(Vec<Finding>),
    /// Succeed with these exact bytes.
    Raw(Vec<u8>),
    /// Fail as if the tool had no scan subcommand.
    UnsupportedCommand,
    /// Fail with a command error carrying this message.
    Fail(String),
    /// Panic with this message.
    Panic(String),
}

/// How [`MockScanner::monitor`] responds for a target.
#[derive(Debug, Clone)]
pub enum MockMonitor {
    /// Succeed with this report text.
    Report(String),
    /// Fail with this message.
    Fail(String),
}

/// What a scanner saw in the tree it was asked to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockObservation {
    /// Response key for the scan.
    pub key: String,
    /// The scanned path.
    pub path: PathBuf,
    /// Top-level entry names in the tree, sorted.
    pub entries: Vec<String>,
}

#[derive(Debug, Default)]
struct ScannerState {
    scans: RwLock<HashMap<String, MockScan>>,
    monitors: RwLock<HashMap<String, MockMonitor>>,
    scan_count: AtomicU64,
    monitor_count: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    observations: Mutex<Vec<MockObservation>>,
}

/// Tracks concurrent scans for [`MockScanner::peak_in_flight`].
struct InFlight<'a>(&'a ScannerState);

impl<'a> InFlight<'a> {
    fn enter(state: &'a ScannerState) -> Self {
        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(state)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A mock scanner for testing purposes.
///
/// # Examples
///
/// ```rust
/// use scanfleet::backends::{MockMonitor, MockScan, MockScanner};
/// use scanfleet::core::{Finding, Severity};
/// use std::time::Duration;
///
/// let scanner = MockScanner::new()
///     .with_scan(
///         "https://example.com/a.git",
///         MockScan::Findings(vec![Finding::new("XSS", Severity::Medium, "jquery")]),
///     )
///     .with_monitor("https://example.com/a.git", MockMonitor::Fail("offline".into()))
///     .with_latency(Duration::from_millis(10));
/// ```
#[derive(Debug, Clone)]
pub struct MockScanner {
    name: String,
    default_scan: MockScan,
    default_monitor: MockMonitor,
    latency: Option<Duration>,
    state: Arc<ScannerState>,
}

impl MockScanner {
    /// Creates a scanner that reports no findings and monitors successfully.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            default_scan: MockScan::Findings(Vec::new()),
            default_monitor: MockMonitor::Report("monitored".to_string()),
            latency: None,
            state: Arc::new(ScannerState::default()),
        }
    }

    /// Sets the scanner name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the scan response for targets without a specific one.
    pub fn with_default_scan(mut self, scan: MockScan) -> Self {
        self.default_scan = scan;
        self
    }

    /// Sets the monitor response for targets without a specific one.
    pub fn with_default_monitor(mut self, monitor: MockMonitor) -> Self {
        self.default_monitor = monitor;
        self
    }

    /// Sets the scan response for one target.
    pub fn with_scan(self, key: impl Into<String>, scan: MockScan) -> Self {
        self.state
            .scans
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.into(), scan);
        self
    }

    /// Sets the monitor response for one target.
    pub fn with_monitor(self, key: impl Into<String>, monitor: MockMonitor) -> Self {
        self.state
            .monitors
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.into(), monitor);
        self
    }

    /// Sets a delay applied to every scan.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of scans started across all clones.
    pub fn scan_count(&self) -> u64 {
        self.state.scan_count.load(Ordering::SeqCst)
    }

    /// Number of monitor calls across all clones.
    pub fn monitor_count(&self) -> u64 {
        self.state.monitor_count.load(Ordering::SeqCst)
    }

    /// Highest number of scans that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.state.peak_in_flight.load(Ordering::SeqCst)
    }

    /// What each scan saw, in start order.
    pub fn observations(&self) -> Vec<MockObservation> {
        self.state
            .observations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn observe(&self, path: &Path) -> String {
        let key = target_key(path);
        let mut entries: Vec<String> = std::fs::read_dir(path)
            .map(|dir| {
                dir.filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        entries.sort();

        self.state
            .observations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(MockObservation {
                key: key.clone(),
                path: path.to_path_buf(),
                entries,
            });
        key
    }

    fn scan_response(&self, key: &str) -> MockScan {
        self.state
            .scans
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
            .unwrap_or_else(|| self.default_scan.clone())
    }

    fn monitor_response(&self, key: &str) -> MockMonitor {
        self.state
            .monitors
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
            .unwrap_or_else(|| self.default_monitor.clone())
    }
}

impl Default for MockScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for MockScanner {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scan(&self, path: &Path) -> Result<Vec<u8>, ScannerError> {
        self.state.scan_count.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(&self.state);
        let key = self.observe(path);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match self.scan_response(&key) {
            MockScan::Findings(findings) => Ok(render_findings(&findings)),
            MockScan::Raw(raw) => Ok(raw),
            MockScan::UnsupportedCommand => {
                Err(ScannerError::unsupported_command(&self.name, "test"))
            }
            MockScan::Fail(message) => Err(ScannerError::command_failed(
                &self.name,
                "test",
                Some(2),
                message,
            )),
            MockScan::Panic(message) => panic!("{}", message),
        }
    }

    async fn monitor(&self, path: &Path) -> Result<Vec<u8>, ScannerError> {
        self.state.monitor_count.fetch_add(1, Ordering::SeqCst);
        match self.monitor_response(&target_key(path)) {
            MockMonitor::Report(report) => Ok(report.into_bytes()),
            MockMonitor::Fail(message) => Err(ScannerError::command_failed(
                &self.name,
                "monitor",
                Some(2),
                message,
            )),
        }
    }

    fn parse_findings(&self, raw: &[u8]) -> Result<Vec<Finding>, OutputFormatError> {
        crate::backends::snyk::parse_test_output(raw)
    }
}

fn target_key(path: &Path) -> String {
    std::fs::read_to_string(path.join(MOCK_TARGET_MARKER))
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| path.display().to_string())
}

fn render_findings(findings: &[Finding]) -> Vec<u8> {
    let vulnerabilities: Vec<serde_json::Value> = findings
        .iter()
        .map(|f| {
            serde_json::json!({
                "title": f.title,
                "severity": f.severity.as_str(),
                "moduleName": f.module_name,
            })
        })
        .collect();
    serde_json::json!({
        "ok": findings.is_empty(),
        "vulnerabilities": vulnerabilities,
    })
    .to_string()
    .into_bytes()
}

/// How [`MockFetcher::fetch`] fails for a locator.
#[derive(Debug, Clone)]
pub enum MockFetchFailure {
    /// Credentials were rejected.
    Authentication,
    /// The repository does not exist.
    NotFound,
    /// Any other clone failure.
    CloneFailed(String),
}

impl MockFetchFailure {
    fn to_error(&self, locator: &str) -> FetchError {
        match self {
            Self::Authentication => {
                FetchError::authentication(locator, "fatal: Authentication failed")
            }
            Self::NotFound => FetchError::not_found(locator),
            Self::CloneFailed(message) => FetchError::clone_failed(locator, message.clone()),
        }
    }
}

#[derive(Debug, Default)]
struct FetcherState {
    failures: RwLock<HashMap<String, MockFetchFailure>>,
    files: RwLock<HashMap<String, Vec<(String, String)>>>,
    fetch_count: AtomicU64,
    fetched: Mutex<Vec<(String, PathBuf)>>,
}

/// A mock source fetcher.
///
/// By default every fetch creates the destination with a `package.json`
/// and the `.mock-target` marker.
#[derive(Debug, Clone)]
pub struct MockFetcher {
    latency: Option<Duration>,
    state: Arc<FetcherState>,
}

impl MockFetcher {
    /// Creates a fetcher that always succeeds.
    pub fn new() -> Self {
        Self {
            latency: None,
            state: Arc::new(FetcherState::default()),
        }
    }

    /// Makes fetches of `locator` fail.
    pub fn with_failure(self, locator: impl Into<String>, failure: MockFetchFailure) -> Self {
        self.state
            .failures
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(locator.into(), failure);
        self
    }

    /// Replaces the files written for `locator`. The marker is always added.
    pub fn with_files<N, C>(self, locator: impl Into<String>, files: Vec<(N, C)>) -> Self
    where
        N: Into<String>,
        C: Into<String>,
    {
        let files = files
            .into_iter()
            .map(|(n, c)| (n.into(), c.into()))
            .collect();
        self.state
            .files
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(locator.into(), files);
        self
    }

    /// Sets a delay applied to every fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of fetches across all clones.
    pub fn fetch_count(&self) -> u64 {
        self.state.fetch_count.load(Ordering::SeqCst)
    }

    /// Locators fetched successfully, in order.
    pub fn fetched_locators(&self) -> Vec<String> {
        self.fetched().into_iter().map(|(l, _)| l).collect()
    }

    /// Destinations written by successful fetches, in order.
    pub fn destinations(&self) -> Vec<PathBuf> {
        self.fetched().into_iter().map(|(_, d)| d).collect()
    }

    fn fetched(&self) -> Vec<(String, PathBuf)> {
        self.state
            .fetched
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceFetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, locator: &str, destination: &Path) -> Result<(), FetchError> {
        self.state.fetch_count.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let failure = self
            .state
            .failures
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(locator)
            .cloned();
        if let Some(failure) = failure {
            return Err(failure.to_error(locator));
        }

        let files = self
            .state
            .files
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(locator)
            .cloned()
            .unwrap_or_else(|| vec![("package.json".to_string(), "{}".to_string())]);

        tokio::fs::create_dir(destination).await?;
        tokio::fs::write(destination.join(MOCK_TARGET_MARKER), locator).await?;
        for (name, contents) in files {
            tokio::fs::write(destination.join(name), contents).await?;
        }

        self.state
            .fetched
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((locator.to_string(), destination.to_path_buf()));
        Ok(())
    }
}

/// A mock project directory with a fixed set of projects.
#[derive(Debug, Clone, Default)]
pub struct MockDirectory {
    projects: HashMap<u64, ProjectInfo>,
    lookup_count: Arc<AtomicU64>,
}

impl MockDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a project.
    pub fn with_project(mut self, project: ProjectInfo) -> Self {
        self.projects.insert(project.id, project);
        self
    }

    /// Number of lookups across all clones.
    pub fn lookup_count(&self) -> u64 {
        self.lookup_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProjectDirectory for MockDirectory {
    fn name(&self) -> &str {
        "mock"
    }

    async fn lookup(&self, id: u64) -> Result<ProjectInfo, LookupError> {
        self.lookup_count.fetch_add(1, Ordering::SeqCst);
        self.projects
            .get(&id)
            .cloned()
            .ok_or(LookupError::NotFound { id })
    }
}

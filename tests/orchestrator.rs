//! End-to-end behaviour of the worker pool with mock adapters.

use scanfleet::backends::{MockFetchFailure, MockFetcher, MockMonitor, MockScan, MockScanner};
use scanfleet::core::{
    BatchStatus, FailureKind, Finding, ScanOutcome, ScanTarget, Severity,
};
use scanfleet::manager::{ScanManager, WorkerPoolConfig};
use scanfleet::pipeline::{PipelineOptions, ScanPipeline, WORKSPACE_PREFIX};

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn factory(
    scanner: &MockScanner,
    fetcher: &MockFetcher,
    options: PipelineOptions,
) -> impl Fn() -> ScanPipeline + Send + Sync + 'static {
    let scanner = scanner.clone();
    let fetcher = fetcher.clone();
    move || ScanPipeline::new(scanner.clone(), fetcher.clone(), options.clone())
}

fn remotes(count: usize) -> Vec<ScanTarget> {
    (0..count)
        .map(|i| ScanTarget::remote(format!("https://git.example.com/team/repo-{}.git", i)))
        .collect()
}

fn leftover_workspaces(root: &Path) -> usize {
    std::fs::read_dir(root)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(WORKSPACE_PREFIX))
        .count()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_target_gets_exactly_one_outcome() {
    let targets = remotes(7);

    for concurrency in 1..=7 {
        let root = TempDir::new().unwrap();
        let scanner = MockScanner::new().with_latency(Duration::from_millis(5));
        let fetcher = MockFetcher::new();
        let options = PipelineOptions::new().with_workspace_root(root.path());

        let report = ScanManager::new(WorkerPoolConfig::new(concurrency))
            .run(targets.clone(), factory(&scanner, &fetcher, options))
            .await;

        assert_eq!(report.len(), 7, "concurrency {}", concurrency);
        for target in &targets {
            assert!(report.get(target.id()).unwrap().is_success());
        }
        assert_eq!(scanner.scan_count(), 7);
        assert_eq!(fetcher.fetch_count(), 7);
        assert_eq!(report.status(), BatchStatus::Ok);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn a_fresh_pipeline_is_built_for_every_target() {
    let targets = remotes(9);
    let scanner = MockScanner::new().with_latency(Duration::from_millis(5));
    let fetcher = MockFetcher::new();
    let builds = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&builds);
    let build = factory(&scanner, &fetcher, PipelineOptions::new());
    let report = ScanManager::new(WorkerPoolConfig::new(3))
        .run(targets, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            build()
        })
        .await;

    assert_eq!(report.len(), 9);
    assert_eq!(builds.load(Ordering::SeqCst), 9);
    assert_eq!(scanner.scan_count(), 9);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pipelines_never_see_each_others_workspaces() {
    let root = TempDir::new().unwrap();
    let targets = remotes(8);
    let mut fetcher = MockFetcher::new().with_latency(Duration::from_millis(5));
    for (i, target) in targets.iter().enumerate() {
        fetcher = fetcher.with_files(
            target.locator.clone(),
            vec![
                ("package.json".to_string(), "{}"),
                (format!("owned-by-{}", i), "secret"),
            ],
        );
    }
    let scanner = MockScanner::new().with_latency(Duration::from_millis(20));
    let options = PipelineOptions::new().with_workspace_root(root.path());

    let report = ScanManager::new(WorkerPoolConfig::new(4))
        .run(targets.clone(), factory(&scanner, &fetcher, options))
        .await;
    assert_eq!(report.successes().count(), 8);

    let observations = scanner.observations();
    assert_eq!(observations.len(), 8);

    let paths: HashSet<_> = observations.iter().map(|o| o.path.clone()).collect();
    assert_eq!(paths.len(), 8, "two scans shared a directory");

    for observation in &observations {
        let index = targets
            .iter()
            .position(|t| t.locator == observation.key)
            .unwrap();
        let owned: Vec<_> = observation
            .entries
            .iter()
            .filter(|e| e.starts_with("owned-by-"))
            .collect();
        assert_eq!(owned, vec![&format!("owned-by-{}", index)]);
    }

    assert_eq!(leftover_workspaces(root.path()), 0);
}

#[tokio::test]
async fn one_failure_does_not_abort_the_batch() {
    let targets = remotes(3);
    let scanner = MockScanner::new();
    let fetcher = MockFetcher::new().with_failure(
        targets[1].locator.clone(),
        MockFetchFailure::CloneFailed("remote hung up".into()),
    );

    let report = ScanManager::new(WorkerPoolConfig::new(2))
        .run(targets.clone(), factory(&scanner, &fetcher, PipelineOptions::new()))
        .await;

    assert!(report.get(targets[0].id()).unwrap().is_success());
    assert_eq!(
        report.get(targets[1].id()).unwrap().failure_kind(),
        Some(FailureKind::Fetch)
    );
    assert!(report.get(targets[2].id()).unwrap().is_success());
    assert_eq!(report.status(), BatchStatus::PartialFailure);
    assert_eq!(scanner.scan_count(), 2);
}

#[tokio::test]
async fn monitor_failure_keeps_scan_results() {
    let target = ScanTarget::remote("https://git.example.com/team/api.git");
    let scanner = MockScanner::new()
        .with_scan(
            target.locator.clone(),
            MockScan::Findings(vec![
                Finding::new("Regular Expression Denial of Service", Severity::Medium, "ms"),
                Finding::new("Command Injection", Severity::Critical, "shell-quote"),
            ]),
        )
        .with_monitor(target.locator.clone(), MockMonitor::Fail("dashboard offline".into()));
    let fetcher = MockFetcher::new();
    let options = PipelineOptions::new().with_monitor(true);

    let report = ScanManager::new(WorkerPoolConfig::default())
        .run(vec![target.clone()], factory(&scanner, &fetcher, options))
        .await;

    match report.get(target.id()) {
        Some(ScanOutcome::Success(success)) => {
            assert_eq!(success.findings.len(), 2);
            assert_eq!(success.findings[1].severity, Severity::Critical);
            assert!(success.monitor_report.is_none());
            assert!(success
                .monitor_warning
                .as_deref()
                .unwrap()
                .contains("dashboard offline"));
        }
        other => panic!("expected success, got {:?}", other),
    }
    assert_eq!(report.status(), BatchStatus::Ok);
}

#[tokio::test]
async fn unsupported_scan_falls_back_to_monitor() {
    let target = ScanTarget::remote("https://git.example.com/team/legacy.git");
    let scanner = MockScanner::new().with_scan(target.locator.clone(), MockScan::UnsupportedCommand);
    let fetcher = MockFetcher::new();
    let options = PipelineOptions::new().with_monitor(true);

    let report = ScanManager::new(WorkerPoolConfig::new(1))
        .run(vec![target.clone()], factory(&scanner, &fetcher, options))
        .await;

    match report.get(target.id()) {
        Some(ScanOutcome::Success(success)) => {
            assert!(success.findings.is_empty());
            assert!(success.raw_output.is_empty());
            assert_eq!(success.monitor_report.as_deref(), Some("monitored"));
        }
        other => panic!("expected success, got {:?}", other),
    }
    assert_eq!(scanner.monitor_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrency_is_clamped() {
    let targets = remotes(3);

    let scanner = MockScanner::new().with_latency(Duration::from_millis(50));
    let report = ScanManager::new(WorkerPoolConfig::new(10))
        .run(
            targets.clone(),
            factory(&scanner, &MockFetcher::new(), PipelineOptions::new()),
        )
        .await;
    assert_eq!(report.len(), 3);
    assert!(scanner.peak_in_flight() <= 3);

    for requested in [0, -4] {
        let scanner = MockScanner::new().with_latency(Duration::from_millis(20));
        let report = ScanManager::new(WorkerPoolConfig::new(requested))
            .run(
                targets.clone(),
                factory(&scanner, &MockFetcher::new(), PipelineOptions::new()),
            )
            .await;
        assert_eq!(report.len(), 3);
        assert_eq!(scanner.peak_in_flight(), 1, "requested {}", requested);
    }
}

#[tokio::test]
async fn mixed_batch_end_to_end() {
    let scanner = MockScanner::new().with_scan(
        "repoA",
        MockScan::Findings(vec![Finding::new(
            "Prototype Pollution",
            Severity::High,
            "lodash",
        )]),
    );
    let fetcher = MockFetcher::new().with_failure("repoB", MockFetchFailure::Authentication);

    let report = ScanManager::new(WorkerPoolConfig::new(2))
        .run(
            vec![ScanTarget::remote("repoA"), ScanTarget::remote("repoB")],
            factory(&scanner, &fetcher, PipelineOptions::new()),
        )
        .await;

    assert_eq!(report.len(), 2);
    match report.get("repoA") {
        Some(ScanOutcome::Success(success)) => {
            assert_eq!(
                success.findings,
                vec![Finding::new("Prototype Pollution", Severity::High, "lodash")]
            );
        }
        other => panic!("expected success, got {:?}", other),
    }
    assert_eq!(
        report.get("repoB").unwrap().failure_kind(),
        Some(FailureKind::Fetch)
    );
    assert_eq!(report.status(), BatchStatus::PartialFailure);
    assert_eq!(report.total_findings(), 1);
    assert_eq!(report.severity_counts().high, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn workspaces_are_removed_on_every_path() {
    let root = TempDir::new().unwrap();
    let scanner = MockScanner::new()
        .with_scan("panics", MockScan::Panic("scanner crashed".into()))
        .with_scan("bad-output", MockScan::Raw(b"not json".to_vec()));
    let fetcher = MockFetcher::new()
        .with_failure("unreachable", MockFetchFailure::NotFound)
        .with_files("no-manifest", vec![("README.md", "# nothing to scan")]);
    let options = PipelineOptions::new().with_workspace_root(root.path());

    let report = ScanManager::new(WorkerPoolConfig::new(2))
        .run(
            ["clean", "panics", "bad-output", "unreachable", "no-manifest"]
                .into_iter()
                .map(ScanTarget::remote)
                .collect(),
            factory(&scanner, &fetcher, options),
        )
        .await;

    assert!(report.get("clean").unwrap().is_success());
    assert_eq!(report.get("panics").unwrap().failure_kind(), Some(FailureKind::Internal));
    assert_eq!(
        report.get("bad-output").unwrap().failure_kind(),
        Some(FailureKind::OutputFormat)
    );
    assert_eq!(report.get("unreachable").unwrap().failure_kind(), Some(FailureKind::Fetch));
    assert_eq!(
        report.get("no-manifest").unwrap().failure_kind(),
        Some(FailureKind::NoManifest)
    );

    assert_eq!(leftover_workspaces(root.path()), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancellation_reports_undispatched_targets() {
    let targets = remotes(4);
    let scanner = MockScanner::new().with_latency(Duration::from_millis(300));
    let fetcher = MockFetcher::new();
    let token = CancellationToken::new();

    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        })
    };

    let report = ScanManager::new(WorkerPoolConfig::new(1))
        .with_cancellation(token)
        .run(targets.clone(), factory(&scanner, &fetcher, PipelineOptions::new()))
        .await;
    canceller.await.unwrap();

    assert_eq!(report.len(), 4);
    assert!(report.get(targets[0].id()).unwrap().is_success());
    for target in &targets[1..] {
        assert_eq!(
            report.get(target.id()).unwrap().failure_kind(),
            Some(FailureKind::Cancelled)
        );
    }
    assert_eq!(scanner.scan_count(), 1);
}

#[tokio::test]
async fn duplicate_targets_collapse() {
    let scanner = MockScanner::new();
    let fetcher = MockFetcher::new();
    let targets = vec![
        ScanTarget::remote("https://git.example.com/a.git"),
        ScanTarget::remote("https://git.example.com/b.git"),
        ScanTarget::remote("https://git.example.com/a.git"),
    ];

    let report = ScanManager::new(WorkerPoolConfig::new(3))
        .run(targets, factory(&scanner, &fetcher, PipelineOptions::new()))
        .await;

    assert_eq!(report.len(), 2);
    assert_eq!(fetcher.fetch_count(), 2);
    assert_eq!(scanner.scan_count(), 2);
}

//! The worker pool orchestrator.

use crate::audit;
use crate::core::{
    BatchReport, FailureKind, PipelineError, ScanFailure, ScanOutcome, ScanTarget,
};
use crate::manager::queue::TargetQueue;
use crate::pipeline::PipelineFactory;
use crate::resolver::dedup_targets;

use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Default number of workers.
pub const DEFAULT_CONCURRENCY: i64 = 4;

/// Configuration for the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Requested number of concurrent workers. Values below 1 mean 1.
    pub concurrency: i64,
}

impl WorkerPoolConfig {
    /// Creates a configuration with the requested concurrency.
    pub fn new(concurrency: i64) -> Self {
        Self { concurrency }
    }

    /// Number of workers to spawn for `target_count` targets.
    ///
    /// Clamped to `[1, max(1, target_count)]`.
    pub fn effective_workers(&self, target_count: usize) -> usize {
        let upper = target_count.max(1);
        if self.concurrency < 1 {
            return 1;
        }
        usize::try_from(self.concurrency)
            .map(|requested| requested.min(upper))
            .unwrap_or(upper)
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

/// Runs a batch of targets through a bounded pool of workers.
///
/// Each worker takes one target at a time from a shared queue and runs it
/// through a pipeline freshly built by the factory. Outcomes flow back over
/// a channel and are keyed by target identity in the [`BatchReport`].
///
/// The manager never fails: every target ends up in the report as either a
/// success or a classified failure.
///
/// # Examples
///
/// ```rust,no_run
/// use scanfleet::backends::{MockFetcher, MockScanner};
/// use scanfleet::core::ScanTarget;
/// use scanfleet::manager::{ScanManager, WorkerPoolConfig};
/// use scanfleet::pipeline::{PipelineOptions, ScanPipeline};
///
/// # async fn example() {
/// let scanner = MockScanner::new();
/// let fetcher = MockFetcher::new();
/// let manager = ScanManager::new(WorkerPoolConfig::new(2));
///
/// let report = manager
///     .run(
///         vec![
///             ScanTarget::remote("https://example.com/a.git"),
///             ScanTarget::remote("https://example.com/b.git"),
///         ],
///         move || ScanPipeline::new(scanner.clone(), fetcher.clone(), PipelineOptions::new()),
///     )
///     .await;
/// assert_eq!(report.len(), 2);
/// # }
/// ```
pub struct ScanManager {
    config: WorkerPoolConfig,
    cancellation: CancellationToken,
}

impl ScanManager {
    /// Creates a manager.
    pub fn new(config: WorkerPoolConfig) -> Self {
        Self {
            config,
            cancellation: CancellationToken::new(),
        }
    }

    /// Uses `token` to stop dispatching new targets.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns a handle to the cancellation token.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Returns the pool configuration.
    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Scans every target and returns the merged report.
    ///
    /// Duplicate target identities are collapsed first. When the batch is
    /// cancelled, targets still queued are reported as
    /// [`FailureKind::Cancelled`] and in-flight targets run to completion.
    pub async fn run<F>(&self, targets: Vec<ScanTarget>, factory: F) -> BatchReport
    where
        F: PipelineFactory,
    {
        let mut report = BatchReport::new();
        let batch_id = report.id.clone();
        let targets = dedup_targets(targets);

        if targets.is_empty() {
            tracing::info!(batch_id = %batch_id, "No targets to scan");
            report.finish();
            return report;
        }

        let workers = self.config.effective_workers(targets.len());
        audit::emit_batch_started(&batch_id, targets.len(), workers);

        let expected = targets.clone();
        let queue = TargetQueue::preloaded(targets);
        let factory = Arc::new(factory);
        let (results, mut outcomes) = mpsc::unbounded_channel();

        let mut join_set = JoinSet::new();
        for worker_id in 0..workers {
            join_set.spawn(worker_loop(
                worker_id,
                queue.clone(),
                Arc::clone(&factory),
                results.clone(),
                self.cancellation.clone(),
                batch_id.clone(),
            ));
        }
        drop(results);

        while let Some(outcome) = outcomes.recv().await {
            audit::emit_target_completed(&batch_id, &outcome);
            if let Some(previous) = report.insert(outcome) {
                tracing::warn!(
                    scan_target = %previous.target().locator,
                    "Target produced more than one outcome, keeping the latest"
                );
            }
        }

        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Worker task ended abnormally");
            }
        }

        for target in queue.drain().await {
            let outcome = ScanOutcome::Failure(ScanFailure::from_error(
                target,
                &PipelineError::Cancelled,
                Utc::now(),
            ));
            audit::emit_target_completed(&batch_id, &outcome);
            report.insert(outcome);
        }

        for target in expected {
            if !report.contains(target.id()) {
                tracing::error!(scan_target = %target.locator, "No outcome recorded for target");
                report.insert(ScanOutcome::Failure(ScanFailure::new(
                    target,
                    FailureKind::Internal,
                    "no outcome was produced for this target",
                    Utc::now(),
                )));
            }
        }

        report.finish();
        audit::emit_batch_completed(&report);
        report
    }
}

async fn worker_loop<F>(
    worker_id: usize,
    queue: TargetQueue,
    factory: Arc<F>,
    results: mpsc::UnboundedSender<ScanOutcome>,
    cancellation: CancellationToken,
    batch_id: String,
) where
    F: PipelineFactory,
{
    tracing::debug!(worker_id, "Worker started");

    loop {
        if cancellation.is_cancelled() {
            tracing::debug!(worker_id, pending = queue.pending(), "Worker stopping on cancellation");
            break;
        }
        let Some(target) = queue.next().await else {
            break;
        };

        audit::emit_target_started(&batch_id, &target, worker_id);
        let outcome = run_target(factory.as_ref(), &target).await;
        if results.send(outcome).is_err() {
            break;
        }
    }

    tracing::debug!(worker_id, "Worker finished");
}

/// Builds a pipeline and runs one target, turning a panic into a failure.
async fn run_target<F>(factory: &F, target: &ScanTarget) -> ScanOutcome
where
    F: PipelineFactory,
{
    let started_at = Utc::now();
    let attempt = AssertUnwindSafe(async {
        let pipeline = factory.build();
        pipeline.execute(target).await
    })
    .catch_unwind()
    .await;

    match attempt {
        Ok(outcome) => outcome,
        Err(payload) => {
            let error = PipelineError::Panicked {
                message: panic_message(payload.as_ref()),
            };
            tracing::error!(scan_target = %target.locator, error = %error, "Pipeline panicked");
            ScanOutcome::Failure(ScanFailure::from_error(target.clone(), &error, started_at))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl std::fmt::Debug for ScanManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanManager")
            .field("config", &self.config)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{MockFetchFailure, MockFetcher, MockScan, MockScanner};
    use crate::pipeline::{PipelineOptions, ScanPipeline};
    use crate::core::BatchStatus;

    fn factory(
        scanner: &MockScanner,
        fetcher: &MockFetcher,
        options: PipelineOptions,
    ) -> impl Fn() -> ScanPipeline + Send + Sync + 'static {
        let scanner = scanner.clone();
        let fetcher = fetcher.clone();
        move || ScanPipeline::new(scanner.clone(), fetcher.clone(), options.clone())
    }

    fn remotes(names: &[&str]) -> Vec<ScanTarget> {
        names.iter().map(|n| ScanTarget::remote(*n)).collect()
    }

    #[test]
    fn test_effective_workers() {
        assert_eq!(WorkerPoolConfig::new(10).effective_workers(3), 3);
        assert_eq!(WorkerPoolConfig::new(2).effective_workers(3), 2);
        assert_eq!(WorkerPoolConfig::new(0).effective_workers(3), 1);
        assert_eq!(WorkerPoolConfig::new(-5).effective_workers(3), 1);
        assert_eq!(WorkerPoolConfig::new(4).effective_workers(0), 1);
        assert_eq!(WorkerPoolConfig::new(i64::MAX).effective_workers(7), 7);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let scanner = MockScanner::new();
        let fetcher = MockFetcher::new();
        let report = ScanManager::new(WorkerPoolConfig::default())
            .run(Vec::new(), factory(&scanner, &fetcher, PipelineOptions::new()))
            .await;

        assert!(report.is_empty());
        assert_eq!(report.status(), BatchStatus::Ok);
        assert_eq!(scanner.scan_count(), 0);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_others() {
        let scanner = MockScanner::new();
        let fetcher = MockFetcher::new().with_failure("r2", MockFetchFailure::Authentication);
        let report = ScanManager::new(WorkerPoolConfig::new(3))
            .run(
                remotes(&["r1", "r2", "r3"]),
                factory(&scanner, &fetcher, PipelineOptions::new()),
            )
            .await;

        assert_eq!(report.len(), 3);
        assert!(report.get("r1").unwrap().is_success());
        assert_eq!(report.get("r2").unwrap().failure_kind(), Some(FailureKind::Fetch));
        assert!(report.get("r3").unwrap().is_success());
        assert_eq!(report.status(), BatchStatus::PartialFailure);
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_failure() {
        let scanner = MockScanner::new().with_scan("boom", MockScan::Panic("scanner exploded".into()));
        let fetcher = MockFetcher::new();
        let report = ScanManager::new(WorkerPoolConfig::new(1))
            .run(
                remotes(&["ok-1", "boom", "ok-2"]),
                factory(&scanner, &fetcher, PipelineOptions::new()),
            )
            .await;

        assert_eq!(report.len(), 3);
        match report.get("boom") {
            Some(ScanOutcome::Failure(f)) => {
                assert_eq!(f.kind, FailureKind::Internal);
                assert!(f.cause.contains("scanner exploded"));
            }
            other => panic!("expected internal failure, got {:?}", other),
        }
        assert!(report.get("ok-1").unwrap().is_success());
        assert!(report.get("ok-2").unwrap().is_success());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let scanner = MockScanner::new();
        let fetcher = MockFetcher::new();
        let token = CancellationToken::new();
        token.cancel();

        let report = ScanManager::new(WorkerPoolConfig::new(2))
            .with_cancellation(token)
            .run(
                remotes(&["a", "b", "c"]),
                factory(&scanner, &fetcher, PipelineOptions::new()),
            )
            .await;

        assert_eq!(report.len(), 3);
        assert!(report
            .failures()
            .all(|f| f.kind == FailureKind::Cancelled));
        assert_eq!(fetcher.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicates_collapse() {
        let scanner = MockScanner::new();
        let fetcher = MockFetcher::new();
        let report = ScanManager::new(WorkerPoolConfig::new(4))
            .run(
                remotes(&["a", "b", "a", "a"]),
                factory(&scanner, &fetcher, PipelineOptions::new()),
            )
            .await;

        assert_eq!(report.len(), 2);
        assert_eq!(fetcher.fetch_count(), 2);
    }

    #[test]
    fn test_debug_output() {
        let manager = ScanManager::new(WorkerPoolConfig::new(3));
        let debug = format!("{:?}", manager);
        assert!(debug.contains("concurrency: 3"));
        assert!(debug.contains("cancelled: false"));
    }
}

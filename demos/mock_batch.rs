//! Batch scan example using the mock backends.
//!
//! This example shows how to:
//! - Configure mock adapters with per-target responses
//! - Run a batch through the ScanManager
//! - Inspect successes and failures in the merged report
//!
//! Run with: cargo run --example mock_batch

use scanfleet::backends::{MockFetchFailure, MockFetcher, MockMonitor, MockScan, MockScanner};
use scanfleet::prelude::*;
use scanfleet::report::{render, OutputFormat};

use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== scanfleet Mock Batch Example ===\n");

    let scanner = MockScanner::new()
        .with_scan(
            "https://git.example.com/shop/api.git",
            MockScan::Findings(vec![
                Finding::new("Prototype Pollution", Severity::High, "lodash"),
                Finding::new("Regular Expression Denial of Service", Severity::Medium, "ms"),
            ]),
        )
        .with_monitor(
            "https://git.example.com/shop/web.git",
            MockMonitor::Fail("dashboard unavailable".into()),
        )
        .with_latency(Duration::from_millis(100));

    let fetcher = MockFetcher::new().with_failure(
        "https://git.example.com/shop/payments.git",
        MockFetchFailure::Authentication,
    );

    let targets = vec![
        ScanTarget::parse("https://git.example.com/shop/api.git"),
        ScanTarget::parse("https://git.example.com/shop/web.git"),
        ScanTarget::parse("https://git.example.com/shop/payments.git"),
    ];

    let options = PipelineOptions::new().with_monitor(true);
    let manager = ScanManager::new(WorkerPoolConfig::new(2));
    let report = manager
        .run(targets, move || {
            ScanPipeline::new(scanner.clone(), fetcher.clone(), options.clone())
        })
        .await;

    println!("{}", render(&report, OutputFormat::Text)?);

    for failure in report.failures() {
        println!("{} failed with kind '{}'", failure.target, failure.kind);
    }

    Ok(())
}

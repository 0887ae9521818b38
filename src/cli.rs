//! Command-line interface.
//!
//! Parses arguments, builds [`Settings`] and the target list, runs the batch
//! and writes the report. The binary only sets up logging and the runtime.

use crate::config::{load_dotenv, Settings};
use crate::core::{BatchReport, ScanTarget};
use crate::manager::{ScanManager, WorkerPoolConfig, DEFAULT_CONCURRENCY};
use crate::pipeline::{ManifestSet, PipelineOptions, SettingsPipelineFactory};
use crate::report::{write_report, OutputFormat};
use crate::resolver;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Exit status when every target succeeded.
pub const EXIT_OK: u8 = 0;

/// Exit status when at least one target failed.
pub const EXIT_PARTIAL_FAILURE: u8 = 1;

/// Exit status for usage or configuration errors before any scan ran.
pub const EXIT_USAGE: u8 = 2;

#[deny(missing_docs)]
#[derive(Parser, Debug)]
#[command(name = "scanfleet", version = env!("CARGO_PKG_VERSION"))]
/// scanfleet - Run dependency security scans across many repositories at once
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Global arguments that apply to all subcommands
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Top-level subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Clone and scan remote repositories
    Scan(ScanArgs),

    /// Discover and scan projects under a local directory
    ScanLocal(ScanLocalArgs),

    /// Scan GitLab projects by id
    #[command(name = "scan-gitlab")]
    ScanGitlab(ScanGitlabArgs),
}

impl Command {
    /// Options shared by every command.
    pub fn common(&self) -> &CommonArgs {
        match self {
            Self::Scan(args) => &args.common,
            Self::ScanLocal(args) => &args.common,
            Self::ScanGitlab(args) => &args.common,
        }
    }

    fn monitor(&self) -> bool {
        match self {
            Self::Scan(args) => args.monitor,
            Self::ScanLocal(args) => args.monitor,
            Self::ScanGitlab(args) => args.monitor,
        }
    }

    fn clone_depth(&self) -> Option<u32> {
        match self {
            Self::Scan(args) => args.clone_depth,
            Self::ScanLocal(_) => None,
            Self::ScanGitlab(args) => args.clone_depth,
        }
    }
}

/// Global options
#[derive(Args, Debug, Clone, Default)]
#[command(next_help_heading = "Global Options")]
pub struct GlobalArgs {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(global = true, long = "verbose", short = 'v', action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(global = true, long, short)]
    pub quiet: bool,

    /// Log line format
    #[arg(global = true, long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log output format
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// JSON lines
    Json,
}

/// Options shared by all scan commands
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    /// Write the report to this file instead of stdout
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output_file: Option<PathBuf>,

    /// Snyk organization, overriding config and environment
    #[arg(long, value_name = "ORG")]
    pub snyk_org: Option<String>,

    /// Config file (default: ~/.config/repo-scanner/config.yaml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Number of concurrent workers. Values below 1 mean 1
    #[arg(long, short = 'w', default_value_t = DEFAULT_CONCURRENCY, allow_negative_numbers = true)]
    pub workers: i64,

    /// Per-target limit for each scanner invocation, in seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    pub scan_timeout: Option<u64>,
}

/// Arguments for `scan`
#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Repository to scan (repeatable)
    #[arg(long = "repo", short = 'r', value_name = "URL")]
    pub repos: Vec<String>,

    /// File with one repository per line
    #[arg(long, value_name = "PATH")]
    pub repo_file: Option<PathBuf>,

    /// Register each project with the Snyk dashboard
    #[arg(long)]
    pub monitor: bool,

    /// Clone depth (0 for a full clone)
    #[arg(long, value_name = "N")]
    pub clone_depth: Option<u32>,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub common: CommonArgs,
}

/// Arguments for `scan-local`
#[derive(Args, Debug, Clone)]
pub struct ScanLocalArgs {
    /// Root directory to search for projects
    #[arg(long, short = 'd', value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Skip registering projects with the Snyk dashboard
    #[arg(long = "no-monitor", action = ArgAction::SetFalse)]
    pub monitor: bool,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub common: CommonArgs,
}

/// Arguments for `scan-gitlab`
#[derive(Args, Debug, Clone)]
pub struct ScanGitlabArgs {
    /// GitLab project id (repeatable)
    #[arg(long = "project-id", short = 'p', value_name = "ID", required = true)]
    pub project_ids: Vec<u64>,

    /// Skip registering projects with the Snyk dashboard
    #[arg(long = "no-monitor", action = ArgAction::SetFalse)]
    pub monitor: bool,

    /// Clone depth (0 for a full clone)
    #[arg(long, value_name = "N")]
    pub clone_depth: Option<u32>,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub common: CommonArgs,
}

/// Runs the parsed command and returns the process exit code.
///
/// Errors returned from here happen before any target is scanned and map
/// to [`EXIT_USAGE`].
pub async fn run(cli: Cli) -> Result<ExitCode> {
    load_dotenv();

    let command = &cli.command;
    let common = command.common();

    let settings = Settings::load(common.config.as_deref())
        .context("Failed to load configuration")?
        .with_snyk_org(common.snyk_org.clone())
        .with_clone_depth(command.clone_depth());

    if let Command::ScanGitlab(_) = command {
        if settings.gitlab.base_url.is_none() || settings.gitlab.token.is_none() {
            bail!(
                "GitLab is not configured: set GITLAB_BASE_URL and GITLAB_PERSONAL_ACCESS_TOKEN"
            );
        }
    }

    let targets = resolve_targets(command)?;
    let options = pipeline_options(command);
    let factory = SettingsPipelineFactory::new(Arc::new(settings), options);

    let cancellation = CancellationToken::new();
    let interrupt = tokio::spawn(cancel_on_interrupt(cancellation.clone()));

    let manager = ScanManager::new(WorkerPoolConfig::new(common.workers))
        .with_cancellation(cancellation);
    let report = manager.run(targets, factory).await;
    interrupt.abort();

    write_report(&report, common.output_format, common.output_file.as_deref())
        .context("Failed to write report")?;

    Ok(ExitCode::from(exit_status(&report)))
}

/// Builds the ordered target list for `command`.
pub fn resolve_targets(command: &Command) -> Result<Vec<ScanTarget>> {
    let targets = match command {
        Command::Scan(args) => {
            let mut targets: Vec<ScanTarget> =
                args.repos.iter().map(|r| ScanTarget::parse(r)).collect();
            if let Some(path) = &args.repo_file {
                targets.extend(resolver::read_target_file(path)?);
            }
            if targets.is_empty() {
                bail!("No repositories given: use --repo or --repo-file");
            }
            targets
        }
        Command::ScanLocal(args) => {
            let projects = resolver::discover_local_projects(&args.dir, &ManifestSet::default())
                .with_context(|| format!("Failed to search '{}'", args.dir.display()))?;
            if projects.is_empty() {
                tracing::warn!(dir = %args.dir.display(), "No projects found");
            }
            resolver::local_targets(&projects)
        }
        Command::ScanGitlab(args) => resolver::project_targets(&args.project_ids),
    };

    Ok(resolver::dedup_targets(targets))
}

fn pipeline_options(command: &Command) -> PipelineOptions {
    let options = PipelineOptions::new().with_monitor(command.monitor());
    match command.common().scan_timeout {
        Some(secs) if secs > 0 => options.with_scan_timeout(Duration::from_secs(secs)),
        _ => options,
    }
}

async fn cancel_on_interrupt(token: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::warn!("Interrupted, finishing in-flight targets");
            token.cancel();
        }
        Err(e) => tracing::debug!(error = %e, "Could not listen for Ctrl-C"),
    }
}

/// Maps a report to the process exit status.
pub fn exit_status(report: &BatchReport) -> u8 {
    if report.has_failures() {
        EXIT_PARTIAL_FAILURE
    } else {
        EXIT_OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FailureKind, ScanFailure, TargetKind};
    use chrono::Utc;
    use clap::CommandFactory;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("scanfleet").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scan_defaults() {
        let cli = parse(&["scan", "-r", "https://example.com/a.git"]);
        let Command::Scan(args) = &cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.repos, vec!["https://example.com/a.git"]);
        assert!(!args.monitor);
        assert_eq!(args.clone_depth, None);
        assert_eq!(args.common.workers, DEFAULT_CONCURRENCY);
        assert_eq!(args.common.output_format, OutputFormat::Text);
        assert_eq!(cli.global.verbose, 0);
        assert_eq!(cli.global.log_format, LogFormat::Text);
    }

    #[test]
    fn test_negative_workers_accepted() {
        let cli = parse(&["scan", "-r", "x", "-w", "-3"]);
        assert_eq!(cli.command.common().workers, -3);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["scan-local", "-d", "/srv", "-vv", "--log-format", "json"]);
        assert_eq!(cli.global.verbose, 2);
        assert_eq!(cli.global.log_format, LogFormat::Json);
    }

    #[test]
    fn test_monitor_defaults() {
        let local = parse(&["scan-local"]);
        assert!(local.command.monitor());

        let local = parse(&["scan-local", "--no-monitor"]);
        assert!(!local.command.monitor());

        let gitlab = parse(&["scan-gitlab", "-p", "1", "-p", "2"]);
        assert!(gitlab.command.monitor());
        let Command::ScanGitlab(args) = &gitlab.command else {
            panic!("expected scan-gitlab");
        };
        assert_eq!(args.project_ids, vec![1, 2]);
    }

    #[test]
    fn test_scan_gitlab_requires_project() {
        let result = Cli::try_parse_from(["scanfleet", "scan-gitlab"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_scan_targets() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("repos.txt");
        std::fs::write(
            &list,
            "# team repos\nhttps://example.com/b.git\n\nhttps://example.com/a.git\n",
        )
        .unwrap();

        let cli = parse(&[
            "scan",
            "-r",
            "https://example.com/a.git",
            "--repo-file",
            list.to_str().unwrap(),
        ]);
        let targets = resolve_targets(&cli.command).unwrap();
        let locators: Vec<_> = targets.iter().map(|t| t.locator.as_str()).collect();
        assert_eq!(
            locators,
            vec!["https://example.com/a.git", "https://example.com/b.git"]
        );
    }

    #[test]
    fn test_resolve_scan_requires_targets() {
        let cli = parse(&["scan"]);
        assert!(resolve_targets(&cli.command).is_err());
    }

    #[test]
    fn test_resolve_local_targets() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("svc")).unwrap();
        std::fs::write(dir.path().join("svc/go.mod"), "module svc").unwrap();

        let cli = parse(&["scan-local", "-d", dir.path().to_str().unwrap()]);
        let targets = resolve_targets(&cli.command).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].kind, TargetKind::Local);
    }

    #[test]
    fn test_pipeline_options_from_args() {
        let cli = parse(&["scan", "-r", "x", "--monitor", "--scan-timeout", "90"]);
        let options = pipeline_options(&cli.command);
        assert!(options.monitor);
        assert_eq!(options.scan_timeout, Some(Duration::from_secs(90)));

        let cli = parse(&["scan", "-r", "x", "--scan-timeout", "0"]);
        assert_eq!(pipeline_options(&cli.command).scan_timeout, None);
    }

    #[test]
    fn test_exit_status() {
        let mut report = BatchReport::new();
        assert_eq!(exit_status(&report), EXIT_OK);

        report.insert(
            ScanFailure::new(ScanTarget::remote("r"), FailureKind::Fetch, "denied", Utc::now())
                .into(),
        );
        assert_eq!(exit_status(&report), EXIT_PARTIAL_FAILURE);
    }
}

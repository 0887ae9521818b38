use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::runtime::Builder;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, registry, util::SubscriberInitExt};

use scanfleet::cli::{self, Cli, GlobalArgs, LogFormat, EXIT_USAGE};

fn main() -> ExitCode {
    let args = Cli::parse();
    setup_logging(&args.global);

    match try_main(args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn try_main(args: Cli) -> Result<ExitCode> {
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;
    runtime.block_on(cli::run(args))
}

fn setup_logging(global_args: &GlobalArgs) {
    let level = if global_args.quiet {
        LevelFilter::ERROR
    } else {
        match global_args.verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    // Dependencies only log errors; scanfleet and its audit events follow -v.
    let filter = tracing_subscriber::filter::Targets::new()
        .with_default(LevelFilter::ERROR)
        .with_target("scanfleet", level);

    let (text_layer, json_layer) = match global_args.log_format {
        LogFormat::Text => (
            Some(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_ansi(false)
                    .without_time(),
            ),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(fmt::layer().json().with_writer(std::io::stderr)),
        ),
    };

    registry()
        .with(text_layer)
        .with(json_layer)
        .with(filter)
        .init();
}

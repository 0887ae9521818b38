//! Report rendering.

mod json;
mod text;

pub use json::{render_json, JsonReport, JsonSummary, JsonTarget};
pub use text::render_text;

use crate::core::BatchReport;

use std::io::Write;
use std::path::Path;

/// Output format for the final report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text summary.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Renders `report` in `format`.
pub fn render(report: &BatchReport, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Json => render_json(report).map(|mut s| {
            s.push('\n');
            s
        }),
    }
}

/// Writes the rendered report to `path`, or to stdout when `path` is `None`.
pub fn write_report(
    report: &BatchReport,
    format: OutputFormat,
    path: Option<&Path>,
) -> std::io::Result<()> {
    let rendered = render(report, format).map_err(std::io::Error::other)?;
    match path {
        Some(path) => {
            std::fs::write(path, rendered)?;
            tracing::info!(path = %path.display(), "Report written");
            Ok(())
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(rendered.as_bytes())?;
            handle.flush()
        }
    }
}

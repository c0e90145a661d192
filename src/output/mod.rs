//! Report rendering for the CLI.
mod summary;


use serde::Serialize;
use tracing::info;

use crate::args::OutputFormat;
use crate::domain::{BatchReport, StressReport, TestResult};
use crate::error::AppResult;

/// Whatever a subcommand produced.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Report {
    Batch(BatchReport),
    Stress(StressReport),
    Single(TestResult),
}

impl Report {
    /// Whether the run should count as a pass for the process exit status.
    #[must_use]
    pub fn passed(&self) -> bool {
        match self {
            Report::Batch(report) => report.failed_tests == 0,
            Report::Stress(report) => report.failed_requests == 0,
            Report::Single(result) => result.success,
        }
    }
}

/// Renders `report` in the requested format.
///
/// # Errors
///
/// Returns an error when JSON serialization fails.
pub fn render(report: &Report, format: OutputFormat) -> AppResult<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Summary => Ok(summary::summary_lines(report).join("\n")),
    }
}

/// Writes the rendered report to `path`, or to stdout when no path is given.
///
/// # Errors
///
/// Returns an error when rendering fails or the file cannot be written.
pub async fn write_report(
    report: &Report,
    format: OutputFormat,
    path: Option<&str>,
) -> AppResult<()> {
    let mut rendered = render(report, format)?;
    rendered.push('\n');
    match path {
        Some(path) => {
            tokio::fs::write(path, rendered).await?;
            info!("Report written to {}", path);
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

// src/report.rs
//! Human-readable run header and summary.

use crate::config::{Config, Mode};
use crate::constants::REPORT_RULE;
use crate::summary::RunSummary;
use std::io::{self, Write};

/// Writes the resolved configuration. The token is never printed.
pub fn write_header(writer: &mut dyn Write, config: &Config) -> io::Result<()> {
    writeln!(writer, "{}", REPORT_RULE)?;
    writeln!(writer, "Workspace : {}", config.workspace)?;
    writeln!(writer, "Username  : {}", config.credentials.username)?;
    writeln!(writer, "Mode      : {}", config.mode)?;
    if config.mode == Mode::Projects {
        let keys: Vec<&str> = config.project_keys.iter().map(String::as_str).collect();
        writeln!(writer, "Projects  : {}", keys.join(", "))?;
    }
    writeln!(writer, "Format    : {}", config.output_format)?;
    writeln!(writer, "Output    : {}", config.output_dir.display())?;
    writeln!(writer, "Jobs      : {}", config.jobs)?;
    writeln!(writer, "{}", REPORT_RULE)?;
    Ok(())
}

/// Writes the final tally, then failed repositories and warnings if any.
pub fn write_summary(writer: &mut dyn Write, summary: &RunSummary) -> io::Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", REPORT_RULE)?;
    writeln!(writer, "Download Summary")?;
    writeln!(
        writer,
        "  Successful : {} (created {}, updated {})",
        summary.successful(),
        summary.created,
        summary.updated
    )?;
    writeln!(writer, "  Skipped    : {}", summary.skipped)?;
    writeln!(writer, "  Failed     : {}", summary.failed)?;
    writeln!(writer, "{}", REPORT_RULE)?;

    if !summary.failures.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "Failed repositories:")?;
        for failure in &summary.failures {
            writeln!(
                writer,
                "  [{}] {}: {}",
                failure.project_key.as_deref().unwrap_or("-"),
                failure.slug,
                failure.detail
            )?;
        }
        writeln!(writer, "{}", REPORT_RULE)?;
    }

    if !summary.warnings.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "Warnings:")?;
        for warning in &summary.warnings {
            writeln!(writer, "  {}", warning)?;
        }
        writeln!(writer, "{}", REPORT_RULE)?;
    }
    Ok(())
}

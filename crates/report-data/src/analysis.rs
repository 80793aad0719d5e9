//! Main report pipeline.
//!
//! Opens the archive, streams every line through the accumulator, finalises
//! the report and writes it out, returning a [`RunSummary`] for diagnostics.

use std::path::PathBuf;

use chrono::Utc;
use report_core::error::Result;
use report_core::settings::{OrphanPolicy, Settings};
use tracing::{info, warn};

use crate::aggregator::{ReportAccumulator, SkipCounts};
use crate::reader::{open_archive, ArchiveLine};
use crate::report::{write_report, Report};

// ── Public types ──────────────────────────────────────────────────────────────

/// Inputs of one report run.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub orphans: OrphanPolicy,
    /// Log progress every N lines; 0 disables.
    pub progress_interval: u64,
}

impl From<&Settings> for ReportOptions {
    fn from(settings: &Settings) -> Self {
        ReportOptions {
            input: settings.input.clone(),
            output: settings.output.clone(),
            orphans: settings.orphans,
            progress_interval: settings.progress_interval,
        }
    }
}

/// What happened during a run. Logged, never part of the report itself.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// RFC 3339 timestamp of when the report was built.
    pub generated_at: String,
    pub output: PathBuf,
    pub lines_read: u64,
    pub records_applied: u64,
    pub blank_lines: u64,
    pub skipped: SkipCounts,
    pub total_users: u64,
    pub total_sessions: u64,
    pub elapsed_seconds: f64,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Feed `lines` into a fresh accumulator.
///
/// Stops at the first fatal error; per-line problems are only counted.
pub fn process_lines<I>(lines: I, progress_interval: u64) -> Result<(ReportAccumulator, u64)>
where
    I: IntoIterator<Item = Result<ArchiveLine>>,
{
    let mut acc = ReportAccumulator::new();
    let mut lines_read = 0u64;

    for line in lines {
        let line = line?;
        lines_read += 1;

        match line.text() {
            Ok(text) => acc.consume_line(line.number, text),
            Err(err) => acc.skip(line.number, &err),
        }

        if progress_interval > 0 && lines_read % progress_interval == 0 {
            info!(
                "Processed {} lines ({} sessions, {} users so far)",
                lines_read,
                acc.total_sessions(),
                acc.users().len()
            );
        }
    }

    Ok((acc, lines_read))
}

/// Build the report for `input` without writing it anywhere.
pub fn build_report(options: &ReportOptions) -> Result<(Report, RunSummary)> {
    let start = std::time::Instant::now();

    let lines = open_archive(&options.input)?;
    let (acc, lines_read) = process_lines(lines, options.progress_interval)?;

    let records_applied = acc.records_applied();
    let blank_lines = acc.blank_lines();
    let skipped = acc.skipped();
    let total_users = acc.users().len() as u64;
    let total_sessions = acc.total_sessions();

    if skipped.total() > 0 {
        warn!(
            "Skipped {} malformed lines ({} unknown kind, {} invalid field, {} missing field, {} bad encoding)",
            skipped.total(),
            skipped.unknown_kind,
            skipped.invalid_field,
            skipped.missing_field,
            skipped.invalid_encoding,
        );
    }

    let report = acc.finalize(options.orphans)?;

    let summary = RunSummary {
        generated_at: Utc::now().to_rfc3339(),
        output: options.output.clone(),
        lines_read,
        records_applied,
        blank_lines,
        skipped,
        total_users,
        total_sessions,
        elapsed_seconds: start.elapsed().as_secs_f64(),
    };

    Ok((report, summary))
}

/// Run the full pipeline and write the report to `options.output`.
///
/// On any error nothing is written.
pub fn generate_report(options: &ReportOptions) -> Result<RunSummary> {
    info!(
        "Generating report from {} into {}",
        options.input.display(),
        options.output.display()
    );

    let (report, summary) = build_report(options)?;
    write_report(&report, &options.output)?;

    info!(
        "Report generated at {}: {} users, {} sessions, {} lines in {:.2}s",
        summary.generated_at,
        summary.total_users,
        summary.total_sessions,
        summary.lines_read,
        summary.elapsed_seconds
    );

    Ok(summary)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

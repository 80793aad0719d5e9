mod bootstrap;

use anyhow::{Context, Result};
use report_core::settings::Settings;
use report_data::analysis::{generate_report, ReportOptions};

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("Session Report v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Orphan policy: {:?}", settings.orphans);

    let options = ReportOptions::from(&settings);

    let summary = match generate_report(&options) {
        Ok(summary) => summary,
        Err(err) => {
            tracing::error!("Report generation failed: {}", err);
            return Err(err).with_context(|| {
                format!("could not build report from {}", options.input.display())
            });
        }
    };

    tracing::info!(
        "Done: {} records applied, {} lines skipped, output at {}",
        summary.records_applied,
        summary.skipped.total(),
        summary.output.display()
    );

    Ok(())
}

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

// ── OrphanPolicy ───────────────────────────────────────────────────────────────

/// What to do with a user id that has sessions but never gets a user line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OrphanPolicy {
    /// Abort report generation with an error.
    #[default]
    Fail,
    /// Report the user under `"Unknown User <id>"`.
    Placeholder,
}

impl OrphanPolicy {
    /// Key used for an orphaned user id under [`OrphanPolicy::Placeholder`].
    pub fn placeholder_name(user_id: u64) -> String {
        format!("Unknown User {}", user_id)
    }
}

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Build a per-user session report from a gzip-compressed activity log
#[derive(Parser, Debug, Clone)]
#[command(
    name = "session-report",
    about = "Build a per-user session report from a gzip-compressed activity log",
    version
)]
pub struct Settings {
    /// Gzip-compressed input log
    #[arg(long, env = "SESSION_REPORT_INPUT", default_value = "data_large.txt.gz")]
    pub input: PathBuf,

    /// Where to write the JSON report
    #[arg(long, env = "SESSION_REPORT_OUTPUT", default_value = "result.json")]
    pub output: PathBuf,

    /// Handling of sessions whose user line never appears
    #[arg(long, value_enum, default_value_t = OrphanPolicy::Fail)]
    pub orphans: OrphanPolicy,

    /// Log progress every N lines (0 disables)
    #[arg(long, default_value = "0")]
    pub progress_interval: u64,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse the process arguments and apply the `--debug` override.
    pub fn load() -> Self {
        Self::load_from_args(std::env::args_os())
    }

    /// Same as [`load`](Self::load) but with an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut settings = Settings::parse_from(args);
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

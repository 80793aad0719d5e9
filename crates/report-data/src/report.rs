//! The final report document and how it is written to disk.

use std::path::Path;

use indexmap::IndexMap;
use report_core::error::{ReportError, Result};
use report_core::formatting::{format_minutes, join_with, sorted_listing};
use report_core::models::SessionDate;
use report_core::settings::OrphanPolicy;
use serde::Serialize;
use tracing::warn;

use crate::aggregator::{ReportAccumulator, UserStats};

// ── Report types ──────────────────────────────────────────────────────────────

/// Per-user section of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserReport {
    pub sessions_count: u64,
    /// `"<n> min."`
    pub total_time: String,
    /// `"<n> min."`
    pub longest_session: String,
    /// Every session's browser, sorted and joined with `", "`.
    pub browsers: String,
    #[serde(rename = "usedIE")]
    pub used_ie: bool,
    /// `null` for a user without sessions.
    pub always_used_chrome: Option<bool>,
    /// Distinct dates, newest first.
    pub dates: Vec<SessionDate>,
}

impl From<&UserStats> for UserReport {
    fn from(stats: &UserStats) -> Self {
        UserReport {
            sessions_count: stats.sessions_count,
            total_time: format_minutes(stats.total_time),
            longest_session: format_minutes(stats.longest_session),
            browsers: sorted_listing(&stats.browsers),
            used_ie: stats.used_internet_explorer,
            always_used_chrome: stats.always_used_chrome(),
            dates: stats.dates.iter().rev().copied().collect(),
        }
    }
}

/// The complete report. Field order here is the field order of the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub total_users: u64,
    pub unique_browsers_count: u64,
    pub total_sessions: u64,
    /// Distinct browsers, ascending, joined with `","`.
    pub all_browsers: String,
    /// Keyed by full name, in first-reference order of the user id.
    pub users_stats: IndexMap<String, UserReport>,
}

// ── Finalization ──────────────────────────────────────────────────────────────

impl ReportAccumulator {
    /// Turn the aggregation state into the report document.
    ///
    /// Two users with the same full name collapse into one entry: the later
    /// user's stats replace the earlier ones at the earlier position.
    pub fn finalize(self, orphans: OrphanPolicy) -> Result<Report> {
        let mut users_stats: IndexMap<String, UserReport> =
            IndexMap::with_capacity(self.users().len());

        for (&user_id, stats) in self.users() {
            let name = match (&stats.user, orphans) {
                (Some(user), _) => user.full_name(),
                (None, OrphanPolicy::Fail) => {
                    return Err(ReportError::MissingUserForStats { user_id });
                }
                (None, OrphanPolicy::Placeholder) => {
                    warn!("No user line for id {}; using placeholder name", user_id);
                    OrphanPolicy::placeholder_name(user_id)
                }
            };

            if users_stats.insert(name.clone(), UserReport::from(stats)).is_some() {
                warn!("Duplicate full name {:?}; user {} overwrites it", name, user_id);
            }
        }

        Ok(Report {
            total_users: self.users().len() as u64,
            unique_browsers_count: self.unique_browsers().len() as u64,
            total_sessions: self.total_sessions(),
            all_browsers: join_with(self.unique_browsers(), ","),
            users_stats,
        })
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

/// Serialise `report` as compact JSON followed by a single newline.
pub fn render_report(report: &Report) -> Result<String> {
    let mut json = serde_json::to_string(report)?;
    json.push('\n');
    Ok(json)
}

/// Write `report` to `path`, creating parent directories if needed.
///
/// The document is written to a temporary sibling first and renamed into
/// place, so `path` is either untouched or complete.
pub fn write_report(report: &Report, path: &Path) -> Result<()> {
    let json = render_report(report)?;
    let to_output_err = |source: std::io::Error| ReportError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(to_output_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    std::fs::write(&tmp, json).map_err(to_output_err)?;
    std::fs::rename(&tmp, path).map_err(to_output_err)?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

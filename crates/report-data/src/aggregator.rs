//! Single-pass aggregation of user and session records.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use report_core::error::RecordError;
use report_core::models::{Record, SessionDate, SessionRecord, UserRecord};
use tracing::debug;

use crate::parser::parse_line;

// ── UserStats ─────────────────────────────────────────────────────────────────

/// Running session statistics for one user id.
#[derive(Debug, Clone)]
pub struct UserStats {
    /// The user's own line, once it has been seen.
    pub user: Option<UserRecord>,
    pub sessions_count: u64,
    /// Sum of session lengths in minutes. Sessions are capped at `u32::MAX`
    /// minutes, so the sum fits for at least 2^32 sessions per user.
    pub total_time: u64,
    /// Longest single session in minutes (0 with no sessions).
    pub longest_session: u64,
    /// Normalised browser of every session, in arrival order.
    pub browsers: Vec<String>,
    pub used_internet_explorer: bool,
    /// Only meaningful when `sessions_count > 0`.
    pub always_used_chrome: bool,
    pub dates: BTreeSet<SessionDate>,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            user: None,
            sessions_count: 0,
            total_time: 0,
            longest_session: 0,
            browsers: Vec::new(),
            used_internet_explorer: false,
            always_used_chrome: true,
            dates: BTreeSet::new(),
        }
    }
}

impl UserStats {
    /// Attach the user's record. A second call replaces the first.
    pub fn attach_user(&mut self, user: UserRecord) {
        self.user = Some(user);
    }

    /// Fold one session into the running totals.
    pub fn add_session(&mut self, session: &SessionRecord) {
        self.sessions_count += 1;
        let minutes = u64::from(session.time);
        self.total_time += minutes;
        self.longest_session = self.longest_session.max(minutes);
        self.browsers.push(session.browser.clone());
        self.used_internet_explorer |= session.is_internet_explorer();
        self.always_used_chrome &= session.is_chrome();
        self.dates.insert(session.date);
    }

    /// `Some(flag)` once at least one session was seen, `None` otherwise.
    pub fn always_used_chrome(&self) -> Option<bool> {
        (self.sessions_count > 0).then_some(self.always_used_chrome)
    }
}

// ── SkipCounts ────────────────────────────────────────────────────────────────

/// Lines that were dropped during the scan, by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipCounts {
    pub unknown_kind: u64,
    pub invalid_field: u64,
    pub missing_field: u64,
    pub invalid_encoding: u64,
}

impl SkipCounts {
    fn record(&mut self, err: &RecordError) {
        match err {
            RecordError::UnknownRecordKind(_) => self.unknown_kind += 1,
            RecordError::InvalidFieldValue { .. } => self.invalid_field += 1,
            RecordError::MissingField { .. } => self.missing_field += 1,
            RecordError::InvalidEncoding { .. } => self.invalid_encoding += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.unknown_kind + self.invalid_field + self.missing_field + self.invalid_encoding
    }
}

// ── ReportAccumulator ─────────────────────────────────────────────────────────

/// Owns all aggregation state for one report run.
///
/// Lines must be fed in file order; results depend on that order only through
/// the order of the per-user map.
#[derive(Debug, Default)]
pub struct ReportAccumulator {
    users: IndexMap<u64, UserStats>,
    total_sessions: u64,
    unique_browsers: BTreeSet<String>,
    records_applied: u64,
    blank_lines: u64,
    skipped: SkipCounts,
}

impl ReportAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `line` and apply it. Malformed lines are counted and skipped.
    ///
    /// `line_number` is only used for diagnostics.
    pub fn consume_line(&mut self, line_number: u64, line: &str) {
        if line.is_empty() {
            self.blank_lines += 1;
            return;
        }

        match parse_line(line) {
            Ok(record) => self.apply(record),
            Err(err) => self.skip(line_number, &err),
        }
    }

    /// Record a line that could not be used.
    pub fn skip(&mut self, line_number: u64, err: &RecordError) {
        debug!("Skipping line {}: {}", line_number, err);
        self.skipped.record(err);
    }

    /// Route a parsed record to its user's aggregate.
    pub fn apply(&mut self, record: Record) {
        match record {
            Record::User(user) => {
                self.stats_for(user.id).attach_user(user);
            }
            Record::Session(session) => {
                self.stats_for(session.user_id).add_session(&session);
                self.total_sessions += 1;
                if !self.unique_browsers.contains(&session.browser) {
                    self.unique_browsers.insert(session.browser);
                }
            }
        }
        self.records_applied += 1;
    }

    /// Get the aggregate for `user_id`, creating an empty one on first use.
    pub fn stats_for(&mut self, user_id: u64) -> &mut UserStats {
        self.users.entry(user_id).or_default()
    }

    /// Aggregates keyed by user id, in first-reference order.
    pub fn users(&self) -> &IndexMap<u64, UserStats> {
        &self.users
    }

    pub fn total_sessions(&self) -> u64 {
        self.total_sessions
    }

    /// Every distinct normalised browser, ascending.
    pub fn unique_browsers(&self) -> &BTreeSet<String> {
        &self.unique_browsers
    }

    pub fn records_applied(&self) -> u64 {
        self.records_applied
    }

    pub fn blank_lines(&self) -> u64 {
        self.blank_lines
    }

    pub fn skipped(&self) -> SkipCounts {
        self.skipped
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn session(user_id: &str, browser: &str, time: &str, date: &str) -> SessionRecord {
        SessionRecord::try_new(user_id, "0", browser, time, date).unwrap()
    }

    fn user(id: &str, first: &str, last: &str) -> UserRecord {
        UserRecord::try_new(id, first, last, "30").unwrap()
    }

    fn accumulate(lines: &[&str]) -> ReportAccumulator {
        let mut acc = ReportAccumulator::new();
        for (i, line) in lines.iter().enumerate() {
            acc.consume_line(i as u64 + 1, line);
        }
        acc
    }

    // ── UserStats ─────────────────────────────────────────────────────────────

    #[test]
    fn test_new_stats_are_empty() {
        let stats = UserStats::default();
        assert_eq!(stats.sessions_count, 0);
        assert_eq!(stats.longest_session, 0);
        assert!(!stats.used_internet_explorer);
        assert_eq!(stats.always_used_chrome(), None);
    }

    #[test]
    fn test_add_session_sums_and_maxima() {
        let mut stats = UserStats::default();
        stats.add_session(&session("1", "Chrome 2", "30", "2021-05-03"));
        stats.add_session(&session("1", "Chrome 3", "45", "2021-05-04"));
        stats.add_session(&session("1", "Chrome 4", "10", "2021-05-04"));

        assert_eq!(stats.sessions_count, 3);
        assert_eq!(stats.total_time, 85);
        assert_eq!(stats.longest_session, 45);
        assert_eq!(stats.browsers, vec!["CHROME 2", "CHROME 3", "CHROME 4"]);
        assert_eq!(stats.dates.len(), 2);
        assert_eq!(stats.always_used_chrome(), Some(true));
    }

    #[test]
    fn test_internet_explorer_flag_is_sticky() {
        let mut stats = UserStats::default();
        stats.add_session(&session("1", "Internet Explorer 9", "1", "2021-05-03"));
        stats.add_session(&session("1", "Firefox 12", "1", "2021-05-03"));
        assert!(stats.used_internet_explorer);
    }

    #[test]
    fn test_chrome_flag_falls_permanently() {
        let mut stats = UserStats::default();
        stats.add_session(&session("1", "Safari 29", "1", "2021-05-03"));
        stats.add_session(&session("1", "Chrome 20", "1", "2021-05-03"));
        assert_eq!(stats.always_used_chrome(), Some(false));
    }

    #[test]
    fn test_attach_user_last_write_wins() {
        let mut stats = UserStats::default();
        stats.attach_user(user("1", "Alex", "Popov"));
        stats.attach_user(user("1", "Ivan", "Petrov"));
        assert_eq!(stats.user.as_ref().unwrap().full_name(), "Ivan Petrov");
    }

    // ── ReportAccumulator ─────────────────────────────────────────────────────

    #[test]
    fn test_sessions_before_user_share_one_aggregate() {
        let acc = accumulate(&[
            "session,5,0,Chrome 1,10,2017-01-01",
            "user,5,Gregory,Santos,86",
            "session,5,1,Chrome 2,20,2017-01-02",
        ]);

        assert_eq!(acc.users().len(), 1);
        let stats = &acc.users()[&5];
        assert_eq!(stats.sessions_count, 2);
        assert_eq!(stats.user.as_ref().unwrap().first_name, "Gregory");
    }

    #[test]
    fn test_global_counters() {
        let acc = accumulate(&[
            "user,0,Leida,Cira,0",
            "session,0,0,Safari 29,87,2016-10-23",
            "session,0,1,Firefox 12,118,2017-02-27",
            "session,1,0,safari 29,10,2017-02-27",
        ]);

        assert_eq!(acc.total_sessions(), 3);
        let browsers: Vec<&str> = acc.unique_browsers().iter().map(String::as_str).collect();
        assert_eq!(browsers, vec!["FIREFOX 12", "SAFARI 29"]);
        assert_eq!(acc.records_applied(), 4);
        assert_eq!(acc.users().len(), 2);
    }

    #[test]
    fn test_users_kept_in_first_reference_order() {
        let acc = accumulate(&[
            "session,9,0,Chrome 1,1,2017-01-01",
            "user,3,A,B,1",
            "user,9,C,D,1",
            "session,1,0,Chrome 1,1,2017-01-01",
        ]);
        let ids: Vec<u64> = acc.users().keys().copied().collect();
        assert_eq!(ids, vec![9, 3, 1]);
    }

    #[test]
    fn test_malformed_lines_are_counted_not_applied() {
        let acc = accumulate(&[
            "bogus,1,2,3",
            "user,1,Alex",
            "session,1,2,Chrome,abc,2021-05-03",
            "",
            "user,1,Alex,Popov,18",
        ]);

        let skipped = acc.skipped();
        assert_eq!(skipped.unknown_kind, 1);
        assert_eq!(skipped.missing_field, 1);
        assert_eq!(skipped.invalid_field, 1);
        assert_eq!(skipped.total(), 3);
        assert_eq!(acc.blank_lines(), 1);
        assert_eq!(acc.records_applied(), 1);
        assert_eq!(acc.total_sessions(), 0);
    }

    #[test]
    fn test_skip_counts_encoding_errors() {
        let mut acc = ReportAccumulator::new();
        acc.skip(4, &RecordError::InvalidEncoding { line_number: 4 });
        assert_eq!(acc.skipped().invalid_encoding, 1);
    }

    #[test]
    fn test_total_time_of_maximal_sessions() {
        let acc = accumulate(&[
            "user,1,A,B,1",
            "session,1,0,Chrome,18446744073709551615,2021-01-01",
            "session,1,1,Chrome,4294967295,2021-01-02",
            "session,1,2,Chrome,4294967295,2021-01-03",
            "session,1,3,Chrome,1,2021-01-04",
        ]);

        assert_eq!(acc.skipped().invalid_field, 1);
        let stats = &acc.users()[&1];
        assert_eq!(stats.sessions_count, 3);
        assert_eq!(stats.total_time, 2 * u64::from(u32::MAX) + 1);
        assert_eq!(stats.longest_session, u64::from(u32::MAX));
        assert_eq!(acc.total_sessions(), 3);
    }

    #[test]
    fn test_stats_for_creates_once() {
        let mut acc = ReportAccumulator::new();
        acc.stats_for(7).sessions_count = 3;
        assert_eq!(acc.stats_for(7).sessions_count, 3);
        assert_eq!(acc.users().len(), 1);
    }
}

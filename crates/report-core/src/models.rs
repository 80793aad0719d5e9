use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::error::RecordError;

/// Substring that marks a session as an Internet Explorer session.
pub const INTERNET_EXPLORER: &str = "INTERNET EXPLORER";

/// Substring that marks a session as a Chrome session.
pub const CHROME: &str = "CHROME";

// ── Coercion helpers ──────────────────────────────────────────────────────────

/// Coerce a field that must hold a non-negative integer.
///
/// Only a non-empty run of ASCII digits is accepted; signs, whitespace and
/// values that do not fit into `u64` are rejected.
pub fn coerce_unsigned(field: &'static str, raw: &str) -> Result<u64, RecordError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RecordError::invalid(field, raw));
    }
    raw.parse::<u64>()
        .map_err(|_| RecordError::invalid(field, raw))
}

/// Coerce a field that holds a signed integer (optional leading `-`).
pub fn coerce_signed(field: &'static str, raw: &str) -> Result<i64, RecordError> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RecordError::invalid(field, raw));
    }
    raw.parse::<i64>()
        .map_err(|_| RecordError::invalid(field, raw))
}

/// Coerce a session length in minutes; anything above `u32::MAX` is rejected.
pub fn coerce_minutes(field: &'static str, raw: &str) -> Result<u32, RecordError> {
    let value = coerce_unsigned(field, raw)?;
    u32::try_from(value).map_err(|_| RecordError::invalid(field, raw))
}

fn require_non_empty(field: &'static str, raw: &str) -> Result<String, RecordError> {
    if raw.is_empty() {
        return Err(RecordError::invalid(field, raw));
    }
    Ok(raw.to_string())
}

// ── SessionDate ───────────────────────────────────────────────────────────────

/// A `YYYY-MM-DD` date as written in the log.
///
/// Only the textual shape is validated, so `2021-02-31` is accepted. Ordering
/// is chronological for anything that matches the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})$").expect("regex is valid")
    })
}

impl SessionDate {
    pub fn parse(field: &'static str, raw: &str) -> Result<Self, RecordError> {
        let caps = date_pattern()
            .captures(raw)
            .ok_or_else(|| RecordError::invalid(field, raw))?;

        // Fixed-width ASCII digit groups always fit.
        let part = |i: usize| caps[i].parse::<u16>().map_err(|_| RecordError::invalid(field, raw));
        Ok(SessionDate {
            year: part(1)?,
            month: part(2)? as u8,
            day: part(3)? as u8,
        })
    }
}

impl fmt::Display for SessionDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl Serialize for SessionDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ── UserRecord ────────────────────────────────────────────────────────────────

/// One `user` line of the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub age: u64,
}

impl UserRecord {
    /// Build a user from raw field text, applying coercion and validation.
    pub fn try_new(
        id: &str,
        first_name: &str,
        last_name: &str,
        age: &str,
    ) -> Result<Self, RecordError> {
        Ok(UserRecord {
            id: coerce_unsigned("id", id)?,
            first_name: require_non_empty("first_name", first_name)?,
            last_name: require_non_empty("last_name", last_name)?,
            age: coerce_unsigned("age", age)?,
        })
    }

    /// `"<first> <last>"`, the key used for this user in the report.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ── SessionRecord ─────────────────────────────────────────────────────────────

/// One `session` line of the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub user_id: u64,
    pub session_id: i64,
    /// Browser name, upper-cased at construction.
    pub browser: String,
    /// Session length in minutes.
    pub time: u32,
    pub date: SessionDate,
}

impl SessionRecord {
    /// Build a session from raw field text, applying coercion and validation.
    pub fn try_new(
        user_id: &str,
        session_id: &str,
        browser: &str,
        time: &str,
        date: &str,
    ) -> Result<Self, RecordError> {
        Ok(SessionRecord {
            user_id: coerce_unsigned("user_id", user_id)?,
            session_id: coerce_signed("session_id", session_id)?,
            browser: browser.to_uppercase(),
            time: coerce_minutes("time", time)?,
            date: SessionDate::parse("date", date)?,
        })
    }

    pub fn is_internet_explorer(&self) -> bool {
        self.browser.contains(INTERNET_EXPLORER)
    }

    pub fn is_chrome(&self) -> bool {
        self.browser.contains(CHROME)
    }
}

// ── Record ────────────────────────────────────────────────────────────────────

/// A parsed line: either a user or one of their sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    User(UserRecord),
    Session(SessionRecord),
}

//! Line-level parsing of the activity log.
//!
//! Each line is `<kind>,<field>,<field>,...` with no quoting or escaping.

use report_core::error::RecordError;
use report_core::models::{Record, SessionRecord, UserRecord};

const FIELD_DELIMITER: char = ',';

/// Parse one line (without its terminator) into a [`Record`].
pub fn parse_line(line: &str) -> Result<Record, RecordError> {
    let mut fields = line.split(FIELD_DELIMITER);
    // `split` always yields at least one item.
    let kind = fields.next().unwrap_or_default();

    match kind {
        "user" => {
            let id = next_field(&mut fields, "id")?;
            let first_name = next_field(&mut fields, "first_name")?;
            let last_name = next_field(&mut fields, "last_name")?;
            let age = next_field(&mut fields, "age")?;
            UserRecord::try_new(id, first_name, last_name, age).map(Record::User)
        }
        "session" => {
            let user_id = next_field(&mut fields, "user_id")?;
            let session_id = next_field(&mut fields, "session_id")?;
            let browser = next_field(&mut fields, "browser")?;
            let time = next_field(&mut fields, "time")?;
            let date = next_field(&mut fields, "date")?;
            SessionRecord::try_new(user_id, session_id, browser, time, date).map(Record::Session)
        }
        other => Err(RecordError::UnknownRecordKind(other.to_string())),
    }
}

fn next_field<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    name: &'static str,
) -> Result<&'a str, RecordError> {
    fields.next().ok_or(RecordError::MissingField { field: name })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

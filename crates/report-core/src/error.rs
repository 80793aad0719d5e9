use std::path::PathBuf;
use thiserror::Error;

/// Why a single input line could not be turned into a record.
///
/// These never abort a run: the accumulator counts them and moves on to the
/// next line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The first token was neither `user` nor `session`.
    #[error("Unknown record kind: {0:?}")]
    UnknownRecordKind(String),

    /// A field was present but failed coercion or validation.
    #[error("Invalid value {value:?} for field {field}")]
    InvalidFieldValue { field: &'static str, value: String },

    /// The line ended before the named field.
    #[error("Missing field {field}")]
    MissingField { field: &'static str },

    /// The decompressed bytes of a line were not valid UTF-8.
    #[error("Line {line_number} is not valid UTF-8")]
    InvalidEncoding { line_number: u64 },
}

impl RecordError {
    pub fn invalid(field: &'static str, value: &str) -> Self {
        RecordError::InvalidFieldValue {
            field,
            value: value.to_string(),
        }
    }
}

/// Fatal errors produced while generating a report.
#[derive(Error, Debug)]
pub enum ReportError {
    /// The input archive does not exist (or is not a regular file).
    #[error("Archive not found: {0}")]
    ArchiveNotFound(PathBuf),

    /// The archive could not be opened, decompressed or read.
    #[error("Failed to read archive {path}: {source}")]
    ArchiveRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A user aggregate has sessions but no user line to name it.
    #[error("No user record for user id {user_id}")]
    MissingUserForStats { user_id: u64 },

    /// The report file could not be written.
    #[error("Failed to write report {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The report document could not be serialised.
    #[error("Failed to serialize report: {0}")]
    JsonSerialize(#[from] serde_json::Error),
}

/// Convenience alias used throughout the report crates.
pub type Result<T> = std::result::Result<T, ReportError>;

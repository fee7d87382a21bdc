//! Persistence errors and warnings.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Stable machine code attached to every [`FieldError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidEnvelope,
    InvalidVersion,
    VersionTooOld,
    InvalidType,
    MissingField,
    InvalidString,
    InvalidNumber,
    OutOfRange,
    InvalidUrl,
    InvalidArray,
    InvalidEnum,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidEnvelope => "INVALID_ENVELOPE",
            ErrorCode::InvalidVersion => "INVALID_VERSION",
            ErrorCode::VersionTooOld => "VERSION_TOO_OLD",
            ErrorCode::InvalidType => "INVALID_TYPE",
            ErrorCode::MissingField => "MISSING_FIELD",
            ErrorCode::InvalidString => "INVALID_STRING",
            ErrorCode::InvalidNumber => "INVALID_NUMBER",
            ErrorCode::OutOfRange => "OUT_OF_RANGE",
            ErrorCode::InvalidUrl => "INVALID_URL",
            ErrorCode::InvalidArray => "INVALID_ARRAY",
            ErrorCode::InvalidEnum => "INVALID_ENUM",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single defect in a persisted record.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{path}: {message} ({code})")]
pub struct FieldError {
    /// Path of the offending field, e.g. `tileMatrices[2].tileWidth`
    pub path: String,
    pub message: String,
    pub code: ErrorCode,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            code,
        }
    }

    pub fn missing(path: &str) -> Self {
        Self::new(path, "required field is missing", ErrorCode::MissingField)
    }
}

/// A record could not be restored.
///
/// Most paths stop at the first defect, so `errors` is not guaranteed to be
/// exhaustive.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub struct PersistenceError {
    pub errors: Vec<FieldError>,
}

impl PersistenceError {
    /// Code of the first error.
    pub fn code(&self) -> Option<ErrorCode> {
        self.errors.first().map(|e| e.code)
    }

    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "Invalid persisted layer: {}", messages.join("; "))
    }
}

impl From<FieldError> for PersistenceError {
    fn from(error: FieldError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

/// Non-fatal finding returned alongside a restored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PersistenceWarning {
    /// The record was written by a newer schema; unknown fields are ignored.
    NewerVersion { found: u64, current: u64 },
    /// No migration step was registered for `from_version`; the version was
    /// bumped without converting any field.
    SkippedMigration { from_version: u64 },
}

impl fmt::Display for PersistenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceWarning::NewerVersion { found, current } => write!(
                f,
                "record version {} is newer than supported version {}",
                found, current
            ),
            PersistenceWarning::SkippedMigration { from_version } => write!(
                f,
                "no migration registered from version {}, skipped",
                from_version
            ),
        }
    }
}

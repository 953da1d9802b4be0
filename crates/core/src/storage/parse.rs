//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use chrono::NaiveDate;
use rusqlite::types::{Type, Value, ValueRef};
use rusqlite::{Error as SqlError, ErrorCode};
use uuid::Uuid;

use crate::reveal::IssuedAt;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a UUID from a database string column
pub fn parse_uuid(s: &str) -> Result<Uuid, SqlError> {
    Uuid::parse_str(s).map_err(|e| SqlError::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

/// Parse an optional calendar date stored as `YYYY-MM-DD`
pub fn parse_date_opt(s: Option<String>) -> Result<Option<NaiveDate>, SqlError> {
    s.filter(|s| !s.trim().is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                .map_err(|e| SqlError::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
        })
        .transpose()
}

/// Format an optional calendar date for storage
pub fn format_date_opt(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

/// Read an `issued_at` column.
///
/// Rows written by this crate hold epoch milliseconds; older rows may hold a
/// date string. Anything unreadable becomes `IssuedAt::Malformed` instead of an
/// error so the grant itself still loads.
pub fn issued_at_from_sql(value: ValueRef<'_>) -> Option<IssuedAt> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(millis) => Some(IssuedAt::from_epoch_millis(millis)),
        ValueRef::Real(millis) if millis.is_finite() => {
            Some(IssuedAt::from_epoch_millis(millis.trunc() as i64))
        }
        ValueRef::Real(millis) => Some(IssuedAt::Malformed(millis.to_string())),
        ValueRef::Text(bytes) => IssuedAt::parse(&String::from_utf8_lossy(bytes)),
        ValueRef::Blob(_) => Some(IssuedAt::Malformed("<blob>".to_string())),
    }
}

/// Encode an `issued_at` column: epoch milliseconds, or the raw text when the
/// anchor is malformed
pub fn issued_at_to_sql(issued_at: Option<&IssuedAt>) -> Value {
    match issued_at {
        None => Value::Null,
        Some(anchor) => match anchor.epoch_millis() {
            Some(millis) => Value::Integer(millis),
            None => Value::Text(String::from(anchor.clone())),
        },
    }
}

/// Whether an error came from a UNIQUE or similar constraint
pub fn is_constraint_violation(err: &SqlError) -> bool {
    matches!(err, SqlError::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

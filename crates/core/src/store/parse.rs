//! Column decoding helpers
//!
//! Documents are stored as text; these turn the text columns back into
//! typed values without panicking on corrupt rows.

use chrono::{DateTime, Utc};
use rusqlite::Error as SqlError;
use serde_json::Value;

fn bad_text_column(e: impl std::error::Error + Send + Sync + 'static) -> SqlError {
    SqlError::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
}

/// Decode an RFC 3339 timestamp column
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, SqlError> {
    let dt = DateTime::parse_from_rfc3339(s).map_err(bad_text_column)?;
    Ok(dt.with_timezone(&Utc))
}

/// Decode a JSON payload column
pub fn parse_json(s: &str) -> Result<Value, SqlError> {
    serde_json::from_str(s).map_err(bad_text_column)
}

use rusqlite::types::Value;

use crate::error::DbiError;
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
///
/// Blobs have no counterpart in `RowValues` and come back as (lossy UTF-8) text.
///
/// # Errors
/// Returns `DbiError` if the column cannot be read.
pub fn sqlite_extract_value(row: &rusqlite::Row, idx: usize) -> Result<RowValues, DbiError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Text(String::from_utf8_lossy(&b).into_owned()),
    })
}

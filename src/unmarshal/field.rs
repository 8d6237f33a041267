use chrono::{DateTime, NaiveDate, Utc};

use crate::types::RowValues;

/// Conversion from a result column value into a record field.
///
/// The error is a human-readable reason; the caller attaches column and field names.
pub trait FromRowValue: Sized {
    /// # Errors
    /// Returns the reason the value does not fit the field type.
    fn from_row_value(value: RowValues) -> Result<Self, String>;

    /// Text storage of the field, used by the `date`/`agg` truncation. `None` for
    /// non-text fields.
    fn text_mut(&mut self) -> Option<&mut String> {
        None
    }
}

fn unsupported(value: &RowValues, target: &str) -> String {
    match value {
        RowValues::Null => format!("converting NULL to {target} is unsupported"),
        other => format!("unsupported conversion from {other:?} to {target}"),
    }
}

impl FromRowValue for RowValues {
    fn from_row_value(value: RowValues) -> Result<Self, String> {
        Ok(value)
    }
}

impl FromRowValue for String {
    fn from_row_value(value: RowValues) -> Result<Self, String> {
        match value {
            RowValues::Null => Err(unsupported(&RowValues::Null, "string")),
            RowValues::Text(s) => Ok(s),
            other => Ok(other.to_db_string()),
        }
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        Some(self)
    }
}

impl FromRowValue for i64 {
    fn from_row_value(value: RowValues) -> Result<Self, String> {
        match &value {
            RowValues::Int(i) => Ok(*i),
            RowValues::Text(s) => s
                .trim()
                .parse()
                .map_err(|e| format!("parsing {s:?} as i64: {e}")),
            _ => Err(unsupported(&value, "i64")),
        }
    }
}

impl FromRowValue for i32 {
    fn from_row_value(value: RowValues) -> Result<Self, String> {
        let wide = i64::from_row_value(value)?;
        i32::try_from(wide).map_err(|e| format!("{wide} does not fit in i32: {e}"))
    }
}

impl FromRowValue for f64 {
    fn from_row_value(value: RowValues) -> Result<Self, String> {
        match &value {
            RowValues::Text(s) => s
                .trim()
                .parse()
                .map_err(|e| format!("parsing {s:?} as f64: {e}")),
            other => other.as_float().ok_or_else(|| unsupported(other, "f64")),
        }
    }
}

impl FromRowValue for bool {
    fn from_row_value(value: RowValues) -> Result<Self, String> {
        if let Some(b) = value.as_bool() {
            return Ok(b);
        }
        match value.as_text() {
            Some("1" | "t" | "T" | "TRUE" | "true" | "True") => Ok(true),
            Some("0" | "f" | "F" | "FALSE" | "false" | "False") => Ok(false),
            _ => Err(unsupported(&value, "bool")),
        }
    }
}

impl FromRowValue for DateTime<Utc> {
    fn from_row_value(value: RowValues) -> Result<Self, String> {
        value
            .as_timestamp()
            .ok_or_else(|| unsupported(&value, "timestamp"))
    }
}

impl FromRowValue for NaiveDate {
    fn from_row_value(value: RowValues) -> Result<Self, String> {
        value
            .as_timestamp()
            .map(|dt| dt.date_naive())
            .ok_or_else(|| unsupported(&value, "date"))
    }
}

impl<T: FromRowValue> FromRowValue for Option<T> {
    fn from_row_value(value: RowValues) -> Result<Self, String> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_row_value(value).map(Some)
        }
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        self.as_mut().and_then(T::text_mut)
    }
}

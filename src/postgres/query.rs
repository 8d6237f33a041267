use std::error::Error;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use tokio_postgres::types::{FromSql, Type};
use uuid::Uuid;

use crate::error::DbiError;
use crate::types::RowValues;

/// Wire bytes of a column, whatever its type.
struct RawBytes(Vec<u8>);

impl<'a> FromSql<'a> for RawBytes {
    fn from_sql(_: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(RawBytes(raw.to_vec()))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

fn lossy_text(bytes: &[u8]) -> RowValues {
    RowValues::Text(String::from_utf8_lossy(bytes).into_owned())
}

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// `timestamp` columns are taken as UTC and `date` columns as midnight UTC, so both come
/// back as [`RowValues::Timestamp`]. Types without a scalar counterpart (`numeric`,
/// `money`, `uuid`, `json`, `jsonb`, `interval`, `bytea`, enums, ...) come back as text.
///
/// # Errors
/// Returns `DbiError` if the column cannot be read.
pub fn postgres_extract_value(
    row: &tokio_postgres::Row,
    idx: usize,
) -> Result<RowValues, DbiError> {
    let type_info = row.columns()[idx].type_();

    let value = match type_info.name() {
        "int2" => {
            let val: Option<i16> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v)))
        }
        "int4" => {
            let val: Option<i32> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v)))
        }
        "int8" => {
            let val: Option<i64> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Int)
        }
        "oid" => {
            let val: Option<u32> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v)))
        }
        "float4" => {
            let val: Option<f32> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Float(f64::from(v)))
        }
        "float8" => {
            let val: Option<f64> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Float)
        }
        "bool" => {
            let val: Option<bool> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Bool)
        }
        "timestamp" => {
            let val: Option<NaiveDateTime> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Timestamp(v.and_utc()))
        }
        "timestamptz" => {
            let val: Option<DateTime<Utc>> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Timestamp)
        }
        "date" => {
            let val: Option<NaiveDate> = row.try_get(idx)?;
            val.and_then(|d| d.and_hms_opt(0, 0, 0))
                .map_or(RowValues::Null, |v| RowValues::Timestamp(v.and_utc()))
        }
        "numeric" => {
            let val: Option<Decimal> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Text(v.to_string()))
        }
        "uuid" => {
            let val: Option<Uuid> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Text(v.to_string()))
        }
        "json" | "jsonb" => {
            let val: Option<serde_json::Value> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Text(v.to_string()))
        }
        "bytea" => {
            let val: Option<Vec<u8>> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| lossy_text(&v))
        }
        "money" => {
            let val: Option<RawBytes> = row.try_get(idx)?;
            match val {
                None => RowValues::Null,
                Some(RawBytes(raw)) => RowValues::Text(format_money(decode_money(&raw)?)),
            }
        }
        "interval" => {
            let val: Option<RawBytes> = row.try_get(idx)?;
            match val {
                None => RowValues::Null,
                Some(RawBytes(raw)) => {
                    let (micros, days, months) = decode_interval(&raw)?;
                    RowValues::Text(format_interval(months, days, micros))
                }
            }
        }
        // The single-byte "char" type
        "char" => {
            let val: Option<i8> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| {
                RowValues::Text(char::from(v.to_ne_bytes()[0]).to_string())
            })
        }
        _ if <String as FromSql>::accepts(type_info) => {
            let val: Option<String> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Text)
        }
        // Enums and other text-encoded types
        _ => {
            let val: Option<RawBytes> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |RawBytes(raw)| lossy_text(&raw))
        }
    };
    Ok(value)
}

fn wire_error(ty: &str, len: usize) -> DbiError {
    DbiError::ExecutionError(format!("invalid {ty} value of {len} bytes"))
}

fn decode_money(raw: &[u8]) -> Result<i64, DbiError> {
    let bytes: [u8; 8] = raw.try_into().map_err(|_| wire_error("money", raw.len()))?;
    Ok(i64::from_be_bytes(bytes))
}

// Wire layout: microseconds (i64), days (i32), months (i32).
fn decode_interval(raw: &[u8]) -> Result<(i64, i32, i32), DbiError> {
    if raw.len() != 16 {
        return Err(wire_error("interval", raw.len()));
    }
    let micros = i64::from_be_bytes([
        raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7],
    ]);
    let days = i32::from_be_bytes([raw[8], raw[9], raw[10], raw[11]]);
    let months = i32::from_be_bytes([raw[12], raw[13], raw[14], raw[15]]);
    Ok((micros, days, months))
}

/// Cents rendered with two decimals and no currency symbol.
fn format_money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Render an interval the way the server's default `postgres` style prints it.
fn format_interval(months: i32, days: i32, micros: i64) -> String {
    fn unit(parts: &mut Vec<String>, n: i32, singular: &str, plural: &str) {
        if n != 0 {
            let name = if n.unsigned_abs() == 1 { singular } else { plural };
            parts.push(format!("{n} {name}"));
        }
    }

    let mut parts = Vec::new();
    unit(&mut parts, months / 12, "year", "years");
    unit(&mut parts, months % 12, "mon", "mons");
    unit(&mut parts, days, "day", "days");

    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        let abs = micros.unsigned_abs();
        let secs = abs / 1_000_000;
        let frac = abs % 1_000_000;
        let mut time = format!(
            "{sign}{:02}:{:02}:{:02}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        );
        if frac != 0 {
            let digits = format!("{frac:06}");
            time.push('.');
            time.push_str(digits.trim_end_matches('0'));
        }
        parts.push(time);
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_keeps_two_decimals() {
        assert_eq!(format_money(123_456), "1234.56");
        assert_eq!(format_money(-5), "-0.05");
        assert_eq!(decode_money(&1999_i64.to_be_bytes()).unwrap(), 1999);
        assert!(decode_money(&[0, 1]).is_err());
    }

    #[test]
    fn intervals_render_like_the_server() {
        assert_eq!(format_interval(0, 0, 0), "00:00:00");
        assert_eq!(
            format_interval(14, 3, 4 * 3_600_000_000 + 5 * 60_000_000 + 6_500_000),
            "1 year 2 mons 3 days 04:05:06.5"
        );
        assert_eq!(format_interval(0, 1, 0), "1 day");
        assert_eq!(format_interval(0, 0, -90_000_000), "-00:01:30");
    }

    #[test]
    fn decodes_interval_wire_layout() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&1_000_000_i64.to_be_bytes());
        raw.extend_from_slice(&2_i32.to_be_bytes());
        raw.extend_from_slice(&3_i32.to_be_bytes());
        assert_eq!(decode_interval(&raw).unwrap(), (1_000_000, 2, 3));
        assert!(decode_interval(&raw[..8]).is_err());
    }

    #[test]
    fn raw_bytes_accept_any_type() {
        assert!(<RawBytes as FromSql>::accepts(&Type::INET));
        let raw = RawBytes::from_sql(&Type::INET, b"happy").unwrap();
        assert_eq!(lossy_text(&raw.0), RowValues::Text("happy".into()));
    }
}

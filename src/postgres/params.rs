use std::error::Error;
use std::str::FromStr;

use rust_decimal::Decimal;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;
use uuid::Uuid;

use crate::types::{RowValues, parse_timestamp};

/// Container for Postgres parameters with lifetime tracking
pub struct Params<'a> {
    references: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> Params<'a> {
    /// Convert from a slice of `RowValues` to Postgres parameters
    #[must_use]
    pub fn convert(params: &'a [RowValues]) -> Params<'a> {
        let references = params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        Params { references }
    }

    /// Get a reference to the underlying parameter array
    #[must_use]
    pub fn as_refs(&self) -> &[&'a (dyn ToSql + Sync)] {
        &self.references
    }
}

impl ToSql for RowValues {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::Text(s) => text_to_sql(s, ty, out),
            // Narrow to the width the server inferred for the placeholder
            RowValues::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::FLOAT4 | Type::FLOAT8 => {
                    #[allow(clippy::cast_precision_loss)]
                    let f = *i as f64;
                    RowValues::Float(f).to_sql(ty, out)
                }
                Type::NUMERIC => Decimal::from(*i).to_sql(ty, out),
                _ => i.to_sql(ty, out),
            },
            RowValues::Float(f) => match *ty {
                #[allow(clippy::cast_possible_truncation)]
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*f)?.to_sql(ty, out),
                _ => f.to_sql(ty, out),
            },
            RowValues::Bool(b) => b.to_sql(ty, out),
            RowValues::Timestamp(dt) => match *ty {
                Type::TIMESTAMP => dt.naive_utc().to_sql(ty, out),
                Type::DATE => dt.date_naive().to_sql(ty, out),
                _ => dt.to_sql(ty, out),
            },
        }
    }

    fn accepts(ty: &Type) -> bool {
        // Only accept types we can properly handle
        matches!(
            *ty,
            Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::TEXT
                | Type::VARCHAR
                | Type::BPCHAR
                | Type::NAME
                | Type::UNKNOWN
                | Type::BOOL
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::DATE
                | Type::NUMERIC
                | Type::UUID
                | Type::JSON
                | Type::JSONB
        )
    }

    to_sql_checked!();
}

/// Text arguments are parsed into the type the server expects for the placeholder, so
/// `"42"` binds to an `int4` column as the number 42.
fn text_to_sql(
    s: &str,
    ty: &Type,
    out: &mut bytes::BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    match *ty {
        Type::INT2 => s.trim().parse::<i16>()?.to_sql(ty, out),
        Type::INT4 => s.trim().parse::<i32>()?.to_sql(ty, out),
        Type::INT8 => s.trim().parse::<i64>()?.to_sql(ty, out),
        Type::FLOAT4 => s.trim().parse::<f32>()?.to_sql(ty, out),
        Type::FLOAT8 => s.trim().parse::<f64>()?.to_sql(ty, out),
        Type::BOOL => parse_bool(s)?.to_sql(ty, out),
        Type::NUMERIC => Decimal::from_str(s.trim())?.to_sql(ty, out),
        Type::UUID => Uuid::parse_str(s.trim())?.to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
        Type::TIMESTAMP | Type::TIMESTAMPTZ | Type::DATE => {
            let dt = parse_timestamp(s.trim())
                .ok_or_else(|| format!("cannot read {s:?} as a timestamp"))?;
            RowValues::Timestamp(dt).to_sql(ty, out)
        }
        _ => s.to_sql(ty, out),
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => Err(format!("cannot read {other:?} as a bool")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrows_integers_to_column_width() {
        let mut buf = bytes::BytesMut::new();
        RowValues::Int(7).to_sql(&Type::INT4, &mut buf).unwrap();
        assert_eq!(buf.len(), 4);

        let mut buf = bytes::BytesMut::new();
        RowValues::Int(7).to_sql(&Type::INT8, &mut buf).unwrap();
        assert_eq!(buf.len(), 8);

        let mut buf = bytes::BytesMut::new();
        assert!(RowValues::Int(i64::MAX).to_sql(&Type::INT2, &mut buf).is_err());
    }

    #[test]
    fn null_writes_nothing() {
        let mut buf = bytes::BytesMut::new();
        let res = RowValues::Null.to_sql(&Type::TEXT, &mut buf).unwrap();
        assert!(matches!(res, IsNull::Yes));
        assert!(buf.is_empty());
    }

    #[test]
    fn rejects_unhandled_types() {
        assert!(<RowValues as ToSql>::accepts(&Type::INT8));
        assert!(<RowValues as ToSql>::accepts(&Type::NUMERIC));
        assert!(<RowValues as ToSql>::accepts(&Type::UUID));
        assert!(<RowValues as ToSql>::accepts(&Type::JSONB));
        assert!(!<RowValues as ToSql>::accepts(&Type::BYTEA));
    }

    #[test]
    fn text_is_parsed_into_the_placeholder_type() {
        let mut buf = bytes::BytesMut::new();
        RowValues::Text("42".into()).to_sql(&Type::INT4, &mut buf).unwrap();
        assert_eq!(&buf[..], 42_i32.to_be_bytes());

        let mut buf = bytes::BytesMut::new();
        RowValues::Text(" 7 ".into()).to_sql(&Type::INT8, &mut buf).unwrap();
        assert_eq!(buf.len(), 8);

        let mut buf = bytes::BytesMut::new();
        assert!(RowValues::Text("forty".into()).to_sql(&Type::INT4, &mut buf).is_err());

        let mut buf = bytes::BytesMut::new();
        RowValues::Text("t".into()).to_sql(&Type::BOOL, &mut buf).unwrap();
        assert_eq!(&buf[..], [1_u8]);

        let mut buf = bytes::BytesMut::new();
        RowValues::Text("67e55044-10b1-426f-9247-bb680e5fe0c8".into())
            .to_sql(&Type::UUID, &mut buf)
            .unwrap();
        assert_eq!(buf.len(), 16);

        let mut buf = bytes::BytesMut::new();
        RowValues::Text("plain".into()).to_sql(&Type::VARCHAR, &mut buf).unwrap();
        assert_eq!(&buf[..], b"plain");
    }

    #[test]
    fn numbers_bind_to_numeric() {
        let mut buf = bytes::BytesMut::new();
        RowValues::Int(12).to_sql(&Type::NUMERIC, &mut buf).unwrap();
        assert!(!buf.is_empty());

        let mut buf = bytes::BytesMut::new();
        RowValues::Float(1.25).to_sql(&Type::NUMERIC, &mut buf).unwrap();
        assert!(!buf.is_empty());

        let mut buf = bytes::BytesMut::new();
        RowValues::Text("12.50".into()).to_sql(&Type::NUMERIC, &mut buf).unwrap();
        assert!(!buf.is_empty());

        let mut buf = bytes::BytesMut::new();
        assert!(RowValues::Float(f64::NAN).to_sql(&Type::NUMERIC, &mut buf).is_err());
    }

    #[test]
    fn json_text_is_validated() {
        let mut buf = bytes::BytesMut::new();
        RowValues::Text(r#"{"a":1}"#.into()).to_sql(&Type::JSONB, &mut buf).unwrap();
        assert_eq!(buf[0], 1);

        let mut buf = bytes::BytesMut::new();
        assert!(RowValues::Text("{nope".into()).to_sql(&Type::JSON, &mut buf).is_err());
    }
}

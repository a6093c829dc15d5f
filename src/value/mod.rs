//! Value Codec (§4.2): OID-dispatched decode/encode between wire bytes and
//! [`Value`], in both text and binary format.

pub mod array;
pub mod bytea;
pub mod datetime;
pub mod json;
pub mod numeric;
pub mod primitives;
pub mod text;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

pub use numeric::Numeric;

use crate::error::{Error, Result, SqlState};
use crate::protocol::types::{Oid, oid};

/// A decoded PostgreSQL value, carrying enough type information to encode
/// itself back onto the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    Numeric(Numeric),
    Text(String),
    Bytea(Vec<u8>),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(String),
    Array { elem_oid: Oid, elements: Vec<Option<Value>> },
}

fn unsupported(type_oid: Oid) -> Error {
    Error::wire(SqlState::InvalidTextRepresentation, format!("unsupported type OID {type_oid}"))
}

/// Maps an `_ARRAY` OID to the OID of its element type. Only the
/// one-dimensional array types the codec supports are known here.
fn element_oid(array_oid: Oid) -> Option<Oid> {
    Some(match array_oid {
        oid::BOOL_ARRAY => oid::BOOL,
        oid::BYTEA_ARRAY => oid::BYTEA,
        oid::INT2_ARRAY => oid::INT2,
        oid::INT4_ARRAY => oid::INT4,
        oid::TEXT_ARRAY => oid::TEXT,
        oid::BPCHAR_ARRAY => oid::BPCHAR,
        oid::VARCHAR_ARRAY => oid::VARCHAR,
        oid::INT8_ARRAY => oid::INT8,
        oid::FLOAT4_ARRAY => oid::FLOAT4,
        oid::FLOAT8_ARRAY => oid::FLOAT8,
        oid::TIMESTAMP_ARRAY => oid::TIMESTAMP,
        oid::DATE_ARRAY => oid::DATE,
        oid::TIMESTAMPTZ_ARRAY => oid::TIMESTAMPTZ,
        oid::NUMERIC_ARRAY => oid::NUMERIC,
        oid::JSONB_ARRAY => oid::JSONB,
        _ => return None,
    })
}

pub fn decode_text(bytes: &[u8], type_oid: Oid) -> Result<Value> {
    match type_oid {
        oid::BOOL => primitives::decode_bool_text(bytes).map(Value::Bool),
        oid::INT2 => primitives::decode_int2_text(bytes).map(Value::Int2),
        oid::INT4 => primitives::decode_int4_text(bytes).map(Value::Int4),
        oid::INT8 => primitives::decode_int8_text(bytes).map(Value::Int8),
        oid::FLOAT4 => primitives::decode_float4_text(bytes).map(Value::Float4),
        oid::FLOAT8 => primitives::decode_float8_text(bytes).map(Value::Float8),
        oid::NUMERIC => numeric::decode_text(bytes).map(Value::Numeric),
        oid::TEXT | oid::VARCHAR | oid::BPCHAR | oid::NAME => text::decode(bytes).map(Value::Text),
        oid::BYTEA => bytea::decode_text(bytes).map(Value::Bytea),
        oid::DATE => datetime::decode_date_text(bytes).map(Value::Date),
        oid::TIMESTAMP => datetime::decode_timestamp_text(bytes).map(Value::Timestamp),
        oid::TIMESTAMPTZ => datetime::decode_timestamptz_text(bytes).map(Value::TimestampTz),
        oid::JSON | oid::JSONB => json::decode_text(bytes).map(Value::Json),
        other => match element_oid(other) {
            Some(elem) => {
                let elements = array::decode_text(bytes, |b| decode_text(b, elem))?;
                Ok(Value::Array { elem_oid: elem, elements })
            }
            None => Err(unsupported(other)),
        },
    }
}

pub fn decode_binary(bytes: &[u8], type_oid: Oid) -> Result<Value> {
    match type_oid {
        oid::BOOL => primitives::decode_bool_binary(bytes).map(Value::Bool),
        oid::INT2 => primitives::decode_int2_binary(bytes).map(Value::Int2),
        oid::INT4 => primitives::decode_int4_binary(bytes).map(Value::Int4),
        oid::INT8 => primitives::decode_int8_binary(bytes).map(Value::Int8),
        oid::FLOAT4 => primitives::decode_float4_binary(bytes).map(Value::Float4),
        oid::FLOAT8 => primitives::decode_float8_binary(bytes).map(Value::Float8),
        oid::NUMERIC => numeric::decode_binary(bytes).map(Value::Numeric),
        oid::TEXT | oid::VARCHAR | oid::BPCHAR | oid::NAME => text::decode(bytes).map(Value::Text),
        oid::BYTEA => bytea::decode_binary(bytes).map(Value::Bytea),
        oid::DATE => datetime::decode_date_binary(bytes).map(Value::Date),
        oid::TIMESTAMP => datetime::decode_timestamp_binary(bytes).map(Value::Timestamp),
        oid::TIMESTAMPTZ => datetime::decode_timestamptz_binary(bytes).map(Value::TimestampTz),
        oid::JSON | oid::JSONB => json::decode_binary(bytes).map(Value::Json),
        other => match element_oid(other) {
            Some(elem) => {
                let elements = array::decode_binary(bytes, |b| decode_binary(b, elem))?;
                Ok(Value::Array { elem_oid: elem, elements })
            }
            None => Err(unsupported(other)),
        },
    }
}

pub fn encode_text(value: &Value) -> Vec<u8> {
    match value {
        Value::Bool(v) => primitives::encode_bool_text(*v),
        Value::Int2(v) => primitives::encode_int2_text(*v),
        Value::Int4(v) => primitives::encode_int4_text(*v),
        Value::Int8(v) => primitives::encode_int8_text(*v),
        Value::Float4(v) => primitives::encode_float4_text(*v),
        Value::Float8(v) => primitives::encode_float8_text(*v),
        Value::Numeric(v) => numeric::encode_text(v),
        Value::Text(v) => text::encode(v),
        Value::Bytea(v) => bytea::encode_text(v),
        Value::Date(v) => datetime::encode_date_text(*v),
        Value::Timestamp(v) => datetime::encode_timestamp_text(*v),
        Value::TimestampTz(v) => datetime::encode_timestamptz_text(*v),
        Value::Json(v) => json::encode_text(v),
        Value::Array { elements, .. } => array::encode_text(elements, encode_text),
    }
}

pub fn encode_binary(value: &Value) -> Result<Vec<u8>> {
    Ok(match value {
        Value::Bool(v) => primitives::encode_bool_binary(*v),
        Value::Int2(v) => primitives::encode_int2_binary(*v),
        Value::Int4(v) => primitives::encode_int4_binary(*v),
        Value::Int8(v) => primitives::encode_int8_binary(*v),
        Value::Float4(v) => primitives::encode_float4_binary(*v),
        Value::Float8(v) => primitives::encode_float8_binary(*v),
        Value::Numeric(v) => numeric::encode_binary(v),
        Value::Text(v) => text::encode(v),
        Value::Bytea(v) => bytea::encode_binary(v),
        Value::Date(v) => datetime::encode_date_binary(*v)?,
        Value::Timestamp(v) => datetime::encode_timestamp_binary(*v)?,
        Value::TimestampTz(v) => datetime::encode_timestamptz_binary(*v)?,
        Value::Json(v) => json::encode_binary(v),
        Value::Array { elem_oid, elements } => array::encode_binary(elements, *elem_oid, encode_binary)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_scalar_text() {
        let v = decode_text(b"42", oid::INT4).unwrap();
        assert_eq!(v, Value::Int4(42));
        assert_eq!(encode_text(&v), b"42");
    }

    #[test]
    fn dispatches_scalar_binary() {
        let v = decode_binary(&8i64.to_be_bytes(), oid::INT8).unwrap();
        assert_eq!(v, Value::Int8(8));
        assert_eq!(encode_binary(&v).unwrap(), 8i64.to_be_bytes().to_vec());
    }

    #[test]
    fn dispatches_array() {
        let v = decode_text(b"{1,2,NULL}", oid::INT4_ARRAY).unwrap();
        match &v {
            Value::Array { elem_oid, elements } => {
                assert_eq!(*elem_oid, oid::INT4);
                assert_eq!(elements.len(), 3);
            }
            other => panic!("expected array, got {other:?}"),
        }
        assert_eq!(encode_text(&v), b"{1,2,NULL}");
    }

    #[test]
    fn unsupported_oid_rejected() {
        assert!(decode_text(b"x", oid::POINT).is_err());
    }
}

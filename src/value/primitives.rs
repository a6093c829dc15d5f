//! bool, int2, int4, int8, float4, float8 codecs.

use crate::error::{Error, Result, SqlState};

fn decode_err(msg: impl Into<String>) -> Error {
    Error::wire(SqlState::InvalidTextRepresentation, msg)
}

fn out_of_range(msg: impl Into<String>) -> Error {
    Error::wire(SqlState::NumericValueOutOfRange, msg)
}

fn as_str(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| decode_err(format!("invalid UTF-8: {e}")))
}

pub fn decode_bool_text(bytes: &[u8]) -> Result<bool> {
    match as_str(bytes)? {
        "t" | "true" | "TRUE" | "T" | "1" | "yes" | "on" => Ok(true),
        "f" | "false" | "FALSE" | "F" | "0" | "no" | "off" => Ok(false),
        other => Err(decode_err(format!("invalid boolean literal {other:?}"))),
    }
}

pub fn encode_bool_text(value: bool) -> Vec<u8> {
    if value { b"t".to_vec() } else { b"f".to_vec() }
}

pub fn decode_bool_binary(bytes: &[u8]) -> Result<bool> {
    match bytes {
        [0] => Ok(false),
        [_] => Ok(true),
        _ => Err(decode_err("bool: expected exactly 1 byte")),
    }
}

pub fn encode_bool_binary(value: bool) -> Vec<u8> {
    vec![value as u8]
}

macro_rules! int_codec {
    ($text_decode:ident, $text_encode:ident, $bin_decode:ident, $bin_encode:ident, $ty:ty) => {
        pub fn $text_decode(bytes: &[u8]) -> Result<$ty> {
            let s = as_str(bytes)?.trim();
            s.parse::<$ty>()
                .map_err(|_| out_of_range(format!("invalid or out-of-range integer {s:?}")))
        }

        pub fn $text_encode(value: $ty) -> Vec<u8> {
            value.to_string().into_bytes()
        }

        pub fn $bin_decode(bytes: &[u8]) -> Result<$ty> {
            let arr: [u8; core::mem::size_of::<$ty>()] = bytes
                .try_into()
                .map_err(|_| decode_err(format!("expected {} bytes", core::mem::size_of::<$ty>())))?;
            Ok(<$ty>::from_be_bytes(arr))
        }

        pub fn $bin_encode(value: $ty) -> Vec<u8> {
            value.to_be_bytes().to_vec()
        }
    };
}

int_codec!(decode_int2_text, encode_int2_text, decode_int2_binary, encode_int2_binary, i16);
int_codec!(decode_int4_text, encode_int4_text, decode_int4_binary, encode_int4_binary, i32);
int_codec!(decode_int8_text, encode_int8_text, decode_int8_binary, encode_int8_binary, i64);

pub fn decode_float4_text(bytes: &[u8]) -> Result<f32> {
    as_str(bytes)?
        .trim()
        .parse::<f32>()
        .map_err(|e| decode_err(format!("invalid float4 literal: {e}")))
}

pub fn encode_float4_text(value: f32) -> Vec<u8> {
    value.to_string().into_bytes()
}

pub fn decode_float4_binary(bytes: &[u8]) -> Result<f32> {
    let arr: [u8; 4] = bytes.try_into().map_err(|_| decode_err("float4: expected 4 bytes"))?;
    Ok(f32::from_be_bytes(arr))
}

pub fn encode_float4_binary(value: f32) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

pub fn decode_float8_text(bytes: &[u8]) -> Result<f64> {
    as_str(bytes)?
        .trim()
        .parse::<f64>()
        .map_err(|e| decode_err(format!("invalid float8 literal: {e}")))
}

pub fn encode_float8_text(value: f64) -> Vec<u8> {
    value.to_string().into_bytes()
}

pub fn decode_float8_binary(bytes: &[u8]) -> Result<f64> {
    let arr: [u8; 8] = bytes.try_into().map_err(|_| decode_err("float8: expected 8 bytes"))?;
    Ok(f64::from_be_bytes(arr))
}

pub fn encode_float8_binary(value: f64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_text_variants() {
        assert!(decode_bool_text(b"true").unwrap());
        assert!(decode_bool_text(b"T").unwrap());
        assert!(!decode_bool_text(b"false").unwrap());
        assert!(decode_bool_text(b"nope").is_err());
    }

    #[test]
    fn int4_overflow_fails() {
        assert!(decode_int4_text(b"99999999999999999999").is_err());
    }

    #[test]
    fn int2_binary_roundtrip() {
        let bytes = encode_int2_binary(-1234);
        assert_eq!(decode_int2_binary(&bytes).unwrap(), -1234);
    }
}

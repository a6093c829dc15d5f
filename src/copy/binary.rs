//! COPY BINARY format (§4.5): a fixed signature, a flags header, then one
//! tuple per row (field count + length-prefixed field bytes), terminated by
//! a trailer field count of `-1`.

use crate::error::{Error, Result, SqlState};
use crate::value::Value;

pub const SIGNATURE: &[u8] = b"PGCOPY\n\xff\r\n\0";

/// The stream header written once before any row tuples.
pub fn header() -> Vec<u8> {
    let mut out = SIGNATURE.to_vec();
    out.extend_from_slice(&0i32.to_be_bytes()); // flags
    out.extend_from_slice(&0i32.to_be_bytes()); // header extension length
    out
}

/// The trailer written once after the last row tuple.
pub fn trailer() -> Vec<u8> {
    (-1i16).to_be_bytes().to_vec()
}

fn read_i16(buf: &[u8], pos: &mut usize) -> Result<i16> {
    let bytes = buf.get(*pos..*pos + 2).ok_or_else(too_short)?;
    *pos += 2;
    Ok(i16::from_be_bytes([bytes[0], bytes[1]]))
}

fn read_i32(buf: &[u8], pos: &mut usize) -> Result<i32> {
    let bytes = buf.get(*pos..*pos + 4).ok_or_else(too_short)?;
    *pos += 4;
    Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn too_short() -> Error {
    Error::wire(SqlState::BadCopyFileFormat, "truncated COPY BINARY payload")
}

/// Parse a complete buffered COPY IN BINARY payload, including the
/// signature header and trailer, into rows. Fields decode as
/// [`Value::Bytea`]; the backend interprets them against the target
/// column's real type.
pub fn decode_rows(buf: &[u8]) -> Result<Vec<Vec<Option<Value>>>> {
    if buf.len() < SIGNATURE.len() || &buf[..SIGNATURE.len()] != SIGNATURE {
        return Err(Error::wire(SqlState::BadCopyFileFormat, "COPY BINARY payload missing signature"));
    }
    let mut pos = SIGNATURE.len();
    let _flags = read_i32(buf, &mut pos)?;
    let ext_len = read_i32(buf, &mut pos)?;
    pos += ext_len.max(0) as usize;

    let mut rows = Vec::new();
    loop {
        let field_count = read_i16(buf, &mut pos)?;
        if field_count < 0 {
            break;
        }
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let len = read_i32(buf, &mut pos)?;
            if len < 0 {
                fields.push(None);
            } else {
                let bytes = buf.get(pos..pos + len as usize).ok_or_else(too_short)?;
                pos += len as usize;
                fields.push(Some(Value::Bytea(bytes.to_vec())));
            }
        }
        rows.push(fields);
    }
    Ok(rows)
}

/// Encode one row as a tuple (no header/trailer; the caller writes those
/// once per stream).
pub fn encode_row(row: &[Option<Value>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(row.len() as i16).to_be_bytes());
    for field in row {
        match field {
            None => out.extend_from_slice(&(-1i32).to_be_bytes()),
            Some(value) => {
                let bytes = crate::value::encode_binary(value).unwrap_or_else(|_| crate::value::encode_text(value));
                out.extend_from_slice(&(bytes.len() as i32).to_be_bytes());
                out.extend_from_slice(&bytes);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_one_row() {
        let row = vec![Some(Value::Bytea(vec![1, 2, 3])), None];
        let mut buf = header();
        buf.extend(encode_row(&row));
        buf.extend(trailer());

        let decoded = decode_rows(&buf).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0], row);
    }

    #[test]
    fn rejects_missing_signature() {
        assert!(decode_rows(b"not a copy stream").is_err());
    }
}

//! One-dimensional array codec (§4.2). Element encode/decode is supplied
//! by the caller so this module stays agnostic of the element's own type;
//! [`super::decode_text`]/[`super::decode_binary`] close over the element
//! OID's own codec functions when dispatching an `_ARRAY` OID here.

use crate::error::{Error, Result, SqlState};
use crate::protocol::codec::{read_i32, read_u32};
use crate::protocol::types::Oid;

use super::Value;

fn decode_err(msg: impl Into<String>) -> Error {
    Error::wire(SqlState::InvalidTextRepresentation, msg)
}

pub fn decode_text(bytes: &[u8], decode_elem: impl Fn(&[u8]) -> Result<Value>) -> Result<Vec<Option<Value>>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| decode_err(format!("array: invalid UTF-8: {e}")))?
        .trim();
    let inner = text
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| decode_err("array literal must be enclosed in braces"))?;
    split_elements(inner)
        .into_iter()
        .map(|raw| match raw {
            None => Ok(None),
            Some(s) => decode_elem(s.as_bytes()).map(Some),
        })
        .collect()
}

pub fn encode_text(elements: &[Option<Value>], encode_elem: impl Fn(&Value) -> Vec<u8>) -> Vec<u8> {
    let mut out = String::from("{");
    for (idx, elem) in elements.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        match elem {
            None => out.push_str("NULL"),
            Some(v) => {
                let bytes = encode_elem(v);
                let text = String::from_utf8_lossy(&bytes);
                out.push_str(&quote_if_needed(&text));
            }
        }
    }
    out.push('}');
    out.into_bytes()
}

/// Parse the comma-separated element list between the outer braces,
/// honouring double-quoted elements and their backslash escapes. `NULL`
/// (case-insensitive, unquoted) denotes a null element.
fn split_elements(inner: &str) -> Vec<Option<String>> {
    let chars: Vec<char> = inner.chars().collect();
    let n = chars.len();
    let mut elems = Vec::new();
    let mut i = 0;
    while i < n {
        if chars[i] == '"' {
            let mut s = String::new();
            i += 1;
            while i < n && chars[i] != '"' {
                if chars[i] == '\\' && i + 1 < n {
                    s.push(chars[i + 1]);
                    i += 2;
                } else {
                    s.push(chars[i]);
                    i += 1;
                }
            }
            i += 1; // closing quote
            elems.push(Some(s));
            while i < n && chars[i] != ',' {
                i += 1;
            }
        } else {
            let start = i;
            while i < n && chars[i] != ',' {
                i += 1;
            }
            let raw: String = chars[start..i].iter().collect();
            elems.push(if raw.eq_ignore_ascii_case("null") { None } else { Some(raw) });
        }
        if i < n {
            i += 1; // comma
        }
    }
    elems
}

fn quote_if_needed(s: &str) -> String {
    let needs_quote = s.is_empty()
        || s.eq_ignore_ascii_case("null")
        || s.chars().any(|c| matches!(c, '{' | '}' | ',' | '"' | '\\') || c.is_whitespace());
    if !needs_quote {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

const HAS_NULL_FLAG: i32 = 1;

pub fn decode_binary(bytes: &[u8], decode_elem: impl Fn(&[u8]) -> Result<Value>) -> Result<Vec<Option<Value>>> {
    let (ndim, rest) = read_i32(bytes).map_err(|_| decode_err("array: truncated header"))?;
    let (_flags, rest) = read_i32(rest).map_err(|_| decode_err("array: truncated header"))?;
    let (_elem_oid, rest) = read_u32(rest).map_err(|_| decode_err("array: truncated header"))?;

    if ndim == 0 {
        return Ok(Vec::new());
    }
    if ndim != 1 {
        return Err(decode_err("array: only one-dimensional arrays are supported"));
    }

    let (len, rest) = read_i32(rest).map_err(|_| decode_err("array: truncated dimension"))?;
    let (_lower_bound, mut rest) = read_i32(rest).map_err(|_| decode_err("array: truncated dimension"))?;

    let len = usize::try_from(len).map_err(|_| decode_err("array: negative dimension length"))?;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        let (elen, remaining) = read_i32(rest).map_err(|_| decode_err("array: truncated element length"))?;
        rest = remaining;
        if elen < 0 {
            out.push(None);
            continue;
        }
        let elen = elen as usize;
        if rest.len() < elen {
            return Err(decode_err("array: element data truncated"));
        }
        let (data, remaining) = rest.split_at(elen);
        out.push(Some(decode_elem(data)?));
        rest = remaining;
    }
    Ok(out)
}

pub fn encode_binary(
    elements: &[Option<Value>],
    elem_oid: Oid,
    encode_elem: impl Fn(&Value) -> Result<Vec<u8>>,
) -> Result<Vec<u8>> {
    let has_null = elements.iter().any(Option::is_none);
    let mut out = Vec::new();
    out.extend_from_slice(&1i32.to_be_bytes());
    out.extend_from_slice(&(if has_null { HAS_NULL_FLAG } else { 0 }).to_be_bytes());
    out.extend_from_slice(&elem_oid.to_be_bytes());
    out.extend_from_slice(&(elements.len() as i32).to_be_bytes());
    out.extend_from_slice(&1i32.to_be_bytes()); // lower bound
    for elem in elements {
        match elem {
            None => out.extend_from_slice(&(-1i32).to_be_bytes()),
            Some(v) => {
                let bytes = encode_elem(v)?;
                out.extend_from_slice(&(bytes.len() as i32).to_be_bytes());
                out.extend_from_slice(&bytes);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::primitives::{decode_int4_text, encode_int4_text};

    fn decode_int4(bytes: &[u8]) -> Result<Value> {
        decode_int4_text(bytes).map(Value::Int4)
    }

    fn encode_int4(v: &Value) -> Vec<u8> {
        match v {
            Value::Int4(n) => encode_int4_text(*n),
            _ => panic!("unexpected variant"),
        }
    }

    #[test]
    fn text_roundtrip() {
        let elements = vec![Some(Value::Int4(1)), None, Some(Value::Int4(-3))];
        let text = encode_text(&elements, encode_int4);
        assert_eq!(std::str::from_utf8(&text).unwrap(), "{1,NULL,-3}");
        let decoded = decode_text(&text, decode_int4).unwrap();
        assert_eq!(decoded, elements);
    }

    #[test]
    fn text_quotes_special_characters() {
        let elements = vec![Some(Value::Text("a,b".to_string()))];
        let encode_text_elem = |v: &Value| match v {
            Value::Text(s) => s.as_bytes().to_vec(),
            _ => panic!("unexpected variant"),
        };
        let text = encode_text(&elements, encode_text_elem);
        assert_eq!(std::str::from_utf8(&text).unwrap(), r#"{"a,b"}"#);
    }

    #[test]
    fn empty_array() {
        assert!(decode_text(b"{}", decode_int4).unwrap().is_empty());
    }

    #[test]
    fn binary_roundtrip() {
        let elements = vec![Some(Value::Int4(7)), None];
        let encode_int4_bin = |v: &Value| -> Result<Vec<u8>> {
            match v {
                Value::Int4(n) => Ok(n.to_be_bytes().to_vec()),
                _ => panic!("unexpected variant"),
            }
        };
        let decode_int4_bin = |bytes: &[u8]| -> Result<Value> {
            Ok(Value::Int4(i32::from_be_bytes(bytes.try_into().unwrap())))
        };
        let bytes = encode_binary(&elements, crate::protocol::types::oid::INT4, encode_int4_bin).unwrap();
        let decoded = decode_binary(&bytes, decode_int4_bin).unwrap();
        assert_eq!(decoded, elements);
    }
}

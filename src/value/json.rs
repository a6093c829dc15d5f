//! jsonb codec.
//!
//! The wire representation is UTF-8 JSON text in both text and binary mode
//! (jsonb's binary format additionally carries a version byte, which this
//! codec treats as always `1`, the only version PostgreSQL has ever
//! shipped). Decoding validates well-formedness; encoding preserves the
//! stored text verbatim unless the caller asks for [`canonicalize`], which
//! reformats the way the backend does when it normalises a value on
//! storage (§4.2: key/value separator becomes `": "`).

use crate::error::{Error, Result, SqlState};

const JSONB_VERSION: u8 = 1;

fn invalid(msg: impl Into<String>) -> Error {
    Error::wire(SqlState::InvalidTextRepresentation, msg)
}

fn validate(text: &str) -> Result<()> {
    serde_json::from_str::<serde_json::Value>(text)
        .map(|_| ())
        .map_err(|e| invalid(format!("invalid JSON: {e}")))
}

pub fn decode_text(bytes: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(bytes).map_err(|e| invalid(format!("invalid UTF-8: {e}")))?;
    validate(text)?;
    Ok(text.to_string())
}

pub fn encode_text(value: &str) -> Vec<u8> {
    value.as_bytes().to_vec()
}

pub fn decode_binary(bytes: &[u8]) -> Result<String> {
    let (version, rest) = bytes
        .split_first()
        .ok_or_else(|| invalid("jsonb: empty payload"))?;
    if *version != JSONB_VERSION {
        return Err(invalid(format!("jsonb: unsupported version byte {version}")));
    }
    decode_text(rest)
}

pub fn encode_binary(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + value.len());
    out.push(JSONB_VERSION);
    out.extend_from_slice(value.as_bytes());
    out
}

/// Reformat JSON text the way jsonb canonicalises it on storage: compact,
/// with `": "` after keys and `", "` between elements.
pub fn canonicalize(text: &str) -> Result<String> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| invalid(format!("invalid JSON: {e}")))?;
    Ok(render(&value))
}

fn render(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => serde_json::to_string(s).unwrap_or_default(),
        serde_json::Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", inner.join(", "))
        }
        serde_json::Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", serde_json::to_string(k).unwrap_or_default(), render(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_malformed_json() {
        assert!(decode_text(b"{not json}").is_err());
    }

    #[test]
    fn text_roundtrip_preserves_input() {
        let input = br#"{"a":1,"b":[true,null]}"#;
        assert_eq!(decode_text(input).unwrap(), std::str::from_utf8(input).unwrap());
    }

    #[test]
    fn binary_roundtrip() {
        let text = decode_text(br#"{"a":1}"#).unwrap();
        let bytes = encode_binary(&text);
        assert_eq!(decode_binary(&bytes).unwrap(), text);
    }

    #[test]
    fn canonicalize_inserts_separators() {
        let canon = canonicalize(r#"{"a":1,"b":2}"#).unwrap();
        assert_eq!(canon, r#"{"a": 1, "b": 2}"#);
    }
}

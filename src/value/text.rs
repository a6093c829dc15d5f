//! text, varchar, bpchar codecs. All three share the same wire
//! representation (UTF-8 bytes); `bpchar`'s blank-padding is a display
//! concern the backend handles, not something the codec re-derives.

use crate::error::{Error, Result, SqlState};

pub fn decode(bytes: &[u8]) -> Result<String> {
    simdutf8::basic::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| Error::wire(SqlState::InvalidTextRepresentation, format!("invalid UTF-8: {e}")))
}

pub fn encode(value: &str) -> Vec<u8> {
    value.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let s = "héllo wörld";
        assert_eq!(decode(&encode(s)).unwrap(), s);
    }

    #[test]
    fn rejects_invalid_utf8() {
        assert!(decode(&[0xff, 0xfe]).is_err());
    }
}

//! COPY TEXT format (§4.5): tab-delimited rows, one per line, with
//! backslash escapes and a configurable NULL marker (`\N` by default).

use crate::error::{Error, Result, SqlState};
use crate::value::Value;

fn unescape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('t') => out.push('\t'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('\\') => out.push('\\'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn escape(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        match c {
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    out
}

/// Parse the entire buffered COPY IN payload into rows. Every field becomes
/// a [`Value::Text`]; the backend is responsible for its own coercion, same
/// as for untyped extended-query parameters (§4.2).
pub fn decode_rows(buf: &[u8], delimiter: char, null_string: &str) -> Result<Vec<Vec<Option<Value>>>> {
    let text = std::str::from_utf8(buf)
        .map_err(|e| Error::wire(SqlState::BadCopyFileFormat, format!("COPY text payload is not valid UTF-8: {e}")))?;
    let mut rows = Vec::new();
    for line in text.split('\n') {
        if line.is_empty() {
            continue;
        }
        let fields: Vec<Option<Value>> = line
            .split(delimiter)
            .map(|raw| {
                if raw == null_string {
                    None
                } else {
                    Some(Value::Text(unescape(raw)))
                }
            })
            .collect();
        rows.push(fields);
    }
    Ok(rows)
}

/// Encode one row for the COPY OUT stream.
pub fn encode_row(row: &[Option<Value>], delimiter: char, null_string: &str) -> Vec<u8> {
    let mut out = String::new();
    for (i, field) in row.iter().enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        match field {
            None => out.push_str(null_string),
            Some(value) => out.push_str(&escape(&String::from_utf8_lossy(&crate::value::encode_text(value)))),
        }
    }
    out.push('\n');
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_simple_rows() {
        let rows = decode_rows(b"1\tAlice\n2\tBob\n", '\t', "\\N").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], Some(Value::Text("Alice".to_string())));
    }

    #[test]
    fn decodes_null_marker() {
        let rows = decode_rows(b"1\t\\N\n", '\t', "\\N").unwrap();
        assert_eq!(rows[0][1], None);
    }

    #[test]
    fn round_trips_escaped_characters() {
        let row = vec![Some(Value::Text("a\tb\\c".to_string()))];
        let encoded = encode_row(&row, '\t', "\\N");
        let decoded = decode_rows(&encoded, '\t', "\\N").unwrap();
        assert_eq!(decoded[0][0], Some(Value::Text("a\tb\\c".to_string())));
    }
}

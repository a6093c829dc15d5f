//! COPY CSV format (§4.5): comma-delimited rows with `"`-quoting and a
//! configurable NULL marker (empty field by default).

use crate::error::{Error, Result, SqlState};
use crate::value::Value;

fn split_csv_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else if c == '"' {
            in_quotes = true;
        } else if c == delimiter {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    fields.push(current);
    fields
}

fn quote_if_needed(field: &str, delimiter: char) -> String {
    if field.contains(delimiter) || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn decode_rows(buf: &[u8], delimiter: char, null_string: &str, skip_header: bool) -> Result<Vec<Vec<Option<Value>>>> {
    let text = std::str::from_utf8(buf)
        .map_err(|e| Error::wire(SqlState::BadCopyFileFormat, format!("COPY CSV payload is not valid UTF-8: {e}")))?;
    let mut rows = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if line.is_empty() {
            continue;
        }
        if skip_header && i == 0 {
            continue;
        }
        let fields = split_csv_line(line, delimiter)
            .into_iter()
            .map(|raw| if raw == null_string { None } else { Some(Value::Text(raw)) })
            .collect();
        rows.push(fields);
    }
    Ok(rows)
}

pub fn encode_row(row: &[Option<Value>], delimiter: char, null_string: &str) -> Vec<u8> {
    let mut out = String::new();
    for (i, field) in row.iter().enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        match field {
            None => out.push_str(null_string),
            Some(value) => {
                let text = String::from_utf8_lossy(&crate::value::encode_text(value)).into_owned();
                out.push_str(&quote_if_needed(&text, delimiter));
            }
        }
    }
    out.push('\n');
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_quoted_fields_with_embedded_delimiter() {
        let rows = decode_rows(b"1,\"Smith, John\"\n", ',', "", false).unwrap();
        assert_eq!(rows[0][1], Some(Value::Text("Smith, John".to_string())));
    }

    #[test]
    fn skips_header_row_when_requested() {
        let rows = decode_rows(b"id,name\n1,Alice\n", ',', "", true).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn empty_field_is_null() {
        let rows = decode_rows(b"1,\n", ',', "", false).unwrap();
        assert_eq!(rows[0][1], None);
    }
}

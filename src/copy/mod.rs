//! COPY Engine (§4.5): parses `COPY ... FROM/TO STDIN` statement text, and
//! encodes/decodes the COPY stream payload in TEXT, CSV, and BINARY format.

pub mod binary;
pub mod csv;
pub mod text;

use crate::error::{Error, Result, SqlState};
use crate::protocol::types::FormatCode;
use crate::value::Value;

/// Which way data moves relative to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

/// The three wire encodings a COPY stream may use (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Csv,
    Binary,
}

impl Format {
    pub fn wire_format(self) -> FormatCode {
        match self {
            Format::Binary => FormatCode::Binary,
            Format::Text | Format::Csv => FormatCode::Text,
        }
    }
}

/// A parsed `COPY` statement.
#[derive(Debug, Clone)]
pub struct CopyStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub direction: Direction,
    pub format: Format,
    pub delimiter: char,
    /// Text representing SQL NULL; `\N` for TEXT, empty string by default for CSV.
    pub null_string: String,
    pub csv_header: bool,
}

/// Approximates Spanner's per-commit mutation ceiling: rows times the
/// number of columns written (§4.5). Index fan-out isn't counted since this
/// engine has no catalog to learn index membership from.
pub const MUTATION_LIMIT: u64 = 20_000;

/// Parse a `COPY <table> [(<columns>)] FROM|TO STDIN [WITH (...)]` statement.
/// Only STDIN/STDOUT forms are supported; a filename target is rejected, as
/// only the wire sub-protocol is in scope.
pub fn parse_copy_statement(sql: &str) -> Result<CopyStatement> {
    let upper = sql.to_ascii_uppercase();
    if !upper.trim_start().starts_with("COPY") {
        return Err(Error::wire(SqlState::SyntaxError, "not a COPY statement"));
    }
    let rest = sql.trim_start()[4..].trim();

    let direction = if upper.contains("FROM STDIN") {
        Direction::In
    } else if upper.contains("TO STDIN") || upper.contains("TO STDOUT") {
        Direction::Out
    } else {
        return Err(Error::wire(SqlState::SyntaxError, "COPY must target STDIN or STDOUT"));
    };

    let split_at = upper.find(" FROM ").or_else(|| upper.find(" TO ")).ok_or_else(|| {
        Error::wire(SqlState::SyntaxError, "COPY statement missing FROM/TO clause")
    })?;
    let target = rest[..split_at].trim();
    let options = rest[split_at..].trim();

    let (table, columns) = parse_target(target)?;

    let mut format = Format::Text;
    let mut delimiter = '\t';
    let mut null_string = None;
    let mut csv_header = false;

    let options_upper = options.to_ascii_uppercase();
    if options_upper.contains("BINARY") {
        format = Format::Binary;
    } else if options_upper.contains("CSV") || options_upper.contains("FORMAT CSV") {
        format = Format::Csv;
        delimiter = ',';
    }
    if options_upper.contains("HEADER") {
        csv_header = true;
    }
    if let Some(pos) = options_upper.find("DELIMITER") {
        if let Some(quoted) = extract_quoted_after(&options[pos..]) {
            delimiter = quoted.chars().next().unwrap_or(delimiter);
        }
    }
    if let Some(pos) = options_upper.find("NULL") {
        if let Some(quoted) = extract_quoted_after(&options[pos..]) {
            null_string = Some(quoted);
        }
    }

    let null_string = null_string.unwrap_or_else(|| {
        match format {
            Format::Csv => String::new(),
            _ => "\\N".to_string(),
        }
    });

    Ok(CopyStatement { table, columns, direction, format, delimiter, null_string, csv_header })
}

fn parse_target(target: &str) -> Result<(String, Vec<String>)> {
    if let Some(paren) = target.find('(') {
        let table = target[..paren].trim().to_string();
        let close = target.rfind(')').ok_or_else(|| {
            Error::wire(SqlState::SyntaxError, "unterminated column list in COPY statement")
        })?;
        let columns = target[paren + 1..close]
            .split(',')
            .map(|c| c.trim().trim_matches('"').to_string())
            .filter(|c| !c.is_empty())
            .collect();
        Ok((table, columns))
    } else {
        Ok((target.trim().to_string(), Vec::new()))
    }
}

fn extract_quoted_after(s: &str) -> Option<String> {
    let start = s.find('\'')?;
    let rest = &s[start + 1..];
    let end = rest.find('\'')?;
    Some(rest[..end].to_string())
}

/// Encode one row for the COPY OUT stream in the negotiated format.
pub fn encode_copy_out_row(row: &[Option<Value>], format: Format) -> Vec<u8> {
    match format {
        Format::Text => text::encode_row(row, '\t', "\\N"),
        Format::Csv => csv::encode_row(row, ',', ""),
        Format::Binary => binary::encode_row(row),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_copy_in() {
        let stmt = parse_copy_statement("COPY orders (id, total) FROM STDIN").unwrap();
        assert_eq!(stmt.table, "orders");
        assert_eq!(stmt.columns, vec!["id", "total"]);
        assert_eq!(stmt.direction, Direction::In);
        assert_eq!(stmt.format, Format::Text);
    }

    #[test]
    fn parses_csv_options() {
        let stmt = parse_copy_statement("COPY orders FROM STDIN WITH (FORMAT CSV, HEADER true)").unwrap();
        assert_eq!(stmt.format, Format::Csv);
        assert!(stmt.csv_header);
        assert_eq!(stmt.delimiter, ',');
    }

    #[test]
    fn parses_binary_format() {
        let stmt = parse_copy_statement("COPY orders FROM STDIN (FORMAT BINARY)").unwrap();
        assert_eq!(stmt.format, Format::Binary);
    }

    #[test]
    fn rejects_filename_target() {
        assert!(parse_copy_statement("COPY orders FROM '/tmp/x.csv'").is_err());
    }
}

//! Extended-query pipeline messages: Parse, Bind, Describe, Execute, Close.

use crate::error::{Error, Result, SqlState};
use crate::protocol::codec::{read_cstr, read_i16, read_i32};
use crate::protocol::types::{FormatCode, Oid};

/// A parsed `Parse` message.
#[derive(Debug, Clone)]
pub struct Parse<'a> {
    /// Empty string denotes the anonymous statement.
    pub name: &'a str,
    pub query: &'a str,
    pub param_type_oids: Vec<Oid>,
}

impl<'a> Parse<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (name, rest) = read_cstr(payload)?;
        let (query, rest) = read_cstr(rest)?;
        let (num_params, mut rest) = read_i16(rest)?;
        if num_params < 0 {
            return Err(Error::wire(
                SqlState::ProtocolViolation,
                "Parse: negative parameter count",
            ));
        }
        let mut param_type_oids = Vec::with_capacity(num_params as usize);
        for _ in 0..num_params {
            let (oid, remaining) = crate::protocol::codec::read_u32(rest)?;
            param_type_oids.push(oid);
            rest = remaining;
        }
        Ok(Self {
            name,
            query,
            param_type_oids,
        })
    }
}

/// Resolve a format-code list of length 0, 1, or N against N columns, per
/// the wire protocol's rule (§4.2 relies on this indirectly via Bind).
fn resolve_format(formats: &[FormatCode], index: usize) -> FormatCode {
    match formats.len() {
        0 => FormatCode::Text,
        1 => formats[0],
        _ => formats.get(index).copied().unwrap_or(FormatCode::Text),
    }
}

/// A parsed `Bind` message.
#[derive(Debug, Clone)]
pub struct Bind<'a> {
    /// Empty string denotes the unnamed portal.
    pub portal: &'a str,
    pub statement: &'a str,
    param_formats: Vec<FormatCode>,
    /// `None` denotes a SQL NULL.
    pub param_values: Vec<Option<&'a [u8]>>,
    result_formats: Vec<FormatCode>,
}

impl<'a> Bind<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (portal, rest) = read_cstr(payload)?;
        let (statement, rest) = read_cstr(rest)?;

        let (num_param_formats, mut rest) = read_i16(rest)?;
        let mut param_formats = Vec::with_capacity(num_param_formats.max(0) as usize);
        for _ in 0..num_param_formats.max(0) {
            let (code, remaining) = read_i16(rest)?;
            param_formats.push(FormatCode::from_u16(code as u16));
            rest = remaining;
        }

        let (num_params, mut rest) = read_i16(rest)?;
        if num_params < 0 {
            return Err(Error::wire(
                SqlState::ProtocolViolation,
                "Bind: negative parameter count",
            ));
        }
        let mut param_values = Vec::with_capacity(num_params as usize);
        for _ in 0..num_params {
            let (len, remaining) = read_i32(rest)?;
            if len < 0 {
                param_values.push(None);
                rest = remaining;
            } else {
                let (bytes, remaining) =
                    crate::protocol::codec::read_bytes(remaining, len as usize)?;
                param_values.push(Some(bytes));
                rest = remaining;
            }
        }

        let (num_result_formats, mut rest) = read_i16(rest)?;
        let mut result_formats = Vec::with_capacity(num_result_formats.max(0) as usize);
        for _ in 0..num_result_formats.max(0) {
            let (code, remaining) = read_i16(rest)?;
            result_formats.push(FormatCode::from_u16(code as u16));
            rest = remaining;
        }

        Ok(Self {
            portal,
            statement,
            param_formats,
            param_values,
            result_formats,
        })
    }

    /// The wire format of the `index`-th parameter, resolving the 0/1/N rule.
    pub fn param_format(&self, index: usize) -> FormatCode {
        resolve_format(&self.param_formats, index)
    }

    /// The wire format the client wants for the `index`-th result column
    /// out of `total` columns, resolving the 0/1/N rule.
    pub fn result_format(&self, index: usize) -> FormatCode {
        resolve_format(&self.result_formats, index)
    }

    /// The raw (unresolved) result format-code list as sent on the wire;
    /// 0, 1, or N entries. Kept by the portal past `Bind`'s own lifetime so
    /// the 0/1/N rule can still be resolved once the column count is known.
    pub fn raw_result_formats(&self) -> &[FormatCode] {
        &self.result_formats
    }
}

/// Which table a Describe/Close message targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Statement,
    Portal,
}

impl TargetKind {
    fn from_byte(b: u8) -> Result<Self> {
        match b {
            b'S' => Ok(TargetKind::Statement),
            b'P' => Ok(TargetKind::Portal),
            other => Err(Error::wire(
                SqlState::ProtocolViolation,
                format!("expected 'S' or 'P', got {:?}", other as char),
            )),
        }
    }
}

/// A parsed `Describe` message.
#[derive(Debug, Clone)]
pub struct Describe<'a> {
    pub kind: TargetKind,
    pub name: &'a str,
}

impl<'a> Describe<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (kind_byte, rest) = crate::protocol::codec::read_u8(payload)?;
        let kind = TargetKind::from_byte(kind_byte)?;
        let (name, _) = read_cstr(rest)?;
        Ok(Self { kind, name })
    }
}

/// A parsed `Close` message.
#[derive(Debug, Clone)]
pub struct Close<'a> {
    pub kind: TargetKind,
    pub name: &'a str,
}

impl<'a> Close<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (kind_byte, rest) = crate::protocol::codec::read_u8(payload)?;
        let kind = TargetKind::from_byte(kind_byte)?;
        let (name, _) = read_cstr(rest)?;
        Ok(Self { kind, name })
    }
}

/// A parsed `Execute` message.
#[derive(Debug, Clone)]
pub struct Execute<'a> {
    pub portal: &'a str,
    /// `0` means "no limit, return all rows".
    pub max_rows: i32,
}

impl<'a> Execute<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (portal, rest) = read_cstr(payload)?;
        let (max_rows, _) = read_i32(rest)?;
        Ok(Self { portal, max_rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::MessageBuilder;

    #[test]
    fn test_parse() {
        let mut buf = Vec::new();
        let mut msg = MessageBuilder::new(&mut buf, b'P');
        msg.write_cstr("stmt1");
        msg.write_cstr("SELECT $1");
        msg.write_i16(1);
        msg.write_u32(crate::protocol::types::oid::INT4);
        msg.finish();

        let parsed = Parse::parse(&buf[5..]).unwrap();
        assert_eq!(parsed.name, "stmt1");
        assert_eq!(parsed.query, "SELECT $1");
        assert_eq!(parsed.param_type_oids, vec![crate::protocol::types::oid::INT4]);
    }

    #[test]
    fn test_bind_roundtrip() {
        let mut buf = Vec::new();
        let mut msg = MessageBuilder::new(&mut buf, b'B');
        msg.write_cstr("");
        msg.write_cstr("stmt1");
        msg.write_i16(1);
        msg.write_i16(0); // text
        msg.write_i16(2);
        msg.write_i32(1);
        msg.write_bytes(b"1");
        msg.write_i32(-1);
        msg.write_i16(0);
        msg.finish();

        let bind = Bind::parse(&buf[5..]).unwrap();
        assert_eq!(bind.portal, "");
        assert_eq!(bind.statement, "stmt1");
        assert_eq!(bind.param_values, vec![Some(&b"1"[..]), None]);
        assert_eq!(bind.param_format(0), FormatCode::Text);
        assert_eq!(bind.param_format(1), FormatCode::Text);
    }

    #[test]
    fn test_execute() {
        let mut buf = Vec::new();
        let mut msg = MessageBuilder::new(&mut buf, b'E');
        msg.write_cstr("portal1");
        msg.write_i32(100);
        msg.finish();

        let exec = Execute::parse(&buf[5..]).unwrap();
        assert_eq!(exec.portal, "portal1");
        assert_eq!(exec.max_rows, 100);
    }

    #[test]
    fn test_describe_and_close() {
        let mut buf = Vec::new();
        let mut msg = MessageBuilder::new(&mut buf, b'D');
        msg.write_u8(b'S');
        msg.write_cstr("stmt1");
        msg.finish();

        let describe = Describe::parse(&buf[5..]).unwrap();
        assert_eq!(describe.kind, TargetKind::Statement);
        assert_eq!(describe.name, "stmt1");
    }
}

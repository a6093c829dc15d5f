//! COPY sub-protocol frontend messages.

use crate::error::Result;
use crate::protocol::codec::read_cstr;

/// A `CopyData` message: an opaque, byte-aligned slice of the COPY stream.
#[derive(Debug, Clone, Copy)]
pub struct CopyData<'a>(pub &'a [u8]);

impl<'a> CopyData<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        Ok(CopyData(payload))
    }
}

/// A `CopyDone` message: a commit-point marker, carries no payload.
#[derive(Debug, Clone, Copy)]
pub struct CopyDone;

impl CopyDone {
    pub fn parse(_payload: &[u8]) -> Result<Self> {
        Ok(CopyDone)
    }
}

/// A `CopyFail` message: a rollback-point marker carrying a client-supplied reason.
#[derive(Debug, Clone, Copy)]
pub struct CopyFail<'a>(pub &'a str);

impl<'a> CopyFail<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (message, _) = read_cstr(payload)?;
        Ok(CopyFail(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_data() {
        assert_eq!(CopyData::parse(b"1\tOne\n").unwrap().0, b"1\tOne\n");
    }

    #[test]
    fn test_copy_done() {
        assert!(CopyDone::parse(&[]).is_ok());
    }

    #[test]
    fn test_copy_fail() {
        let mut payload = b"oops".to_vec();
        payload.push(0);
        assert_eq!(CopyFail::parse(&payload).unwrap().0, "oops");
    }
}

//! Wire Framer (§4.1): reads and writes length-prefixed typed frames.
//!
//! This is pure I/O with no protocol semantics — it never interprets
//! payload bytes. Like the teacher's `state` module, it is sans-I/O: it
//! operates on an in-memory buffer and tells the caller whether a full
//! frame is available yet, rather than blocking on a socket itself. The
//! external driver loop owns the actual read/write syscalls (§5).

use crate::error::{Error, Result};

/// Outcome of attempting to read one frame from a buffer.
pub enum ReadOutcome<T> {
    /// Fewer than the declared length are available yet; the caller must
    /// read more bytes from the wire and retry.
    NeedMoreBytes,
    /// A complete frame was parsed. The `usize` is how many leading bytes
    /// of the input buffer it consumed; the caller should drop them.
    Frame(T, usize),
}

/// A non-startup frame: `tag:byte, length:uint32_be, payload:bytes`.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub tag: u8,
    pub payload: &'a [u8],
}

/// Read the next tagged frame from `buf`, if a complete one is present.
///
/// Fails with a connection-fatal [`Error::Framer`] on a declared length
/// below four, since the length field always includes itself.
pub fn read_frame(buf: &[u8]) -> Result<ReadOutcome<Frame<'_>>> {
    if buf.len() < 5 {
        return Ok(ReadOutcome::NeedMoreBytes);
    }
    let tag = buf[0];
    let len = i32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
    if len < 4 {
        return Err(Error::Framer(format!(
            "frame length {len} is below the minimum of 4"
        )));
    }
    let total = 1 + len as usize;
    if buf.len() < total {
        return Ok(ReadOutcome::NeedMoreBytes);
    }
    Ok(ReadOutcome::Frame(
        Frame {
            tag,
            payload: &buf[5..total],
        },
        total,
    ))
}

/// Read the tag-less startup frame: `length:uint32_be, payload:bytes`.
///
/// Only ever called once per connection, before the first tagged frame.
pub fn read_startup_frame(buf: &[u8]) -> Result<ReadOutcome<&[u8]>> {
    if buf.len() < 4 {
        return Ok(ReadOutcome::NeedMoreBytes);
    }
    let len = i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if len < 4 {
        return Err(Error::Framer(format!(
            "startup frame length {len} is below the minimum of 4"
        )));
    }
    let total = len as usize;
    if buf.len() < total {
        return Ok(ReadOutcome::NeedMoreBytes);
    }
    Ok(ReadOutcome::Frame(&buf[4..total], total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::MessageBuilder;

    #[test]
    fn needs_more_bytes_on_partial_header() {
        let buf = [b'Q', 0, 0, 0];
        assert!(matches!(
            read_frame(&buf).unwrap(),
            ReadOutcome::NeedMoreBytes
        ));
    }

    #[test]
    fn needs_more_bytes_on_partial_payload() {
        let mut buf = Vec::new();
        let mut msg = MessageBuilder::new(&mut buf, b'Q');
        msg.write_cstr("SELECT 1");
        msg.finish();
        let truncated = &buf[..buf.len() - 2];
        assert!(matches!(
            read_frame(truncated).unwrap(),
            ReadOutcome::NeedMoreBytes
        ));
    }

    #[test]
    fn reads_complete_frame() {
        let mut buf = Vec::new();
        let mut msg = MessageBuilder::new(&mut buf, b'Q');
        msg.write_cstr("SELECT 1");
        msg.finish();

        match read_frame(&buf).unwrap() {
            ReadOutcome::Frame(frame, consumed) => {
                assert_eq!(frame.tag, b'Q');
                assert_eq!(consumed, buf.len());
            }
            ReadOutcome::NeedMoreBytes => panic!("expected a complete frame"),
        }
    }

    #[test]
    fn rejects_length_below_four() {
        let buf = [b'Q', 0, 0, 0, 2];
        assert!(read_frame(&buf).is_err());
    }
}

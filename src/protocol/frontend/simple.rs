//! Simple-query protocol message.

use crate::error::Result;
use crate::protocol::codec::read_cstr;

/// Parse a `Query` message payload.
///
/// The query string may contain multiple semicolon-separated statements,
/// executed as a single implicit transaction (§4.4.4).
pub fn parse_query(payload: &[u8]) -> Result<&str> {
    let (text, _) = read_cstr(payload)?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::MessageBuilder;

    #[test]
    fn test_query() {
        let mut buf = Vec::new();
        let mut msg = MessageBuilder::new(&mut buf, b'Q');
        msg.write_cstr("SELECT 1");
        msg.finish();

        assert_eq!(parse_query(&buf[5..]).unwrap(), "SELECT 1");
    }
}

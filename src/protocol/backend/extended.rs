//! Extended-query acknowledgement messages: ParseComplete, BindComplete,
//! CloseComplete, ParameterDescription, NoData, PortalSuspended.

use crate::protocol::codec::MessageBuilder;
use crate::protocol::types::Oid;

use super::msg_type;

/// Write a `ParseComplete` message (no payload).
pub fn write_parse_complete(buf: &mut Vec<u8>) {
    MessageBuilder::new(buf, msg_type::PARSE_COMPLETE).finish();
}

/// Write a `BindComplete` message (no payload).
pub fn write_bind_complete(buf: &mut Vec<u8>) {
    MessageBuilder::new(buf, msg_type::BIND_COMPLETE).finish();
}

/// Write a `CloseComplete` message (no payload).
pub fn write_close_complete(buf: &mut Vec<u8>) {
    MessageBuilder::new(buf, msg_type::CLOSE_COMPLETE).finish();
}

/// Write a `ParameterDescription` message listing the inferred parameter OIDs.
pub fn write_parameter_description(buf: &mut Vec<u8>, param_oids: &[Oid]) {
    let mut msg = MessageBuilder::new(buf, msg_type::PARAMETER_DESCRIPTION);
    msg.write_i16(param_oids.len() as i16);
    for oid in param_oids {
        msg.write_u32(*oid);
    }
    msg.finish();
}

/// Write a `NoData` message, sent when Describe targets a statement/portal
/// that produces no result set.
pub fn write_no_data(buf: &mut Vec<u8>) {
    MessageBuilder::new(buf, msg_type::NO_DATA).finish();
}

/// Write a `PortalSuspended` message, sent when Execute's row limit was
/// reached before the result set was exhausted.
pub fn write_portal_suspended(buf: &mut Vec<u8>) {
    MessageBuilder::new(buf, msg_type::PORTAL_SUSPENDED).finish();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_description() {
        let mut buf = Vec::new();
        write_parameter_description(&mut buf, &[23, 25]);
        assert_eq!(buf[0], b't');
        let len = i32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
        assert_eq!(len as usize, 4 + 2 + 4 + 4);
    }

    #[test]
    fn test_zero_payload_messages() {
        let mut buf = Vec::new();
        write_parse_complete(&mut buf);
        write_bind_complete(&mut buf);
        write_close_complete(&mut buf);
        write_no_data(&mut buf);
        write_portal_suspended(&mut buf);
        assert_eq!(buf.len(), 5 * 5);
    }
}

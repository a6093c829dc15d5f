//! ErrorResponse / NoticeResponse backend messages.

use crate::error::WireError;
use crate::protocol::codec::MessageBuilder;

use super::msg_type;

/// PostgreSQL error/notice field type codes.
pub mod field_type {
    pub const SEVERITY: u8 = b'S';
    pub const SEVERITY_NON_LOCALIZED: u8 = b'V';
    pub const CODE: u8 = b'C';
    pub const MESSAGE: u8 = b'M';
    pub const DETAIL: u8 = b'D';
    pub const HINT: u8 = b'H';
    pub const POSITION: u8 = b'P';
}

fn write_fields(msg: &mut MessageBuilder<'_>, error: &WireError) {
    msg.write_u8(field_type::SEVERITY);
    msg.write_cstr(error.severity);
    msg.write_u8(field_type::SEVERITY_NON_LOCALIZED);
    msg.write_cstr(error.severity);
    msg.write_u8(field_type::CODE);
    msg.write_cstr(error.sqlstate.code());
    msg.write_u8(field_type::MESSAGE);
    msg.write_cstr(&error.message);
    if let Some(detail) = &error.detail {
        msg.write_u8(field_type::DETAIL);
        msg.write_cstr(detail);
    }
    if let Some(hint) = &error.hint {
        msg.write_u8(field_type::HINT);
        msg.write_cstr(hint);
    }
    if let Some(position) = error.position {
        msg.write_u8(field_type::POSITION);
        msg.write_cstr(&position.to_string());
    }
    msg.write_u8(0);
}

/// Write an `ErrorResponse` message from a [`WireError`].
pub fn write_error_response(buf: &mut Vec<u8>, error: &WireError) {
    let mut msg = MessageBuilder::new(buf, msg_type::ERROR_RESPONSE);
    write_fields(&mut msg, error);
    msg.finish();
}

/// Write a `NoticeResponse` message from a [`WireError`] (typically with a
/// non-`ERROR` severity).
pub fn write_notice_response(buf: &mut Vec<u8>, error: &WireError) {
    let mut msg = MessageBuilder::new(buf, msg_type::NOTICE_RESPONSE);
    write_fields(&mut msg, error);
    msg.finish();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SqlState;

    #[test]
    fn test_error_response_contains_sqlstate() {
        let mut buf = Vec::new();
        let error = WireError::new(SqlState::InvalidTextRepresentation, "bad int");
        write_error_response(&mut buf, &error);
        assert_eq!(buf[0], b'E');
        let body = &buf[5..];
        assert!(body.windows(5).any(|w| w == b"22P02"));
    }
}

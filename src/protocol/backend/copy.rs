//! COPY sub-protocol backend messages.

use crate::protocol::codec::MessageBuilder;
use crate::protocol::types::FormatCode;

use super::msg_type;

fn write_copy_response(buf: &mut Vec<u8>, tag: u8, overall_format: FormatCode, column_formats: &[FormatCode]) {
    let mut msg = MessageBuilder::new(buf, tag);
    msg.write_u8(overall_format as u8);
    msg.write_i16(column_formats.len() as i16);
    for format in column_formats {
        msg.write_i16(*format as i16);
    }
    msg.finish();
}

/// Write a `CopyInResponse` message declaring the per-column format codes
/// the engine expects for the incoming COPY stream.
pub fn write_copy_in_response(buf: &mut Vec<u8>, overall_format: FormatCode, column_formats: &[FormatCode]) {
    write_copy_response(buf, msg_type::COPY_IN_RESPONSE, overall_format, column_formats);
}

/// Write a `CopyOutResponse` message declaring the per-column format codes
/// used for the outgoing COPY stream.
pub fn write_copy_out_response(buf: &mut Vec<u8>, overall_format: FormatCode, column_formats: &[FormatCode]) {
    write_copy_response(buf, msg_type::COPY_OUT_RESPONSE, overall_format, column_formats);
}

/// Write a `CopyData` message carrying one chunk of the COPY OUT stream.
pub fn write_copy_data(buf: &mut Vec<u8>, data: &[u8]) {
    let mut msg = MessageBuilder::new(buf, msg_type::COPY_DATA);
    msg.write_bytes(data);
    msg.finish();
}

/// Write a `CopyDone` message (no payload).
pub fn write_copy_done(buf: &mut Vec<u8>) {
    MessageBuilder::new(buf, msg_type::COPY_DONE).finish();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_in_response() {
        let mut buf = Vec::new();
        write_copy_in_response(&mut buf, FormatCode::Text, &[FormatCode::Text, FormatCode::Text]);
        assert_eq!(buf[0], b'G');
    }
}

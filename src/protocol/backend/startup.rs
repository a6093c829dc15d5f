//! Messages emitted once a session transitions STARTUP → READY.
//!
//! `AuthenticationOk`/`MD5`/`SASL` are not written here: per §1/§6 the
//! authentication handshake itself is an external collaborator's
//! responsibility. This engine picks up only after that handshake
//! completes, and is responsible for announcing negotiated parameters and
//! the session's cancellation key.

use crate::protocol::codec::MessageBuilder;
use crate::protocol::types::TransactionStatus;

use super::msg_type;

/// Write a `ParameterStatus` message, sent once per negotiated parameter at
/// startup and again whenever a `SET` changes it.
pub fn write_parameter_status(buf: &mut Vec<u8>, name: &str, value: &str) {
    let mut msg = MessageBuilder::new(buf, msg_type::PARAMETER_STATUS);
    msg.write_cstr(name);
    msg.write_cstr(value);
    msg.finish();
}

/// Write a `BackendKeyData` message carrying the cancellation key pair.
pub fn write_backend_key_data(buf: &mut Vec<u8>, pid: u32, secret_key: u32) {
    let mut msg = MessageBuilder::new(buf, msg_type::BACKEND_KEY_DATA);
    msg.write_u32(pid);
    msg.write_u32(secret_key);
    msg.finish();
}

/// Write a `ReadyForQuery` message carrying the session's transaction status.
pub fn write_ready_for_query(buf: &mut Vec<u8>, status: TransactionStatus) {
    let mut msg = MessageBuilder::new(buf, msg_type::READY_FOR_QUERY);
    msg.write_u8(status as u8);
    msg.finish();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_for_query() {
        let mut buf = Vec::new();
        write_ready_for_query(&mut buf, TransactionStatus::Idle);
        assert_eq!(buf[0], b'Z');
        assert_eq!(*buf.last().unwrap(), b'I');
    }

    #[test]
    fn test_backend_key_data() {
        let mut buf = Vec::new();
        write_backend_key_data(&mut buf, 99, 123456);
        assert_eq!(buf[0], b'K');
        assert_eq!(buf.len(), 1 + 4 + 4 + 4);
    }
}

//! The tag-less startup family: SSLRequest, GSSENCRequest, CancelRequest,
//! and StartupMessage itself. These are the only frames without a leading
//! tag byte, which is why the wire framer special-cases the first frame of
//! a connection (§4.1).

use crate::error::{Error, Result, SqlState};
use crate::protocol::codec::{read_cstr, read_i32};

/// Protocol version 3.0 (0x00030000), the only version this engine speaks.
pub const PROTOCOL_VERSION_3_0: i32 = 196_608;

/// SSL request code, sent in place of a StartupMessage to request TLS.
pub const SSL_REQUEST_CODE: i32 = 80_877_103;

/// GSSAPI encryption request code.
pub const GSSENC_REQUEST_CODE: i32 = 80_877_104;

/// Cancel request code, sent on a fresh connection to cancel a running query.
pub const CANCEL_REQUEST_CODE: i32 = 80_877_102;

/// The parsed form of the first, tag-less frame on a connection.
#[derive(Debug, Clone)]
pub enum StartupRequest<'a> {
    /// Client asks to negotiate TLS before anything else. TLS itself is an
    /// external collaborator (§1); this engine only recognizes the request.
    SslRequest,
    /// Client asks to negotiate GSSAPI encryption.
    GssEncRequest,
    /// Client wants to cancel a query running on another connection with
    /// the given backend process id and secret key.
    CancelRequest { pid: u32, secret_key: u32 },
    /// Ordinary startup: protocol version plus a list of name/value
    /// parameters (`user` is always present; `database`, `options`,
    /// `application_name`, etc. are optional).
    Startup {
        version: i32,
        params: Vec<(&'a str, &'a str)>,
    },
}

impl<'a> StartupRequest<'a> {
    /// Parse the payload of the startup frame (the frame's length field has
    /// already been consumed by the framer).
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (code_or_version, rest) = read_i32(payload)?;
        match code_or_version {
            SSL_REQUEST_CODE => Ok(StartupRequest::SslRequest),
            GSSENC_REQUEST_CODE => Ok(StartupRequest::GssEncRequest),
            CANCEL_REQUEST_CODE => {
                let (pid, rest) = crate::protocol::codec::read_u32(rest)?;
                let (secret_key, _) = crate::protocol::codec::read_u32(rest)?;
                Ok(StartupRequest::CancelRequest { pid, secret_key })
            }
            version => {
                let mut params = Vec::new();
                let mut data = rest;
                while !data.is_empty() && data[0] != 0 {
                    let (name, remaining) = read_cstr(data)?;
                    let (value, remaining) = read_cstr(remaining)?;
                    params.push((name, value));
                    data = remaining;
                }
                if data.is_empty() {
                    return Err(Error::wire(
                        SqlState::ProtocolViolation,
                        "StartupMessage: missing terminating null byte",
                    ));
                }
                Ok(StartupRequest::Startup { version, params })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::MessageBuilder;

    #[test]
    fn parses_startup_params() {
        let mut buf = Vec::new();
        let mut msg = MessageBuilder::new_startup(&mut buf);
        msg.write_i32(PROTOCOL_VERSION_3_0);
        msg.write_cstr("user");
        msg.write_cstr("postgres");
        msg.write_cstr("database");
        msg.write_cstr("mydb");
        msg.write_u8(0);
        msg.finish();

        // framer already stripped the leading length field
        let payload = &buf[4..];
        match StartupRequest::parse(payload).unwrap() {
            StartupRequest::Startup { version, params } => {
                assert_eq!(version, PROTOCOL_VERSION_3_0);
                assert_eq!(params, vec![("user", "postgres"), ("database", "mydb")]);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn parses_ssl_request() {
        let mut buf = Vec::new();
        let mut msg = MessageBuilder::new_startup(&mut buf);
        msg.write_i32(SSL_REQUEST_CODE);
        msg.finish();

        assert!(matches!(
            StartupRequest::parse(&buf[4..]).unwrap(),
            StartupRequest::SslRequest
        ));
    }

    #[test]
    fn parses_cancel_request() {
        let mut buf = Vec::new();
        let mut msg = MessageBuilder::new_startup(&mut buf);
        msg.write_i32(CANCEL_REQUEST_CODE);
        msg.write_i32(42);
        msg.write_i32(1234);
        msg.finish();

        match StartupRequest::parse(&buf[4..]).unwrap() {
            StartupRequest::CancelRequest { pid, secret_key } => {
                assert_eq!(pid, 42);
                assert_eq!(secret_key, 1234);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}

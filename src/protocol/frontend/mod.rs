//! Frontend (client → server) message parsing.

pub mod copy;
pub mod extended;
pub mod simple;

use crate::error::{Error, Result, SqlState};

/// Frontend message type byte constants.
pub mod msg_type {
    pub const PASSWORD: u8 = b'p';
    pub const QUERY: u8 = b'Q';
    pub const PARSE: u8 = b'P';
    pub const BIND: u8 = b'B';
    pub const EXECUTE: u8 = b'E';
    pub const DESCRIBE: u8 = b'D';
    pub const CLOSE: u8 = b'C';
    pub const SYNC: u8 = b'S';
    pub const FLUSH: u8 = b'H';
    pub const FUNCTION_CALL: u8 = b'F';
    pub const COPY_DATA: u8 = b'd';
    pub const COPY_DONE: u8 = b'c';
    pub const COPY_FAIL: u8 = b'f';
    pub const TERMINATE: u8 = b'X';
}

pub use copy::{CopyDone as FrontendCopyDone, CopyFail, CopyData as FrontendCopyData};
pub use extended::{Bind, Close, Describe, Execute, Parse};

/// Any possible frontend message once the session is past the startup
/// phase, tagged by its frame type byte (Design Note §9: "a flat tag +
/// switch keeps the state machine legible").
#[derive(Debug)]
pub enum FrontendMessage<'a> {
    Password(&'a [u8]),
    Query(&'a str),
    Parse(Parse<'a>),
    Bind(Bind<'a>),
    Describe(Describe<'a>),
    Execute(Execute<'a>),
    Close(Close<'a>),
    Sync,
    Flush,
    CopyData(&'a [u8]),
    CopyDone,
    CopyFail(&'a str),
    Terminate,
}

impl<'a> FrontendMessage<'a> {
    /// Parse a frontend message given its type byte and payload, as
    /// produced by the wire framer.
    pub fn parse(tag: u8, payload: &'a [u8]) -> Result<Self> {
        match tag {
            msg_type::PASSWORD => Ok(FrontendMessage::Password(payload)),
            msg_type::QUERY => {
                let (text, _) = crate::protocol::codec::read_cstr(payload)?;
                Ok(FrontendMessage::Query(text))
            }
            msg_type::PARSE => Ok(FrontendMessage::Parse(Parse::parse(payload)?)),
            msg_type::BIND => Ok(FrontendMessage::Bind(Bind::parse(payload)?)),
            msg_type::DESCRIBE => Ok(FrontendMessage::Describe(Describe::parse(payload)?)),
            msg_type::EXECUTE => Ok(FrontendMessage::Execute(Execute::parse(payload)?)),
            msg_type::CLOSE => Ok(FrontendMessage::Close(Close::parse(payload)?)),
            msg_type::SYNC => Ok(FrontendMessage::Sync),
            msg_type::FLUSH => Ok(FrontendMessage::Flush),
            msg_type::COPY_DATA => Ok(FrontendMessage::CopyData(copy::CopyData::parse(payload)?.0)),
            msg_type::COPY_DONE => Ok(FrontendMessage::CopyDone),
            msg_type::COPY_FAIL => {
                let (message, _) = crate::protocol::codec::read_cstr(payload)?;
                Ok(FrontendMessage::CopyFail(message))
            }
            msg_type::TERMINATE => Ok(FrontendMessage::Terminate),
            other => Err(Error::wire(
                SqlState::ProtocolViolation,
                format!("unknown frontend message tag: {:?}", other as char),
            )),
        }
    }
}

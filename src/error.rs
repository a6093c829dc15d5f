//! Error types for pg-wire-adapter.
//!
//! The crate distinguishes two error shapes: [`Error`], the ordinary Rust
//! failure type used by internal APIs, and [`WireError`], which carries
//! exactly the fields needed to build an `ErrorResponse`/`NoticeResponse`
//! wire frame (severity, SQLSTATE, message, detail, hint, position).

use thiserror::Error;

/// Result type for pg-wire-adapter operations.
pub type Result<T> = core::result::Result<T, Error>;

/// SQLSTATE error codes used by the engine.
///
/// Codes the engine itself assigns are named constants; codes surfaced
/// verbatim from the backend driver are carried as [`SqlState::Other`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlState {
    /// `08P01` — malformed frame, unexpected frame in current state, unknown message tag.
    ProtocolViolation,
    /// `22P02` — parameter or literal could not be parsed as the target type.
    InvalidTextRepresentation,
    /// `22003` — numeric value out of the representable range.
    NumericValueOutOfRange,
    /// `22007` — date/timestamp text could not be parsed.
    InvalidDatetimeFormat,
    /// `26000` — Bind/Describe/Close/Execute referenced an unknown statement name.
    InvalidSqlStatementName,
    /// `34000` — reference to an unknown cursor/portal name.
    InvalidCursorName,
    /// `25P02` — statement issued while the transaction is in the failed state.
    InFailedSqlTransaction,
    /// `25001` — operation not valid inside an active transaction block.
    ActiveSqlTransaction,
    /// `22P04` — malformed COPY input data.
    BadCopyFileFormat,
    /// `54000` — a configured limit (e.g. COPY mutation ceiling) was exceeded.
    ProgramLimitExceeded,
    /// `42704` — unrecognized session parameter name.
    UndefinedObject,
    /// `42601` — syntax not accepted by the adapter (e.g. multi-statement Parse).
    SyntaxError,
    /// Verbatim code surfaced from the backend driver or an otherwise unmapped condition.
    Other(String),
}

impl SqlState {
    /// The five-character SQLSTATE code as written on the wire.
    pub fn code(&self) -> &str {
        match self {
            SqlState::ProtocolViolation => "08P01",
            SqlState::InvalidTextRepresentation => "22P02",
            SqlState::NumericValueOutOfRange => "22003",
            SqlState::InvalidDatetimeFormat => "22007",
            SqlState::InvalidSqlStatementName => "26000",
            SqlState::InvalidCursorName => "34000",
            SqlState::InFailedSqlTransaction => "25P02",
            SqlState::ActiveSqlTransaction => "25001",
            SqlState::BadCopyFileFormat => "22P04",
            SqlState::ProgramLimitExceeded => "54000",
            SqlState::UndefinedObject => "42704",
            SqlState::SyntaxError => "42601",
            SqlState::Other(code) => code,
        }
    }

    /// Construct from a backend-reported code, reusing a named variant when it matches.
    pub fn from_backend_code(code: impl Into<String>) -> Self {
        let code = code.into();
        match code.as_str() {
            "08P01" => SqlState::ProtocolViolation,
            "22P02" => SqlState::InvalidTextRepresentation,
            "22003" => SqlState::NumericValueOutOfRange,
            "22007" => SqlState::InvalidDatetimeFormat,
            "26000" => SqlState::InvalidSqlStatementName,
            "34000" => SqlState::InvalidCursorName,
            "25P02" => SqlState::InFailedSqlTransaction,
            "25001" => SqlState::ActiveSqlTransaction,
            "22P04" => SqlState::BadCopyFileFormat,
            "54000" => SqlState::ProgramLimitExceeded,
            "42704" => SqlState::UndefinedObject,
            "42601" => SqlState::SyntaxError,
            _ => SqlState::Other(code),
        }
    }
}

/// Everything needed to build an `ErrorResponse` or `NoticeResponse` frame.
#[derive(Debug, Clone)]
pub struct WireError {
    /// `ERROR`, `FATAL`, `PANIC`, or (for notices) `WARNING`/`NOTICE`/`DEBUG`/`INFO`/`LOG`.
    pub severity: &'static str,
    /// SQLSTATE tag.
    pub sqlstate: SqlState,
    /// Primary human-readable message.
    pub message: String,
    /// Optional secondary detail.
    pub detail: Option<String>,
    /// Optional suggestion for fixing the error.
    pub hint: Option<String>,
    /// Optional 1-based cursor position into the offending query text.
    pub position: Option<u32>,
}

impl WireError {
    /// Build an `ERROR`-severity wire error from a SQLSTATE and message.
    pub fn new(sqlstate: SqlState, message: impl Into<String>) -> Self {
        Self {
            severity: "ERROR",
            sqlstate,
            message: message.into(),
            detail: None,
            hint: None,
            position: None,
        }
    }

    /// Attach a detail line.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attach a hint line.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach a cursor position.
    #[must_use]
    pub fn with_position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }

    /// Mark this error as connection-fatal (`FATAL` severity).
    #[must_use]
    pub fn fatal(mut self) -> Self {
        self.severity = "FATAL";
        self
    }
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} (SQLSTATE {})",
            self.severity,
            self.message,
            self.sqlstate.code()
        )?;
        if let Some(detail) = &self.detail {
            write!(f, "\nDETAIL: {detail}")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\nHINT: {hint}")?;
        }
        Ok(())
    }
}

/// Error type for pg-wire-adapter.
#[derive(Debug, Error)]
pub enum Error {
    /// An error destined to become a wire `ErrorResponse`.
    #[error("{0}")]
    Wire(WireError),

    /// Malformed frame below the protocol level; the framer's contract is
    /// that these terminate the session with no `ErrorResponse` (§7).
    #[error("framer error: {0}")]
    Framer(String),

    /// The backend driver collaborator reported a failure.
    #[error("backend error: {0}")]
    Backend(WireError),

    /// Programmer misuse of this crate's API (not a protocol condition).
    #[error("invalid usage: {0}")]
    InvalidUsage(String),
}

impl Error {
    /// Shorthand for a `Wire` error with `ERROR` severity.
    pub fn wire(sqlstate: SqlState, message: impl Into<String>) -> Self {
        Error::Wire(WireError::new(sqlstate, message))
    }

    /// The SQLSTATE this error maps to, if any.
    pub fn sqlstate(&self) -> Option<&SqlState> {
        match self {
            Error::Wire(e) | Error::Backend(e) => Some(&e.sqlstate),
            Error::Framer(_) | Error::InvalidUsage(_) => None,
        }
    }

    /// Returns true when this error, per §7, should terminate the session
    /// without emitting an `ErrorResponse`.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(self, Error::Framer(_))
            || matches!(self, Error::Wire(e) | Error::Backend(e) if e.severity == "FATAL" || e.severity == "PANIC")
    }
}

impl<Src: std::fmt::Debug, Dst: std::fmt::Debug + ?Sized> From<zerocopy::error::CastError<Src, Dst>>
    for Error
{
    fn from(err: zerocopy::error::CastError<Src, Dst>) -> Self {
        Error::Framer(format!("zerocopy cast error: {err:?}"))
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}

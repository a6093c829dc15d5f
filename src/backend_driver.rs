//! `BackendDriver` (§6): the abstract non-PostgreSQL SQL backend a session
//! drives. This crate only consumes the trait — a concrete implementation
//! (the actual backend connection) is an external collaborator, same as
//! the teacher's split between its protocol engine and `sync`/`tokio`
//! transport.

use crate::error::Result;
use crate::protocol::types::Oid;
use crate::value::Value;

/// Metadata for one result-set column, enough to build a `RowDescription`.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub type_oid: Oid,
}

/// Either shape `execute` can return: a row set, or a bare update count
/// for DML/DDL that produces no rows (§6).
#[derive(Debug, Clone)]
pub enum ExecuteOutcome {
    Rows { columns: Vec<ColumnInfo>, rows: Vec<Vec<Option<Value>>> },
    UpdateCount(u64),
}

/// One statement and its already-decoded parameters, as accumulated by the
/// session engine's batching policy (§4.4.3) before being forwarded to the
/// backend as a unit.
#[derive(Debug, Clone)]
pub struct BatchStatement<'a> {
    pub sql: &'a str,
    pub params: Vec<Option<Value>>,
}

/// The SQL backend contract a session drives (§6). Implementations surface
/// backend failures as [`crate::Error::Backend`] carrying the backend's own
/// SQLSTATE and message, passed through verbatim per §7.
pub trait BackendDriver {
    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;

    fn execute(&mut self, sql: &str, params: &[Option<Value>]) -> Result<ExecuteOutcome>;

    /// Runs a batch of DML statements as one backend round-trip and
    /// returns one outcome per statement, in order, so a failure partway
    /// through the batch doesn't hide the update counts of the statements
    /// that already succeeded (§4.4.3 partial-batch-failure semantics). The
    /// outer `Result` is for failures of the round-trip itself (e.g. the
    /// connection dropped before any statement could run).
    fn execute_batch(&mut self, statements: &[BatchStatement<'_>]) -> Result<Vec<Result<u64>>>;

    fn set_session_parameter(&mut self, name: &str, value: &str) -> Result<()>;
    fn get_session_parameter(&mut self, name: &str) -> Result<Option<String>>;

    fn open_read_only_transaction(&mut self) -> Result<()>;

    /// Aborts any in-flight operation at the next safe point (§5 Cancellation).
    fn issue_abort(&mut self) -> Result<()>;
}

//! Bridges the wire-level COPY IN substate (§4.4.1) to the COPY decoder in
//! [`crate::copy`]. This buffers the whole stream and parses it on
//! `CopyDone` rather than row-by-row as `CopyData` frames arrive, since the
//! `BackendDriver` contract has no partial-commit primitive to stream into
//! incrementally anyway.

use crate::backend_driver::{BackendDriver, BatchStatement};
use crate::copy::{CopyStatement, Format, MUTATION_LIMIT, binary, csv, text};
use crate::error::{Error, Result, SqlState};
use crate::session::params::AutocommitDmlMode;

/// Statements are dispatched to the backend in chunks of this many rows so
/// a non-atomic COPY can commit incrementally (§4.5).
const PARTITION_SIZE: usize = 500;

pub struct CopyInState {
    statement: CopyStatement,
    autocommit_mode: AutocommitDmlMode,
    buffer: Vec<u8>,
    /// Set by the session engine when this COPY was started from a simple
    /// `Query` message rather than the extended-query pipeline, so the
    /// caller knows whether it must emit its own `ReadyForQuery`.
    pub via_simple_query: bool,
}

impl CopyInState {
    pub fn new(statement: CopyStatement, autocommit_mode: AutocommitDmlMode) -> Self {
        Self { statement, autocommit_mode, buffer: Vec::new(), via_simple_query: false }
    }

    pub fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Parses the buffered stream, checks the mutation ceiling, and
    /// dispatches insert statements to `backend`. Returns the number of
    /// rows written.
    pub fn finish<B: BackendDriver>(&mut self, backend: &mut B) -> Result<u64> {
        let rows = match self.statement.format {
            Format::Text => text::decode_rows(&self.buffer, self.statement.delimiter, &self.statement.null_string)?,
            Format::Csv => csv::decode_rows(
                &self.buffer,
                self.statement.delimiter,
                &self.statement.null_string,
                self.statement.csv_header,
            )?,
            Format::Binary => binary::decode_rows(&self.buffer)?,
        };

        if rows.is_empty() {
            return Ok(0);
        }

        let columns = if self.statement.columns.is_empty() { rows[0].len() } else { self.statement.columns.len() };
        let mutations = rows.len() as u64 * columns.max(1) as u64;

        if self.autocommit_mode == AutocommitDmlMode::Transactional && mutations > MUTATION_LIMIT {
            return Err(Error::wire(
                SqlState::ProgramLimitExceeded,
                format!(
                    "COPY would write {mutations} mutations, exceeding the {MUTATION_LIMIT} limit for an atomic transaction"
                ),
            )
            .into_wire_with_hint("set spanner.autocommit_dml_mode = 'partitioned_non_atomic' to COPY this many rows"));
        }

        let insert_sql = build_insert_sql(&self.statement, columns);
        let partitioned = self.autocommit_mode == AutocommitDmlMode::PartitionedNonAtomic;

        if !partitioned {
            backend.begin()?;
        }

        let mut written = 0u64;
        for chunk in rows.chunks(PARTITION_SIZE) {
            let batch: Vec<BatchStatement<'_>> =
                chunk.iter().map(|row| BatchStatement { sql: &insert_sql, params: row.clone() }).collect();
            let outcomes = match backend.execute_batch(&batch) {
                Ok(outcomes) => outcomes,
                Err(err) => {
                    if !partitioned {
                        let _ = backend.rollback();
                    }
                    return Err(err);
                }
            };
            for outcome in outcomes {
                match outcome {
                    Ok(_) => written += 1,
                    Err(err) => {
                        if !partitioned {
                            let _ = backend.rollback();
                        }
                        return Err(err);
                    }
                }
            }
        }

        if !partitioned {
            backend.commit()?;
        }

        Ok(written)
    }
}

fn build_insert_sql(statement: &CopyStatement, column_count: usize) -> String {
    let n = if statement.columns.is_empty() { column_count } else { statement.columns.len() };
    let placeholders = (1..=n).map(|i| format!("${i}")).collect::<Vec<_>>().join(", ");
    if statement.columns.is_empty() {
        format!("INSERT INTO {} VALUES ({placeholders})", statement.table)
    } else {
        format!("INSERT INTO {} ({}) VALUES ({placeholders})", statement.table, statement.columns.join(", "))
    }
}

trait WithHint {
    fn into_wire_with_hint(self, hint: &str) -> Error;
}

impl WithHint for Error {
    fn into_wire_with_hint(self, hint: &str) -> Error {
        match self {
            Error::Wire(e) => Error::Wire(e.with_hint(hint)),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend_driver::ExecuteOutcome;
    use crate::copy::{Direction, parse_copy_statement};
    use crate::value::Value;

    #[derive(Default)]
    struct CountingBackend {
        batches: usize,
    }

    impl BackendDriver for CountingBackend {
        fn begin(&mut self) -> Result<()> {
            Ok(())
        }
        fn commit(&mut self) -> Result<()> {
            Ok(())
        }
        fn rollback(&mut self) -> Result<()> {
            Ok(())
        }
        fn execute(&mut self, _sql: &str, _params: &[Option<Value>]) -> Result<ExecuteOutcome> {
            Ok(ExecuteOutcome::UpdateCount(0))
        }
        fn execute_batch(&mut self, statements: &[BatchStatement<'_>]) -> Result<Vec<Result<u64>>> {
            self.batches += 1;
            Ok(statements.iter().map(|_| Ok(1)).collect())
        }
        fn set_session_parameter(&mut self, _name: &str, _value: &str) -> Result<()> {
            Ok(())
        }
        fn get_session_parameter(&mut self, _name: &str) -> Result<Option<String>> {
            Ok(None)
        }
        fn open_read_only_transaction(&mut self) -> Result<()> {
            Ok(())
        }
        fn issue_abort(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn decodes_and_dispatches_small_text_copy() {
        let statement = parse_copy_statement("COPY t (a, b) FROM STDIN").unwrap();
        assert_eq!(statement.direction, Direction::In);
        let mut state = CopyInState::new(statement, AutocommitDmlMode::Transactional);
        state.feed(b"1\tAlice\n2\tBob\n");
        let mut backend = CountingBackend::default();
        let written = state.finish(&mut backend).unwrap();
        assert_eq!(written, 2);
        assert_eq!(backend.batches, 1);
    }

    #[test]
    fn atomic_mode_rejects_over_mutation_limit() {
        let statement = parse_copy_statement("COPY t (a, b, c, d) FROM STDIN").unwrap();
        let mut state = CopyInState::new(statement, AutocommitDmlMode::Transactional);
        let mut line = Vec::new();
        for i in 0..6000 {
            line.extend_from_slice(format!("{i}\tx\ty\tz\n").as_bytes());
        }
        state.feed(&line);
        let mut backend = CountingBackend::default();
        let err = state.finish(&mut backend).unwrap_err();
        assert_eq!(err.sqlstate().unwrap().code(), "54000");
    }

    #[test]
    fn partitioned_mode_commits_in_chunks() {
        let statement = parse_copy_statement("COPY t (a) FROM STDIN").unwrap();
        let mut state = CopyInState::new(statement, AutocommitDmlMode::PartitionedNonAtomic);
        let mut line = Vec::new();
        for i in 0..1200 {
            line.extend_from_slice(format!("{i}\n").as_bytes());
        }
        state.feed(&line);
        let mut backend = CountingBackend::default();
        let written = state.finish(&mut backend).unwrap();
        assert_eq!(written, 1200);
        assert_eq!(backend.batches, 3);
    }
}

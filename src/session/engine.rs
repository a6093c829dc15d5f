//! Session Engine (§4.4): the per-session protocol state machine driving
//! simple-query and extended-query execution, transaction state, and
//! backend dispatch batching.
//!
//! This is sans-I/O: [`Session::handle_message`] consumes one already-framed
//! message and appends wire bytes to an internal buffer drained with
//! [`Session::take_output`]. A driver loop owns the socket, the framer, and
//! feeding messages in.

use std::collections::HashMap;

use crate::backend_driver::{BackendDriver, BatchStatement, ColumnInfo, ExecuteOutcome};
use crate::classifier::{self, Category};
use crate::error::{Error, Result, SqlState};
use crate::intercept;
use crate::protocol::backend::copy as backend_copy;
use crate::protocol::backend::error::write_error_response;
use crate::protocol::backend::extended as backend_extended;
use crate::protocol::backend::query::{self as backend_query, FieldDescriptor};
use crate::protocol::backend::startup as backend_startup;
use crate::protocol::frontend::extended::TargetKind;
use crate::protocol::frontend::{Bind, Close, Describe, Execute, FrontendMessage, Parse};
use crate::protocol::types::{FormatCode, oid};
use crate::value::{self, Value};

use super::copy_state::CopyInState;
use super::params::SessionParams;
use super::portal::{MaterializedResult, Portal, PortalCursor};
use super::queue::PendingBatch;
use super::statement::NamedStatement;
use super::transaction::TransactionState;

/// Above this many queued DML statements, a batch is dispatched even absent
/// another trigger (§4.4.3 batch-ceiling knob).
const BATCH_CEILING: usize = 64;

/// Protocol state (§4.4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    Startup,
    Ready,
    Busy,
    CopyIn,
    CopyOut,
    Terminated,
}

/// A materialized result's rows, deferred for the session's DataRow writer.
struct RowSet {
    columns: Vec<ColumnInfo>,
    rows: Vec<Vec<Option<Value>>>,
}

pub struct Session<B: BackendDriver> {
    backend: B,
    params: SessionParams,
    tx_state: TransactionState,
    statements: HashMap<String, NamedStatement>,
    portals: HashMap<String, Portal>,
    batch: PendingBatch,
    state: ProtocolState,
    request_seq: u64,
    output: Vec<u8>,
    /// Set once an error occurs mid-extended-pipeline; further Parse/Bind/
    /// Describe/Execute/Close are silently skipped until the next Sync (§4.4.2).
    suppress_until_sync: bool,
    copy_in: Option<CopyInState>,
}

impl<B: BackendDriver> Session<B> {
    pub fn new(backend: B, params: SessionParams) -> Self {
        Self {
            backend,
            params,
            tx_state: TransactionState::default(),
            statements: HashMap::new(),
            portals: HashMap::new(),
            batch: PendingBatch::default(),
            state: ProtocolState::Startup,
            request_seq: 0,
            output: Vec::new(),
            suppress_until_sync: false,
            copy_in: None,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Drain bytes accumulated for the client since the last call.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    /// Announce negotiated parameters and the cancellation key, then enter
    /// `Ready`. The authentication handshake itself is out of scope; the
    /// driver calls this once it completes.
    pub fn enter_ready(&mut self, pid: u32, secret_key: u32) {
        for (name, value) in [
            ("client_encoding", self.params.client_encoding.clone()),
            ("DateStyle", self.params.date_style.clone()),
            ("TimeZone", self.params.time_zone.clone()),
            ("application_name", self.params.application_name.clone()),
            ("server_version", "14.0".to_string()),
        ] {
            backend_startup::write_parameter_status(&mut self.output, name, &value);
        }
        backend_startup::write_backend_key_data(&mut self.output, pid, secret_key);
        self.state = ProtocolState::Ready;
        backend_startup::write_ready_for_query(&mut self.output, self.tx_state.to_wire());
    }

    /// Handle one already-framed message. `tag` is the frame's type byte.
    pub fn handle_message(&mut self, tag: u8, payload: &[u8]) -> Result<()> {
        self.request_seq += 1;

        if let Some(copy_state) = self.copy_in.take() {
            return self.handle_copy_in_message(copy_state, tag, payload);
        }

        let message = FrontendMessage::parse(tag, payload)?;
        match message {
            FrontendMessage::Query(sql) => self.handle_simple_query(sql),
            FrontendMessage::Parse(p) => self.handle_parse(p),
            FrontendMessage::Bind(b) => self.handle_bind(b),
            FrontendMessage::Describe(d) => self.handle_describe(d),
            FrontendMessage::Execute(e) => self.handle_execute(e),
            FrontendMessage::Close(c) => self.handle_close(c),
            FrontendMessage::Sync => self.handle_sync(),
            FrontendMessage::Flush => self.handle_flush(),
            FrontendMessage::Terminate => {
                self.state = ProtocolState::Terminated;
                Ok(())
            }
            FrontendMessage::Password(_) => Err(Error::wire(
                SqlState::ProtocolViolation,
                "unexpected Password message outside the authentication handshake",
            )),
            FrontendMessage::CopyData(_) | FrontendMessage::CopyDone | FrontendMessage::CopyFail(_) => {
                Err(Error::wire(SqlState::ProtocolViolation, "unexpected COPY message outside a COPY stream"))
            }
        }
    }

    // ---- simple query ----------------------------------------------------

    fn handle_simple_query(&mut self, sql: &str) -> Result<()> {
        self.state = ProtocolState::Busy;
        let statements = classifier::split_statements(sql);

        if statements.is_empty() {
            backend_query::write_empty_query_response(&mut self.output);
            self.finish_request();
            return Ok(());
        }

        // A COPY FROM STDIN suspends the request/response cycle until CopyDone
        // arrives on a later frame, which this single-threaded loop can't
        // represent mid-transaction; skip implicit-transaction wrapping for
        // any string containing one.
        let contains_copy = statements.iter().any(|s| classifier::classify(s).category == Category::Copy);
        let opened_implicit_txn = statements.len() > 1 && !contains_copy && !self.tx_state.is_in_transaction();
        if opened_implicit_txn {
            self.backend.begin()?;
        }

        let mut aborted = false;
        for stmt_sql in &statements {
            let classified = classifier::classify(stmt_sql);

            if self.tx_state.is_failed() && !is_transaction_recovery(classified.category, stmt_sql) {
                self.emit_error(Error::wire(
                    SqlState::InFailedSqlTransaction,
                    "current transaction is aborted, commands ignored until end of transaction block",
                ));
                aborted = true;
                break;
            }

            if classified.category == Category::Copy {
                match crate::copy::parse_copy_statement(&classified.rewritten) {
                    Ok(copy_stmt) if copy_stmt.direction == crate::copy::Direction::In => {
                        self.begin_copy_in(copy_stmt);
                        if let Some(state) = self.copy_in.as_mut() {
                            state.via_simple_query = true;
                        }
                        return Ok(());
                    }
                    Ok(copy_stmt) => match self.run_copy_out(&classified.rewritten, &copy_stmt) {
                        Ok(tag) => {
                            backend_query::write_command_complete(&mut self.output, &tag);
                            continue;
                        }
                        Err(err) => {
                            self.tx_state = self.tx_state.fail();
                            self.emit_error(err);
                            aborted = true;
                            break;
                        }
                    },
                    Err(err) => {
                        self.tx_state = self.tx_state.fail();
                        self.emit_error(err);
                        aborted = true;
                        break;
                    }
                }
            }

            match self.dispatch_immediate(&classified, &[]) {
                Ok((tag, rows)) => {
                    if let Some(rows) = rows {
                        self.write_rows(&rows, &default_text_formats(rows.columns.len()));
                    }
                    backend_query::write_command_complete(&mut self.output, &tag);
                }
                Err(err) => {
                    self.tx_state = self.tx_state.fail();
                    self.emit_error(err);
                    aborted = true;
                    break;
                }
            }
        }

        if opened_implicit_txn {
            if aborted {
                let _ = self.backend.rollback();
            } else {
                self.backend.commit()?;
            }
        }

        self.state = ProtocolState::Ready;
        backend_startup::write_ready_for_query(&mut self.output, self.tx_state.to_wire());
        Ok(())
    }

    // ---- extended query ----------------------------------------------------

    fn handle_parse(&mut self, p: Parse<'_>) -> Result<()> {
        if self.suppress_until_sync {
            return Ok(());
        }
        if classifier::split_statements(p.query).len() > 1 {
            self.emit_error(Error::wire(
                SqlState::SyntaxError,
                "cannot insert multiple commands into a prepared statement",
            ));
            self.suppress_until_sync = true;
            return Ok(());
        }
        let stmt = NamedStatement::new(p.name, p.query, p.param_type_oids.clone());
        self.statements.insert(p.name.to_string(), stmt);
        backend_extended::write_parse_complete(&mut self.output);
        Ok(())
    }

    fn handle_bind(&mut self, b: Bind<'_>) -> Result<()> {
        if self.suppress_until_sync {
            return Ok(());
        }
        let stmt = self.statements.get(b.statement).ok_or_else(|| {
            Error::wire(SqlState::InvalidSqlStatementName, format!("statement {:?} does not exist", b.statement))
        });
        let stmt = match stmt {
            Ok(s) => s,
            Err(e) => {
                self.emit_error(e);
                self.suppress_until_sync = true;
                return Ok(());
            }
        };

        let mut param_values = Vec::with_capacity(b.param_values.len());
        for (i, raw) in b.param_values.iter().enumerate() {
            let type_oid = stmt.inferred_param_types.get(i).copied().unwrap_or(oid::TEXT);
            let decoded = match raw {
                None => Ok(None),
                Some(bytes) => match b.param_format(i) {
                    FormatCode::Text => value::decode_text(bytes, type_oid).map(Some),
                    FormatCode::Binary => value::decode_binary(bytes, type_oid).map(Some),
                },
            };
            match decoded {
                Ok(v) => param_values.push(v),
                Err(e) => {
                    self.emit_error(e);
                    self.suppress_until_sync = true;
                    return Ok(());
                }
            }
        }

        let result_formats = b.raw_result_formats().to_vec();
        let portal = Portal::new(b.portal, b.statement, param_values, Vec::new(), result_formats);
        self.portals.insert(b.portal.to_string(), portal);
        backend_extended::write_bind_complete(&mut self.output);
        Ok(())
    }

    fn handle_describe(&mut self, d: Describe<'_>) -> Result<()> {
        if self.suppress_until_sync {
            return Ok(());
        }
        match d.kind {
            TargetKind::Statement => {
                let stmt = match self.statements.get(d.name) {
                    Some(s) => s,
                    None => {
                        self.emit_error(Error::wire(
                            SqlState::InvalidSqlStatementName,
                            format!("statement {:?} does not exist", d.name),
                        ));
                        self.suppress_until_sync = true;
                        return Ok(());
                    }
                };
                backend_extended::write_parameter_description(&mut self.output, &stmt.inferred_param_types);
                // Result columns for a statement aren't known without running it
                // (this engine has no catalog to consult ahead of execution).
                backend_extended::write_no_data(&mut self.output);
            }
            TargetKind::Portal => {
                let portal = match self.portals.get(d.name) {
                    Some(p) => p,
                    None => {
                        self.emit_error(Error::wire(
                            SqlState::InvalidCursorName,
                            format!("portal {:?} does not exist", d.name),
                        ));
                        self.suppress_until_sync = true;
                        return Ok(());
                    }
                };
                match &portal.cursor {
                    PortalCursor::Suspended(result) if !result.columns.is_empty() => {
                        let columns = result.columns.clone();
                        self.write_row_description(&columns, portal.name.clone());
                    }
                    _ => backend_extended::write_no_data(&mut self.output),
                }
            }
        }
        Ok(())
    }

    fn handle_execute(&mut self, e: Execute<'_>) -> Result<()> {
        if self.suppress_until_sync {
            return Ok(());
        }

        let Some(portal) = self.portals.get(e.portal).cloned() else {
            self.emit_error(Error::wire(SqlState::InvalidCursorName, format!("portal {:?} does not exist", e.portal)));
            self.suppress_until_sync = true;
            return Ok(());
        };

        if let PortalCursor::Suspended(result) = &portal.cursor {
            let mut result = result.clone();
            self.drain_portal(&mut result, e.max_rows, &portal);
            self.portals.get_mut(e.portal).unwrap().cursor = if result.is_exhausted() {
                PortalCursor::Drained
            } else {
                PortalCursor::Suspended(result)
            };
            return Ok(());
        }

        if matches!(portal.cursor, PortalCursor::Drained) {
            return Ok(());
        }

        let Some(stmt) = self.statements.get(portal.statement_name.as_str()).cloned() else {
            self.emit_error(Error::wire(
                SqlState::InvalidSqlStatementName,
                format!("statement {:?} does not exist", portal.statement_name),
            ));
            self.suppress_until_sync = true;
            return Ok(());
        };

        if self.tx_state.is_failed() && !is_transaction_recovery(stmt.category, &stmt.rewritten_sql) {
            self.emit_error(Error::wire(
                SqlState::InFailedSqlTransaction,
                "current transaction is aborted, commands ignored until end of transaction block",
            ));
            self.suppress_until_sync = true;
            return Ok(());
        }

        if stmt.category == Category::Copy {
            return self.start_copy(&stmt, e.portal);
        }

        if stmt.category.is_dml() && self.batch.len() < BATCH_CEILING {
            self.batch.push(stmt.rewritten_sql.clone(), portal.param_values.clone(), stmt.category);
            self.portals.get_mut(e.portal).unwrap().cursor = PortalCursor::Drained;
            return Ok(());
        }

        match self.flush_batch() {
            Ok(()) => {}
            Err(err) => {
                self.tx_state = self.tx_state.fail();
                self.emit_error(err);
                self.suppress_until_sync = true;
                return Ok(());
            }
        }

        match self.dispatch_immediate(&classifier::Classified {
            category: stmt.category,
            rewritten: stmt.rewritten_sql.clone(),
            param_indices: Vec::new(),
        }, &portal.param_values) {
            Ok((tag, rows)) => {
                let cursor = match rows {
                    Some(RowSet { columns, rows }) if !columns.is_empty() || !rows.is_empty() => {
                        let mut materialized = MaterializedResult { columns, rows, cursor: 0 };
                        self.write_row_description(&materialized.columns, portal.name.clone());
                        self.drain_portal(&mut materialized, e.max_rows, &portal);
                        if materialized.is_exhausted() {
                            None
                        } else {
                            Some(PortalCursor::Suspended(materialized))
                        }
                    }
                    _ => {
                        backend_query::write_command_complete(&mut self.output, &tag);
                        None
                    }
                };
                let stored = self.portals.get_mut(e.portal).unwrap();
                stored.cursor = cursor.unwrap_or(PortalCursor::Drained);
            }
            Err(err) => {
                self.tx_state = self.tx_state.fail();
                self.emit_error(err);
                self.suppress_until_sync = true;
            }
        }
        Ok(())
    }

    /// Writes up to `max_rows` (0 = unbounded) rows from `result` starting at
    /// its cursor, then a trailing `CommandComplete` or `PortalSuspended`.
    fn drain_portal(&mut self, result: &mut MaterializedResult, max_rows: i32, portal: &Portal) {
        let limit = if max_rows <= 0 { result.rows.len() } else { max_rows as usize };
        let end = (result.cursor + limit).min(result.rows.len());
        let formats: Vec<FormatCode> = (0..result.columns.len().max(1)).map(|i| portal.result_format(i)).collect();
        for row in &result.rows[result.cursor..end] {
            self.write_data_row(row, &formats);
        }
        result.cursor = end;
        if result.is_exhausted() {
            let tag = backend_query::command_tag(Category::Select, result.rows.len() as u64);
            backend_query::write_command_complete(&mut self.output, &tag);
        } else {
            backend_extended::write_portal_suspended(&mut self.output);
        }
    }

    fn handle_close(&mut self, c: Close<'_>) -> Result<()> {
        if self.suppress_until_sync {
            return Ok(());
        }
        match c.kind {
            TargetKind::Statement => {
                self.statements.remove(c.name);
            }
            TargetKind::Portal => {
                self.portals.remove(c.name);
            }
        }
        backend_extended::write_close_complete(&mut self.output);
        Ok(())
    }

    fn handle_sync(&mut self) -> Result<()> {
        if let Err(err) = self.flush_batch() {
            self.tx_state = self.tx_state.fail();
            self.emit_error(err);
        }
        self.suppress_until_sync = false;
        self.state = ProtocolState::Ready;
        backend_startup::write_ready_for_query(&mut self.output, self.tx_state.to_wire());
        Ok(())
    }

    fn handle_flush(&mut self) -> Result<()> {
        if let Err(err) = self.flush_batch() {
            self.tx_state = self.tx_state.fail();
            self.emit_error(err);
            self.suppress_until_sync = true;
        }
        Ok(())
    }

    // ---- batching (§4.4.3) ----------------------------------------------

    fn flush_batch(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let queued = self.batch.drain();
        let batch_statements: Vec<BatchStatement<'_>> =
            queued.iter().map(|q| BatchStatement { sql: &q.sql, params: q.params.clone() }).collect();
        let outcomes = self.backend.execute_batch(&batch_statements)?;
        for (queued_stmt, outcome) in queued.iter().zip(outcomes) {
            let count = outcome?;
            let tag = backend_query::command_tag(queued_stmt.category, count);
            backend_query::write_command_complete(&mut self.output, &tag);
        }
        Ok(())
    }

    // ---- shared dispatch --------------------------------------------------

    /// Runs one statement against the backend (or the local-intercept
    /// catalogue, or the transaction/session-management handlers) and
    /// returns its command tag plus rows, if any. Used by both the
    /// simple-query loop and the extended-query Execute handler once any
    /// pending batch has been flushed.
    fn dispatch_immediate(
        &mut self,
        classified: &classifier::Classified,
        params: &[Option<Value>],
    ) -> Result<(String, Option<RowSet>)> {
        match classified.category {
            Category::TransactionControl => self.dispatch_transaction_control(&classified.rewritten).map(|tag| (tag, None)),
            Category::SessionManagement => self.dispatch_session_management(&classified.rewritten),
            Category::LocalIntercept => Ok(self.dispatch_local_intercept(&classified.rewritten)),
            Category::Ddl => {
                self.backend.execute(&classified.rewritten, params)?;
                Ok((ddl_command_tag(&classified.rewritten), None))
            }
            _ => {
                let outcome = self.backend.execute(&classified.rewritten, params)?;
                Ok(outcome_to_tag_and_rows(classified.category, outcome))
            }
        }
    }

    fn dispatch_transaction_control(&mut self, sql: &str) -> Result<String> {
        let keyword = sql.trim_start().split_whitespace().next().unwrap_or("").to_ascii_uppercase();
        match keyword.as_str() {
            "BEGIN" | "START" => {
                if !self.tx_state.is_in_transaction() {
                    self.backend.begin()?;
                }
                self.tx_state = self.tx_state.begin();
                Ok("BEGIN".to_string())
            }
            "COMMIT" | "END" => {
                self.backend.commit()?;
                self.tx_state = self.tx_state.end();
                Ok("COMMIT".to_string())
            }
            "ROLLBACK" | "ABORT" => {
                self.backend.rollback()?;
                self.tx_state = self.tx_state.end();
                Ok("ROLLBACK".to_string())
            }
            "SAVEPOINT" => {
                self.backend.execute(sql, &[])?;
                Ok("SAVEPOINT".to_string())
            }
            "RELEASE" => {
                self.backend.execute(sql, &[])?;
                Ok("RELEASE".to_string())
            }
            other => Err(Error::wire(SqlState::SyntaxError, format!("unrecognized transaction command: {other}"))),
        }
    }

    fn dispatch_session_management(&mut self, sql: &str) -> Result<(String, Option<RowSet>)> {
        let keyword = sql.trim_start().split_whitespace().next().unwrap_or("").to_ascii_uppercase();
        match keyword.as_str() {
            "SET" => {
                let (name, value) = parse_set_statement(sql)?;
                self.params.set(&name, &value)?;
                let _ = self.backend.set_session_parameter(&name, &value);
                Ok(("SET".to_string(), None))
            }
            "RESET" => {
                let name = sql.trim_start()["RESET".len()..].trim().trim_end_matches(';').trim();
                self.params.set(name, &SessionParams::default().get(name).unwrap_or_default())?;
                Ok(("RESET".to_string(), None))
            }
            "SHOW" => {
                let name = sql.trim_start()["SHOW".len()..].trim().trim_end_matches(';').trim();
                let value = self.params.get(name).ok_or_else(|| {
                    Error::wire(SqlState::UndefinedObject, format!("unrecognized configuration parameter {name:?}"))
                })?;
                let columns = vec![ColumnInfo { name: name.to_string(), type_oid: oid::TEXT }];
                let rows = vec![vec![Some(Value::Text(value))]];
                Ok(("SHOW".to_string(), Some(RowSet { columns, rows })))
            }
            other => Err(Error::wire(SqlState::SyntaxError, format!("unrecognized session command: {other}"))),
        }
    }

    fn dispatch_local_intercept(&self, sql: &str) -> (String, Option<RowSet>) {
        match intercept::lookup(sql) {
            Some(canned) => {
                let columns = canned
                    .fields
                    .iter()
                    .map(|(name, type_oid)| ColumnInfo { name: (*name).to_string(), type_oid: *type_oid })
                    .collect();
                let row_count = canned.rows.len() as u64;
                (backend_query::command_tag(Category::Select, row_count), Some(RowSet { columns, rows: canned.rows }))
            }
            None => (backend_query::command_tag(Category::Select, 0), Some(RowSet { columns: Vec::new(), rows: Vec::new() })),
        }
    }

    // ---- COPY (§4.5, detail in `crate::copy`) -----------------------------

    fn start_copy(&mut self, stmt: &NamedStatement, portal_name: &str) -> Result<()> {
        let copy_stmt = crate::copy::parse_copy_statement(&stmt.rewritten_sql)?;
        match copy_stmt.direction {
            crate::copy::Direction::In => {
                self.begin_copy_in(copy_stmt);
                self.portals.get_mut(portal_name).map(|p| p.cursor = PortalCursor::Drained);
                Ok(())
            }
            crate::copy::Direction::Out => {
                let tag = self.run_copy_out(&stmt.rewritten_sql, &copy_stmt)?;
                backend_query::write_command_complete(&mut self.output, &tag);
                self.portals.get_mut(portal_name).map(|p| p.cursor = PortalCursor::Drained);
                Ok(())
            }
        }
    }

    /// Writes `CopyInResponse` and transitions to the `CopyIn` substate.
    /// Further frontend messages are routed to `handle_copy_in_message`
    /// until `CopyDone`/`CopyFail` ends the stream.
    fn begin_copy_in(&mut self, copy_stmt: crate::copy::CopyStatement) {
        let column_formats = vec![copy_stmt.format.wire_format(); copy_stmt.columns.len().max(1)];
        backend_copy::write_copy_in_response(&mut self.output, copy_stmt.format.wire_format(), &column_formats);
        self.state = ProtocolState::CopyIn;
        self.copy_in = Some(CopyInState::new(copy_stmt, self.params.autocommit_dml_mode));
    }

    /// Runs a `COPY ... TO STDOUT`, streaming rows as `CopyData` frames, and
    /// returns the `COPY n` command tag.
    fn run_copy_out(&mut self, sql: &str, copy_stmt: &crate::copy::CopyStatement) -> Result<String> {
        let column_formats = vec![copy_stmt.format.wire_format(); copy_stmt.columns.len().max(1)];
        backend_copy::write_copy_out_response(&mut self.output, copy_stmt.format.wire_format(), &column_formats);
        let outcome = self.backend.execute(sql, &[])?;
        let row_count = match outcome {
            ExecuteOutcome::Rows { rows, .. } => {
                if copy_stmt.format == crate::copy::Format::Binary {
                    backend_copy::write_copy_data(&mut self.output, &crate::copy::binary::header());
                }
                for row in &rows {
                    let data = crate::copy::encode_copy_out_row(row, copy_stmt.format);
                    backend_copy::write_copy_data(&mut self.output, &data);
                }
                if copy_stmt.format == crate::copy::Format::Binary {
                    backend_copy::write_copy_data(&mut self.output, &crate::copy::binary::trailer());
                }
                rows.len() as u64
            }
            ExecuteOutcome::UpdateCount(n) => n,
        };
        backend_copy::write_copy_done(&mut self.output);
        Ok(backend_query::command_tag(Category::Copy, row_count))
    }

    fn handle_copy_in_message(&mut self, mut copy_state: CopyInState, tag: u8, payload: &[u8]) -> Result<()> {
        use crate::protocol::frontend::msg_type;
        match tag {
            msg_type::COPY_DATA => {
                copy_state.feed(payload);
                self.copy_in = Some(copy_state);
                Ok(())
            }
            msg_type::COPY_DONE => {
                self.state = ProtocolState::Busy;
                match copy_state.finish(&mut self.backend) {
                    Ok(rows_affected) => {
                        let tag = backend_query::command_tag(Category::Copy, rows_affected);
                        backend_query::write_command_complete(&mut self.output, &tag);
                    }
                    Err(err) => {
                        self.tx_state = self.tx_state.fail();
                        self.emit_error(err);
                    }
                }
                self.finish_copy(copy_state.via_simple_query);
                Ok(())
            }
            msg_type::COPY_FAIL => {
                let (message, _) = crate::protocol::codec::read_cstr(payload)?;
                self.state = ProtocolState::Busy;
                self.tx_state = self.tx_state.fail();
                self.emit_error(Error::wire(SqlState::BadCopyFileFormat, format!("COPY failed: {message}")));
                self.finish_copy(copy_state.via_simple_query);
                Ok(())
            }
            _ => Err(Error::wire(SqlState::ProtocolViolation, "unexpected message during COPY IN")),
        }
    }

    /// A COPY driven by the simple-query protocol owns its own
    /// `ReadyForQuery`, since no `Sync` follows it; one driven by the
    /// extended-query pipeline waits for the client's `Sync` as usual.
    fn finish_copy(&mut self, via_simple_query: bool) {
        self.state = ProtocolState::Ready;
        if via_simple_query {
            backend_startup::write_ready_for_query(&mut self.output, self.tx_state.to_wire());
        }
    }

    // ---- output helpers ----------------------------------------------------

    /// Writes an `ErrorResponse`, except for a framer-level error: per §7 a
    /// malformed frame terminates the session with no frame written at all.
    /// Any connection-fatal error (framer errors always are; `FATAL`/`PANIC`
    /// severity wire errors also are) ends the session.
    fn emit_error(&mut self, err: Error) {
        let fatal = err.is_connection_fatal();
        match err {
            Error::Framer(_) => {}
            Error::Wire(e) | Error::Backend(e) => write_error_response(&mut self.output, &e),
            Error::InvalidUsage(_) => {
                write_error_response(&mut self.output, &crate::error::WireError::new(SqlState::ProtocolViolation, "internal error"));
            }
        }
        if fatal {
            self.state = ProtocolState::Terminated;
        }
    }

    fn write_row_description(&mut self, columns: &[ColumnInfo], _portal_name: String) {
        let fields: Vec<FieldDescriptor<'_>> = columns
            .iter()
            .map(|c| FieldDescriptor {
                name: &c.name,
                table_oid: 0,
                column_id: 0,
                type_oid: c.type_oid,
                type_size: -1,
                type_modifier: -1,
                format: FormatCode::Text,
            })
            .collect();
        backend_query::write_row_description(&mut self.output, &fields);
    }

    fn write_rows(&mut self, rows: &RowSet, formats: &[FormatCode]) {
        self.write_row_description(&rows.columns, String::new());
        for row in &rows.rows {
            self.write_data_row(row, formats);
        }
    }

    fn write_data_row(&mut self, row: &[Option<Value>], formats: &[FormatCode]) {
        let encoded: Vec<Option<Vec<u8>>> = row
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_ref().map(|v| match formats.get(i).copied().unwrap_or(FormatCode::Text) {
                    FormatCode::Text => value::encode_text(v),
                    FormatCode::Binary => value::encode_binary(v).unwrap_or_else(|_| value::encode_text(v)),
                })
            })
            .collect();
        let refs: Vec<Option<&[u8]>> = encoded.iter().map(|o| o.as_deref()).collect();
        backend_query::write_data_row(&mut self.output, &refs);
    }

    fn finish_request(&mut self) {
        self.state = ProtocolState::Ready;
    }
}

fn default_text_formats(n: usize) -> Vec<FormatCode> {
    vec![FormatCode::Text; n]
}

fn is_transaction_recovery(category: Category, sql: &str) -> bool {
    if category != Category::TransactionControl {
        return false;
    }
    let keyword = sql.trim_start().split_whitespace().next().unwrap_or("").to_ascii_uppercase();
    matches!(keyword.as_str(), "COMMIT" | "END" | "ROLLBACK" | "ABORT" | "RELEASE")
}

fn outcome_to_tag_and_rows(category: Category, outcome: ExecuteOutcome) -> (String, Option<RowSet>) {
    match outcome {
        ExecuteOutcome::UpdateCount(n) => (backend_query::command_tag(category, n), None),
        ExecuteOutcome::Rows { columns, rows } => {
            let n = rows.len() as u64;
            (backend_query::command_tag(category, n), Some(RowSet { columns, rows }))
        }
    }
}

/// PostgreSQL DDL command tags are the statement's own name (`"CREATE TABLE"`,
/// not a row count); approximate it from the first two keywords, since this
/// engine has no catalog to ask for the authoritative form.
fn ddl_command_tag(sql: &str) -> String {
    let mut words = sql.split_whitespace();
    let first = words.next().unwrap_or("").to_ascii_uppercase();
    let second = words.next().unwrap_or("").to_ascii_uppercase();
    match second.as_str() {
        "TABLE" | "INDEX" | "VIEW" | "SCHEMA" | "SEQUENCE" | "TYPE" | "FUNCTION" | "TRIGGER" => {
            format!("{first} {second}")
        }
        _ => first,
    }
}

fn parse_set_statement(sql: &str) -> Result<(String, String)> {
    let rest = sql.trim_start();
    let rest = rest.strip_prefix("SET").or_else(|| rest.strip_prefix("set")).unwrap_or(rest).trim_start();
    let rest = rest.strip_prefix("SESSION").or_else(|| rest.strip_prefix("session")).unwrap_or(rest).trim_start();
    let rest = rest.trim_end_matches(';').trim();
    let (name, value) = rest
        .split_once('=')
        .or_else(|| {
            let mut parts = rest.splitn(2, char::is_whitespace);
            let name = parts.next()?;
            let rest = parts.next()?.trim();
            let rest = rest.strip_prefix("TO").or_else(|| rest.strip_prefix("to")).unwrap_or(rest);
            Some((name, rest))
        })
        .ok_or_else(|| Error::wire(SqlState::SyntaxError, format!("malformed SET statement: {sql:?}")))?;
    let value = value.trim().trim_matches('\'').trim_matches('"');
    Ok((name.trim().to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend_driver::{BackendDriver, BatchStatement, ExecuteOutcome};
    use crate::protocol::codec::MessageBuilder;

    #[derive(Default)]
    struct FakeBackend {
        next_update_count: u64,
    }

    impl BackendDriver for FakeBackend {
        fn begin(&mut self) -> Result<()> {
            Ok(())
        }
        fn commit(&mut self) -> Result<()> {
            Ok(())
        }
        fn rollback(&mut self) -> Result<()> {
            Ok(())
        }
        fn execute(&mut self, sql: &str, _params: &[Option<Value>]) -> Result<ExecuteOutcome> {
            if sql.to_ascii_uppercase().starts_with("SELECT") {
                Ok(ExecuteOutcome::Rows {
                    columns: vec![ColumnInfo { name: "n".to_string(), type_oid: oid::INT4 }],
                    rows: vec![vec![Some(Value::Int4(1))]],
                })
            } else {
                Ok(ExecuteOutcome::UpdateCount(self.next_update_count))
            }
        }
        fn execute_batch(&mut self, statements: &[BatchStatement<'_>]) -> Result<Vec<Result<u64>>> {
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

    fn query_payload(sql: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut msg = MessageBuilder::new(&mut buf, b'Q');
        msg.write_cstr(sql);
        msg.finish();
        buf[5..].to_vec()
    }

    #[test]
    fn simple_select_returns_row_and_ready() {
        let mut session = Session::new(FakeBackend::default(), SessionParams::default());
        session.enter_ready(1, 1);
        session.take_output();
        session.handle_message(b'Q', &query_payload("SELECT 1")).unwrap();
        let output = session.take_output();
        assert_eq!(output[0], b'T');
        assert!(output.windows(1).any(|w| w[0] == b'Z'));
        assert_eq!(session.tx_state, TransactionState::Idle);
    }

    #[test]
    fn failed_transaction_rejects_statements_until_rollback() {
        let mut session = Session::new(FakeBackend::default(), SessionParams::default());
        session.enter_ready(1, 1);
        session.tx_state = TransactionState::Failed;
        session.take_output();
        session.handle_message(b'Q', &query_payload("SELECT 1")).unwrap();
        let output = session.take_output();
        assert_eq!(output[0], b'E');

        session.handle_message(b'Q', &query_payload("ROLLBACK")).unwrap();
        assert_eq!(session.tx_state, TransactionState::Idle);
    }
}

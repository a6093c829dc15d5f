//! End-to-end scenarios driving `Session` purely through framed messages,
//! with an in-memory `BackendDriver` standing in for a real SQL backend.
//! Mirrors the literal scenarios in the spec's testable-properties section.

use pg_wire_adapter::backend_driver::{BackendDriver, BatchStatement, ColumnInfo, ExecuteOutcome};
use pg_wire_adapter::protocol::codec::MessageBuilder;
use pg_wire_adapter::protocol::frontend::msg_type;
use pg_wire_adapter::protocol::types::oid;
use pg_wire_adapter::session::{Session, SessionParams};
use pg_wire_adapter::value::Value;
use pg_wire_adapter::Result;

#[derive(Default)]
struct MemoryBackend {
    rows: Vec<Vec<Option<Value>>>,
    update_count: u64,
    batch_calls: Vec<usize>,
    in_transaction: bool,
}

impl BackendDriver for MemoryBackend {
    fn begin(&mut self) -> Result<()> {
        self.in_transaction = true;
        Ok(())
    }
    fn commit(&mut self) -> Result<()> {
        self.in_transaction = false;
        Ok(())
    }
    fn rollback(&mut self) -> Result<()> {
        self.in_transaction = false;
        Ok(())
    }
    fn execute(&mut self, sql: &str, _params: &[Option<Value>]) -> Result<ExecuteOutcome> {
        if sql.to_ascii_uppercase().starts_with("SELECT") {
            Ok(ExecuteOutcome::Rows {
                columns: vec![ColumnInfo { name: "greeting".to_string(), type_oid: oid::TEXT }],
                rows: self.rows.clone(),
            })
        } else {
            Ok(ExecuteOutcome::UpdateCount(self.update_count))
        }
    }
    fn execute_batch(&mut self, statements: &[BatchStatement<'_>]) -> Result<Vec<Result<u64>>> {
        self.batch_calls.push(statements.len());
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

fn frame(tag: u8, body: impl FnOnce(&mut MessageBuilder<'_>)) -> (u8, Vec<u8>) {
    let mut buf = Vec::new();
    let mut msg = MessageBuilder::new(&mut buf, tag);
    body(&mut msg);
    msg.finish();
    (tag, buf[5..].to_vec())
}

fn query(sql: &str) -> (u8, Vec<u8>) {
    frame(msg_type::QUERY, |m| m.write_cstr(sql))
}

#[test]
fn hello_world_simple_query() {
    let mut backend = MemoryBackend::default();
    backend.rows = vec![vec![Some(Value::Text("hello world".to_string()))]];
    let mut session = Session::new(backend, SessionParams::default());
    session.enter_ready(42, 1234);
    session.take_output();

    let (tag, payload) = query("SELECT 'hello world'");
    session.handle_message(tag, &payload).unwrap();
    let out = session.take_output();

    assert_eq!(out[0], b'T', "expected RowDescription first");
    assert!(out.windows(1).any(|w| w[0] == b'D'), "expected a DataRow");
    assert!(out.windows(1).any(|w| w[0] == b'C'), "expected CommandComplete");
    assert!(out.windows(1).any(|w| w[0] == b'Z'), "expected ReadyForQuery");
}

#[test]
fn extended_query_insert_round_trip() {
    let backend = MemoryBackend::default();
    let mut session = Session::new(backend, SessionParams::default());
    session.enter_ready(1, 1);
    session.take_output();

    let parse = frame(msg_type::PARSE, |m| {
        m.write_cstr("ins1");
        m.write_cstr("INSERT INTO t (a) VALUES ($1)");
        m.write_i16(0);
    });
    let bind = frame(msg_type::BIND, |m| {
        m.write_cstr("p1");
        m.write_cstr("ins1");
        m.write_i16(0);
        m.write_i16(1);
        m.write_i32(1);
        m.write_bytes(b"7");
        m.write_i16(0);
    });
    let execute = frame(msg_type::EXECUTE, |m| {
        m.write_cstr("p1");
        m.write_i32(0);
    });
    let sync = (msg_type::SYNC, Vec::new());

    for (tag, payload) in [parse, bind, execute, sync] {
        session.handle_message(tag, &payload).unwrap();
    }
    let out = session.take_output();
    assert!(out.windows(1).any(|w| w[0] == b'C'), "expected CommandComplete for the INSERT");
    assert!(out.windows(1).any(|w| w[0] == b'Z'), "expected ReadyForQuery after Sync");
}

#[test]
fn implicit_transaction_mid_string_failure_rolls_back() {
    struct FailingBackend {
        calls: usize,
    }
    impl BackendDriver for FailingBackend {
        fn begin(&mut self) -> Result<()> {
            Ok(())
        }
        fn commit(&mut self) -> Result<()> {
            panic!("commit must not be called once a statement fails");
        }
        fn rollback(&mut self) -> Result<()> {
            Ok(())
        }
        fn execute(&mut self, sql: &str, _params: &[Option<Value>]) -> Result<ExecuteOutcome> {
            self.calls += 1;
            if sql.to_ascii_uppercase().starts_with("INSERT") {
                Err(pg_wire_adapter::Error::wire(
                    pg_wire_adapter::SqlState::Other("23505".to_string()),
                    "duplicate key",
                ))
            } else {
                Ok(ExecuteOutcome::UpdateCount(1))
            }
        }
        fn execute_batch(&mut self, statements: &[BatchStatement<'_>]) -> Result<Vec<Result<u64>>> {
            Ok(statements.iter().map(|_| Ok(1)).collect())
        }
        fn set_session_parameter(&mut self, _n: &str, _v: &str) -> Result<()> {
            Ok(())
        }
        fn get_session_parameter(&mut self, _n: &str) -> Result<Option<String>> {
            Ok(None)
        }
        fn open_read_only_transaction(&mut self) -> Result<()> {
            Ok(())
        }
        fn issue_abort(&mut self) -> Result<()> {
            Ok(())
        }
    }

    let mut session = Session::new(FailingBackend { calls: 0 }, SessionParams::default());
    session.enter_ready(1, 1);
    session.take_output();

    let (tag, payload) = query("UPDATE t SET a = 1; INSERT INTO t VALUES (1); UPDATE t SET a = 2");
    session.handle_message(tag, &payload).unwrap();
    let out = session.take_output();
    assert!(out.windows(1).any(|w| w[0] == b'E'), "expected an ErrorResponse for the failed INSERT");
}

#[test]
fn copy_in_text_small_dispatches_insert_batch() {
    let backend = MemoryBackend::default();
    let mut session = Session::new(backend, SessionParams::default());
    session.enter_ready(1, 1);
    session.take_output();

    let (tag, payload) = query("COPY t (a, b) FROM STDIN");
    session.handle_message(tag, &payload).unwrap();
    let out = session.take_output();
    assert_eq!(out[0], b'G', "expected CopyInResponse");

    let (tag, payload) = frame(msg_type::COPY_DATA, |m| m.write_bytes(b"1\tAlice\n2\tBob\n"));
    session.handle_message(tag, &payload).unwrap();

    let (tag, payload) = (msg_type::COPY_DONE, Vec::new());
    session.handle_message(tag, &payload).unwrap();
    let out = session.take_output();
    assert!(out.windows(1).any(|w| w[0] == b'C'), "expected CommandComplete for COPY");
    assert!(out.windows(1).any(|w| w[0] == b'Z'), "simple-query COPY must self-issue ReadyForQuery");
}

#[test]
fn copy_in_atomic_mode_exceeds_mutation_limit() {
    let backend = MemoryBackend::default();
    let mut session = Session::new(backend, SessionParams::default());
    session.enter_ready(1, 1);
    session.take_output();

    let (tag, payload) = query("COPY t (a, b, c, d) FROM STDIN");
    session.handle_message(tag, &payload).unwrap();
    session.take_output();

    let mut line = Vec::new();
    for i in 0..6000u32 {
        line.extend_from_slice(format!("{i}\tx\ty\tz\n").as_bytes());
    }
    let (tag, payload) = frame(msg_type::COPY_DATA, |m| m.write_bytes(&line));
    session.handle_message(tag, &payload).unwrap();

    let (tag, payload) = (msg_type::COPY_DONE, Vec::new());
    session.handle_message(tag, &payload).unwrap();
    let out = session.take_output();
    assert!(out.windows(1).any(|w| w[0] == b'E'), "expected ErrorResponse for exceeding the mutation ceiling");
}

#[test]
fn portal_suspension_paginates_across_executes() {
    let mut backend = MemoryBackend::default();
    backend.rows = (0..5).map(|i| vec![Some(Value::Text(format!("row{i}")))]).collect();
    let mut session = Session::new(backend, SessionParams::default());
    session.enter_ready(1, 1);
    session.take_output();

    let parse = frame(msg_type::PARSE, |m| {
        m.write_cstr("sel1");
        m.write_cstr("SELECT greeting FROM t");
        m.write_i16(0);
    });
    let bind = frame(msg_type::BIND, |m| {
        m.write_cstr("p1");
        m.write_cstr("sel1");
        m.write_i16(0);
        m.write_i16(0);
        m.write_i16(0);
    });
    session.handle_message(parse.0, &parse.1).unwrap();
    session.handle_message(bind.0, &bind.1).unwrap();
    session.take_output();

    let execute_two = frame(msg_type::EXECUTE, |m| {
        m.write_cstr("p1");
        m.write_i32(2);
    });
    session.handle_message(execute_two.0, &execute_two.1).unwrap();
    let out = session.take_output();
    assert_eq!(out.iter().filter(|&&b| b == b'D').count(), 2, "expected exactly 2 DataRows");
    assert!(out.windows(1).any(|w| w[0] == b's'), "expected PortalSuspended after a partial fetch");

    let execute_rest = frame(msg_type::EXECUTE, |m| {
        m.write_cstr("p1");
        m.write_i32(0);
    });
    session.handle_message(execute_rest.0, &execute_rest.1).unwrap();
    let out = session.take_output();
    assert_eq!(out.iter().filter(|&&b| b == b'D').count(), 3, "expected the remaining 3 DataRows");
    assert!(out.windows(1).any(|w| w[0] == b'C'), "expected CommandComplete once exhausted");
}

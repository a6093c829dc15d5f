//! Local-intercept catalogue (§6): a closed set of SQL strings answered
//! from canned result sets without a backend round-trip — driver
//! introspection queries, version probes, and empty results for ORM
//! migration-table checks.

use crate::protocol::types::{Oid, oid};
use crate::value::Value;

pub const SERVER_VERSION: &str = "PostgreSQL 14.0 (pg-wire-adapter)";

/// One canned column: its name and the OID it reports in RowDescription.
pub type Field = (&'static str, Oid);

pub type Row = Vec<Option<Value>>;

/// A canned answer: the row-description shape plus the literal rows.
#[derive(Debug, Clone)]
pub struct CannedResult {
    pub fields: Vec<Field>,
    pub rows: Vec<Row>,
}

fn normalize(sql: &str) -> String {
    sql.trim()
        .trim_end_matches(';')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

/// Returns `Some` if `sql`, whitespace-normalised, matches a known
/// intercepted query or parse template.
pub fn lookup(sql: &str) -> Option<CannedResult> {
    let normalized = normalize(sql);

    if normalized == "SELECT VERSION()" || normalized == "SELECT PG_CATALOG.VERSION()" {
        return Some(CannedResult {
            fields: vec![("version", oid::TEXT)],
            rows: vec![vec![Some(Value::Text(SERVER_VERSION.to_string()))]],
        });
    }

    if normalized == "SELECT CURRENT_SCHEMA()" {
        return Some(CannedResult {
            fields: vec![("current_schema", oid::TEXT)],
            rows: vec![vec![Some(Value::Text("public".to_string()))]],
        });
    }

    if is_orm_migration_probe(&normalized) {
        return Some(CannedResult { fields: Vec::new(), rows: Vec::new() });
    }

    None
}

/// ORMs (Rails' ActiveRecord, Django) probe for their migrations-tracking
/// table via `pg_class`/`information_schema` queries before running their
/// own migration DDL; this adapter has no catalog of such tables, so these
/// always report "not found" rather than forwarding to the backend.
fn is_orm_migration_probe(normalized: &str) -> bool {
    normalized.starts_with("SELECT")
        && (normalized.contains("PG_CLASS") || normalized.contains("INFORMATION_SCHEMA.TABLES"))
        && normalized.contains("SCHEMA_MIGRATIONS")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_version_probe_case_and_whitespace_insensitively() {
        assert!(lookup("  select   pg_catalog.version()  ").is_some());
        assert!(lookup("SELECT VERSION();").is_some());
    }

    #[test]
    fn matches_migration_probe_template() {
        let sql = "SELECT 1 FROM pg_class WHERE relname = 'schema_migrations'";
        assert!(lookup(sql).unwrap().rows.is_empty());
    }

    #[test]
    fn unrelated_query_is_not_intercepted() {
        assert!(lookup("SELECT * FROM orders").is_none());
    }
}

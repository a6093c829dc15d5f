//! Named Statement (§3): the result of a Parse message kept alive by name
//! until explicitly closed or replaced.

use crate::classifier::{Category, classify};
use crate::protocol::types::Oid;

/// One parsed, classified statement, indexed by name in a session's
/// statement table.
#[derive(Debug, Clone)]
pub struct NamedStatement {
    pub name: String,
    pub sql: String,
    pub category: Category,
    pub rewritten_sql: String,
    /// Parameter type OIDs the client supplied in `Parse`; `0` means
    /// "unspecified, infer from context".
    pub client_param_types: Vec<Oid>,
    /// Parameter type OIDs actually reported back in `ParameterDescription`,
    /// after resolving unspecified hints.
    pub inferred_param_types: Vec<Oid>,
}

impl NamedStatement {
    /// Classify `sql` and resolve unspecified (`0`) parameter type hints to
    /// a default scalar type (text), since this engine has no catalog to
    /// infer real column types from. When the SQL references more `$N`
    /// placeholders than the client supplied hints for (many drivers send
    /// zero hints), the missing slots are backfilled with the same default.
    pub fn new(name: impl Into<String>, sql: impl Into<String>, client_param_types: Vec<Oid>) -> Self {
        let sql = sql.into();
        let classified = classify(&sql);
        let param_count = classified.param_indices.iter().copied().max().unwrap_or(0) as usize;
        let param_count = param_count.max(client_param_types.len());
        let inferred_param_types: Vec<Oid> = (0..param_count)
            .map(|i| client_param_types.get(i).copied().unwrap_or(0))
            .map(|oid| if oid == 0 { crate::protocol::types::oid::TEXT } else { oid })
            .collect();
        Self {
            name: name.into(),
            sql,
            category: classified.category,
            rewritten_sql: classified.rewritten,
            client_param_types,
            inferred_param_types,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unspecified_param_types_default_to_text() {
        let stmt = NamedStatement::new("s1", "SELECT $1", vec![0]);
        assert_eq!(stmt.inferred_param_types, vec![crate::protocol::types::oid::TEXT]);
    }

    #[test]
    fn explicit_param_types_are_preserved() {
        let stmt = NamedStatement::new("s1", "SELECT $1", vec![crate::protocol::types::oid::INT4]);
        assert_eq!(stmt.inferred_param_types, vec![crate::protocol::types::oid::INT4]);
    }

    #[test]
    fn missing_type_hints_are_backfilled_from_placeholder_count() {
        let stmt = NamedStatement::new("s1", "INSERT INTO t VALUES ($1, $2, $3)", Vec::new());
        assert_eq!(
            stmt.inferred_param_types,
            vec![crate::protocol::types::oid::TEXT; 3]
        );
    }
}

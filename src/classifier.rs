//! Statement Classifier & Rewriter (§4.3): categorises raw SQL text, strips
//! comments, locates `$N` parameter placeholders, and applies a small set
//! of deterministic rewrites.

use std::collections::BTreeSet;

use crate::intercept;

/// Coarse statement category, derived from the first significant keyword
/// after whitespace and comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    Ddl,
    Copy,
    TransactionControl,
    SessionManagement,
    PrepareExecuteDeallocate,
    LocalIntercept,
    Unknown,
}

impl Category {
    pub fn is_dml(self) -> bool {
        matches!(self, Category::Insert | Category::Update | Category::Delete | Category::Merge)
    }
}

/// Result of classifying and rewriting one statement's SQL text.
#[derive(Debug, Clone)]
pub struct Classified {
    pub category: Category,
    /// SQL to send to the backend; identical to the input unless a rewrite
    /// rule applied.
    pub rewritten: String,
    /// Sorted, deduplicated `$N` parameter indices found outside string
    /// literals, identifier quotes, and comments.
    pub param_indices: Vec<u32>,
}

pub fn classify(sql: &str) -> Classified {
    let stripped = strip_comments(sql);
    let trimmed = stripped.trim();

    let category = if intercept::lookup(trimmed).is_some() {
        Category::LocalIntercept
    } else {
        classify_keyword(&first_keyword(trimmed))
    };

    let param_indices = scan_params(&stripped);
    let rewritten = rewrite(&stripped, category);

    Classified { category, rewritten, param_indices }
}

fn first_keyword(sql: &str) -> String {
    sql.split(|c: char| c.is_whitespace() || c == '(')
        .find(|s| !s.is_empty())
        .unwrap_or("")
        .to_ascii_uppercase()
}

fn classify_keyword(keyword: &str) -> Category {
    match keyword {
        "SELECT" | "VALUES" | "TABLE" | "WITH" => Category::Select,
        "INSERT" => Category::Insert,
        "UPDATE" => Category::Update,
        "DELETE" => Category::Delete,
        "MERGE" => Category::Merge,
        "CREATE" | "ALTER" | "DROP" | "TRUNCATE" | "COMMENT" => Category::Ddl,
        "COPY" => Category::Copy,
        "BEGIN" | "START" | "COMMIT" | "END" | "ROLLBACK" | "SAVEPOINT" | "RELEASE" | "ABORT" => {
            Category::TransactionControl
        }
        "SET" | "RESET" | "SHOW" => Category::SessionManagement,
        "PREPARE" | "EXECUTE" | "DEALLOCATE" => Category::PrepareExecuteDeallocate,
        _ => Category::Unknown,
    }
}

/// Replace `--` line comments and nested `/* ... */` block comments with
/// whitespace, leaving everything inside single- and double-quoted
/// sections untouched so a `--` or `/*` appearing in a string literal is
/// not mistaken for a comment.
pub fn strip_comments(sql: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let n = chars.len();
    let mut out = String::with_capacity(n);
    let mut i = 0;
    while i < n {
        match chars[i] {
            '\'' => {
                out.push('\'');
                i += 1;
                while i < n {
                    out.push(chars[i]);
                    if chars[i] == '\'' {
                        if chars.get(i + 1) == Some(&'\'') {
                            i += 1;
                            out.push(chars[i]);
                            i += 1;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            '"' => {
                out.push('"');
                i += 1;
                while i < n {
                    out.push(chars[i]);
                    let closed = chars[i] == '"';
                    i += 1;
                    if closed {
                        break;
                    }
                }
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                while i < n && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                let mut depth = 1;
                i += 2;
                while i < n && depth > 0 {
                    if chars[i] == '/' && chars.get(i + 1) == Some(&'*') {
                        depth += 1;
                        i += 2;
                    } else if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        depth -= 1;
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                out.push(' ');
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Splits a simple-query string into individual statements on top-level
/// semicolons (§4.4.4: a multi-statement simple Query runs as one implicit
/// transaction, one statement at a time). Semicolons inside string or
/// identifier literals do not split.
pub fn split_statements(sql: &str) -> Vec<String> {
    let stripped = strip_comments(sql);
    let chars: Vec<char> = stripped.chars().collect();
    let n = chars.len();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut i = 0;
    while i < n {
        match chars[i] {
            '\'' => {
                current.push('\'');
                i += 1;
                while i < n {
                    current.push(chars[i]);
                    if chars[i] == '\'' {
                        if chars.get(i + 1) == Some(&'\'') {
                            i += 1;
                            current.push(chars[i]);
                            i += 1;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            '"' => {
                current.push('"');
                i += 1;
                while i < n {
                    current.push(chars[i]);
                    let closed = chars[i] == '"';
                    i += 1;
                    if closed {
                        break;
                    }
                }
            }
            ';' => {
                let trimmed = current.trim();
                if !trimmed.is_empty() {
                    statements.push(trimmed.to_string());
                }
                current.clear();
                i += 1;
            }
            c => {
                current.push(c);
                i += 1;
            }
        }
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
    statements
}

fn scan_params(sql: &str) -> Vec<u32> {
    let chars: Vec<char> = sql.chars().collect();
    let n = chars.len();
    let mut set = BTreeSet::new();
    let mut i = 0;
    while i < n {
        match chars[i] {
            '\'' => {
                i += 1;
                while i < n {
                    if chars[i] == '\'' {
                        if chars.get(i + 1) == Some(&'\'') {
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            '"' => {
                i += 1;
                while i < n && chars[i] != '"' {
                    i += 1;
                }
                i += 1;
            }
            '$' if chars.get(i + 1).is_some_and(char::is_ascii_digit) => {
                let start = i + 1;
                let mut j = start;
                while j < n && chars[j].is_ascii_digit() {
                    j += 1;
                }
                let digits: String = chars[start..j].iter().collect();
                if let Ok(idx) = digits.parse::<u32>() {
                    set.insert(idx);
                }
                i = j;
            }
            _ => i += 1,
        }
    }
    set.into_iter().collect()
}

fn rewrite(sql: &str, category: Category) -> String {
    if category == Category::Select {
        let normalized = normalize_whitespace(sql);
        if normalized.trim_end_matches(';').eq_ignore_ascii_case("select pg_catalog.version()")
            || normalized.trim_end_matches(';').eq_ignore_ascii_case("select version()")
        {
            return format!("SELECT '{}'", intercept::SERVER_VERSION);
        }
        if let Some(stripped) = strip_trailing_row_lock_clause(sql) {
            return stripped;
        }
    }
    sql.to_string()
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `FOR UPDATE`/`FOR SHARE` and their `NO KEY`/`KEY` variants are row-lock
/// clauses the backend has no equivalent for and which are no-ops for a
/// read path with no concurrent writers in view; strip them rather than
/// reject the statement.
fn strip_trailing_row_lock_clause(sql: &str) -> Option<String> {
    let trimmed = sql.trim_end();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
    for suffix in ["FOR UPDATE", "FOR SHARE", "FOR NO KEY UPDATE", "FOR KEY SHARE"] {
        if trimmed.len() > suffix.len()
            && trimmed[trimmed.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
            && trimmed.as_bytes()[trimmed.len() - suffix.len() - 1].is_ascii_whitespace()
        {
            return Some(trimmed[..trimmed.len() - suffix.len()].trim_end().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_basic_categories() {
        assert_eq!(classify("select 1").category, Category::Select);
        assert_eq!(classify("INSERT INTO t VALUES (1)").category, Category::Insert);
        assert_eq!(classify("update t set a=1").category, Category::Update);
        assert_eq!(classify("DELETE FROM t").category, Category::Delete);
        assert_eq!(classify("begin").category, Category::TransactionControl);
        assert_eq!(classify("SET search_path = public").category, Category::SessionManagement);
        assert_eq!(classify("COPY t FROM STDIN").category, Category::Copy);
        assert_eq!(classify("frobnicate everything").category, Category::Unknown);
    }

    #[test]
    fn strips_comments_before_classifying() {
        let c = classify("-- a comment\n/* nested /* block */ comment */ SELECT 1");
        assert_eq!(c.category, Category::Select);
    }

    #[test]
    fn dashdash_inside_string_literal_is_not_a_comment() {
        let c = classify("SELECT '--not a comment'");
        assert_eq!(c.category, Category::Select);
        assert!(c.rewritten.contains("--not a comment"));
    }

    #[test]
    fn scans_distinct_sorted_param_indices() {
        let c = classify("INSERT INTO t VALUES ($2, $1, $2)");
        assert_eq!(c.param_indices, vec![1, 2]);
    }

    #[test]
    fn params_inside_string_literals_are_ignored() {
        let c = classify("SELECT '$1' WHERE a = $1");
        assert_eq!(c.param_indices, vec![1]);
    }

    #[test]
    fn rewrites_version_query() {
        let c = classify("SELECT pg_catalog.version()");
        assert_eq!(c.rewritten, format!("SELECT '{}'", intercept::SERVER_VERSION));
    }

    #[test]
    fn strips_trailing_for_update() {
        let c = classify("SELECT * FROM t FOR UPDATE");
        assert_eq!(c.rewritten, "SELECT * FROM t");
    }

    #[test]
    fn splits_on_top_level_semicolons_only() {
        let stmts = split_statements("INSERT INTO t VALUES(1,'a;b'); SELECT 1;;  ");
        assert_eq!(stmts, vec!["INSERT INTO t VALUES(1,'a;b')".to_string(), "SELECT 1".to_string()]);
    }

    #[test]
    fn empty_query_splits_to_no_statements() {
        assert!(split_statements("   ").is_empty());
    }
}

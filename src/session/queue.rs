//! Pending batch (§3 Pending-Result Queue, §4.4.3 batching policy).
//!
//! Of the queue concept in §3, only the batching dimension is actually
//! deferred here: DML statements accumulate until a dispatch trigger fires,
//! then run as one backend round-trip with their `CommandComplete`s handed
//! back in the order they were queued. Every other response kind in this
//! engine is written to the session's output buffer immediately, since
//! nothing else in the pipeline defers a response across frames.

use crate::classifier::Category;
use crate::value::Value;

/// One statement waiting to be dispatched as part of the current batch.
#[derive(Debug, Clone)]
pub struct QueuedStatement {
    pub sql: String,
    pub params: Vec<Option<Value>>,
    pub category: Category,
}

/// Accumulates DML statements between dispatch triggers (§4.4.3).
#[derive(Debug, Clone, Default)]
pub struct PendingBatch {
    statements: Vec<QueuedStatement>,
}

impl PendingBatch {
    pub fn push(&mut self, sql: impl Into<String>, params: Vec<Option<Value>>, category: Category) {
        self.statements.push(QueuedStatement { sql: sql.into(), params, category });
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn statements(&self) -> &[QueuedStatement] {
        &self.statements
    }

    /// Remove and return every queued statement, in order, for dispatch.
    pub fn drain(&mut self) -> Vec<QueuedStatement> {
        std::mem::take(&mut self.statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_preserves_order_and_empties_the_batch() {
        let mut batch = PendingBatch::default();
        batch.push("INSERT INTO t VALUES (1)", vec![], Category::Insert);
        batch.push("INSERT INTO t VALUES (2)", vec![], Category::Insert);
        let drained = batch.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].sql, "INSERT INTO t VALUES (1)");
        assert_eq!(drained[1].sql, "INSERT INTO t VALUES (2)");
        assert!(batch.is_empty());
    }
}

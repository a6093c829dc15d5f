//! Transaction State (§3, §4.4.4).

use crate::protocol::types::TransactionStatus;

/// One of the three states a session's transaction can be in, reported
/// verbatim in every `ReadyForQuery` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    #[default]
    Idle,
    InTransaction,
    Failed,
}

impl TransactionState {
    /// The wire status `ReadyForQuery` reports for this state.
    pub fn to_wire(self) -> TransactionStatus {
        match self {
            TransactionState::Idle => TransactionStatus::Idle,
            TransactionState::InTransaction => TransactionStatus::InTransaction,
            TransactionState::Failed => TransactionStatus::Failed,
        }
    }

    /// `BEGIN` while idle opens a transaction; `BEGIN` while already inside
    /// one is a no-op warning in real PostgreSQL, not a new nesting level.
    #[must_use]
    pub fn begin(self) -> Self {
        match self {
            TransactionState::Idle => TransactionState::InTransaction,
            other => other,
        }
    }

    /// `COMMIT`/`ROLLBACK` always return to idle, from either in-progress
    /// or failed state.
    #[must_use]
    pub fn end(self) -> Self {
        TransactionState::Idle
    }

    /// Any error while a transaction is open moves it to failed; an error
    /// outside a transaction leaves the session idle (§4.4.4).
    #[must_use]
    pub fn fail(self) -> Self {
        match self {
            TransactionState::Idle => TransactionState::Idle,
            _ => TransactionState::Failed,
        }
    }

    pub fn is_failed(self) -> bool {
        matches!(self, TransactionState::Failed)
    }

    pub fn is_in_transaction(self) -> bool {
        !matches!(self, TransactionState::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_commit_rollback_cycle() {
        let mut state = TransactionState::Idle;
        state = state.begin();
        assert_eq!(state, TransactionState::InTransaction);
        state = state.end();
        assert_eq!(state, TransactionState::Idle);
    }

    #[test]
    fn error_inside_transaction_fails_it() {
        let state = TransactionState::InTransaction.fail();
        assert_eq!(state, TransactionState::Failed);
    }

    #[test]
    fn error_outside_transaction_stays_idle() {
        let state = TransactionState::Idle.fail();
        assert_eq!(state, TransactionState::Idle);
    }

    #[test]
    fn rollback_clears_failed_state() {
        assert_eq!(TransactionState::Failed.end(), TransactionState::Idle);
    }
}

//! Templating transaction state.

use serde::{Deserialize, Serialize};

/// Phase of a bulk refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionStatus {
    /// No transaction has run.
    #[default]
    NotStarted,
    /// Variables are being refreshed.
    Fetching,
    /// The last transaction finished.
    Completed,
}

/// State of the current templating transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionState {
    /// Uid of the running or last transaction.
    pub uid: Option<String>,
    /// Current phase.
    pub status: TransactionStatus,
    /// Whether variables were edited after the transaction completed.
    pub is_dirty: bool,
}

impl TransactionState {
    /// Starts a transaction, replacing any running one.
    pub fn init(&mut self, uid: impl Into<String>) {
        self.uid = Some(uid.into());
        self.status = TransactionStatus::Fetching;
        self.is_dirty = false;
    }

    /// Completes the transaction with `uid`; returns false if it is not the current one.
    pub fn complete(&mut self, uid: &str) -> bool {
        if self.uid.as_deref() != Some(uid) {
            return false;
        }
        self.status = TransactionStatus::Completed;
        true
    }

    /// Records a variable edit; only counts once the transaction is complete.
    pub fn mark_dirty(&mut self) {
        if self.status == TransactionStatus::Completed {
            self.is_dirty = true;
        }
    }

    /// Resets to the initial state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Returns true while variables are being fetched.
    #[must_use]
    pub fn is_fetching(&self) -> bool {
        self.status == TransactionStatus::Fetching
    }

    /// Returns true if `uid` is the current transaction.
    #[must_use]
    pub fn is_current(&self, uid: &str) -> bool {
        self.uid.as_deref() == Some(uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dirty_only_after_completion() {
        let mut state = TransactionState::default();
        state.init("t1");
        state.mark_dirty();
        assert!(!state.is_dirty);

        assert!(state.complete("t1"));
        state.mark_dirty();
        assert!(state.is_dirty);
    }

    #[test]
    fn test_late_completion_of_replaced_transaction_ignored() {
        let mut state = TransactionState::default();
        state.init("t1");
        state.init("t2");
        assert!(!state.complete("t1"));
        assert_eq!(state.status, TransactionStatus::Fetching);
        assert!(state.complete("t2"));
        assert_eq!(state.status, TransactionStatus::Completed);
    }

    #[test]
    fn test_new_transaction_resets_dirty() {
        let mut state = TransactionState::default();
        state.init("t1");
        state.complete("t1");
        state.mark_dirty();
        state.init("t2");
        assert!(!state.is_dirty);
        state.clear();
        assert_eq!(state, TransactionState::default());
    }
}

// ============================================================================
// Transaction State Management
// ============================================================================
//
// Implements the State Pattern for the transaction lifecycle.
// A transaction moves exactly once from Open to Committed or RolledBack and
// is never reopened.
//
// ============================================================================

use super::Change;
use crate::core::{ModelError, ObjectId, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Global transaction ID counter
static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Generate a new unique transaction ID
    pub fn new() -> Self {
        TransactionId(NEXT_TXN_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn_{}", self.0)
    }
}

/// Transaction state following the State Pattern
///
/// State transitions:
/// ```text
/// Open ──commit──> Committed
///   │
///   └──rollback──> RolledBack
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Edits may be recorded
    Open,

    /// All edits were applied
    Committed,

    /// All edits were discarded
    RolledBack,
}

impl TransactionState {
    pub fn is_open(&self) -> bool {
        matches!(self, TransactionState::Open)
    }

    /// Check if transaction is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::Committed | TransactionState::RolledBack
        )
    }
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::Open => write!(f, "OPEN"),
            TransactionState::Committed => write!(f, "COMMITTED"),
            TransactionState::RolledBack => write!(f, "ROLLED BACK"),
        }
    }
}

/// Bookkeeping of one transaction: its owner, state and pending edits.
#[derive(Debug)]
pub struct TransactionLog {
    id: TransactionId,

    /// Container the edits target
    container: ObjectId,

    state: TransactionState,

    /// Pending edits in the order they were made (Command Pattern)
    changes: Vec<Change>,

    /// Start time for diagnostics
    start_time: Instant,
}

impl TransactionLog {
    pub fn new(id: TransactionId, container: ObjectId) -> Self {
        Self {
            id,
            container,
            state: TransactionState::Open,
            changes: Vec::new(),
            start_time: Instant::now(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn container(&self) -> ObjectId {
        self.container
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Fails with `InvalidState` unless the transaction is still open.
    pub fn ensure_open(&self) -> Result<()> {
        if self.state.is_open() {
            Ok(())
        } else {
            Err(ModelError::InvalidState(format!(
                "transaction {} is already {}",
                self.id, self.state
            )))
        }
    }

    pub fn record(&mut self, change: Change) -> Result<()> {
        self.ensure_open()?;
        self.changes.push(change);
        Ok(())
    }

    /// Moves to a terminal state. Pending edits are dropped either way: once
    /// committed they live in the container, once rolled back they are gone.
    pub fn finish(&mut self, state: TransactionState) -> Result<()> {
        self.ensure_open()?;
        if !state.is_terminal() {
            return Err(ModelError::InvalidState(format!(
                "transaction {} cannot move to {}",
                self.id, state
            )));
        }
        self.state = state;
        self.changes.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_ids_are_unique() {
        let a = TransactionId::new();
        let b = TransactionId::new();
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("txn_"));
    }

    #[test]
    fn test_state_transitions_are_one_way() {
        let mut log = TransactionLog::new(TransactionId::new(), ObjectId(1));
        assert!(log.state().is_open());

        log.finish(TransactionState::RolledBack).unwrap();
        assert!(log.state().is_terminal());
        assert!(matches!(
            log.finish(TransactionState::Committed),
            Err(ModelError::InvalidState(_))
        ));
        assert!(matches!(
            log.record(Change::BulkQuery {
                table: "t".into(),
                command: "x".into()
            }),
            Err(ModelError::InvalidState(_))
        ));
    }

    #[test]
    fn test_cannot_finish_as_open() {
        let mut log = TransactionLog::new(TransactionId::new(), ObjectId(1));
        assert!(log.finish(TransactionState::Open).is_err());
        assert!(log.state().is_open());
    }
}

// ============================================================================
// Transaction Management Module
// ============================================================================
//
// Row edits against one container are batched in a Transaction and applied
// all-or-nothing on commit.
//
// Design Patterns Used:
// - State Pattern: Transaction lifecycle (Open, Committed, RolledBack)
// - Command Pattern: Each pending edit is a Change replayed on commit
// - Copy-on-Write: Changes are applied to a clone of the container's tables
//
// ============================================================================

pub mod change;
pub mod manager;
pub mod state;

pub use change::Change;
pub use manager::{Transaction, TransactionManager};
pub use state::{TransactionId, TransactionLog, TransactionState};

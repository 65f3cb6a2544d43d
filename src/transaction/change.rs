// ============================================================================
// Transaction Change Tracking
// ============================================================================
//
// Each Change is one pending row edit. Edits are only recorded while the
// transaction is open and are applied, in order, when it commits.
//
// ============================================================================

use crate::core::{Fields, RowId};
use crate::rows::RowRecord;

/// A single pending edit in a transaction
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Insert a new row
    InsertRow { record: RowRecord },

    /// Overwrite some fields of an existing row
    UpdateRow {
        table: String,
        row_id: RowId,
        fields: Fields,
    },

    /// Remove an existing row
    DeleteRow { table: String, row_id: RowId },

    /// A bulk command already forwarded to the query executor; kept so the
    /// transaction log shows it in order with the row edits
    BulkQuery { table: String, command: String },
}

impl Change {
    /// Get the table name affected by this change
    pub fn table_name(&self) -> &str {
        match self {
            Change::InsertRow { record } => &record.table,
            Change::UpdateRow { table, .. } => table,
            Change::DeleteRow { table, .. } => table,
            Change::BulkQuery { table, .. } => table,
        }
    }

    /// Row addressed by this change, if any
    pub fn row_id(&self) -> Option<RowId> {
        match self {
            Change::InsertRow { record } => Some(record.id),
            Change::UpdateRow { row_id, .. } | Change::DeleteRow { row_id, .. } => Some(*row_id),
            Change::BulkQuery { .. } => None,
        }
    }

    pub fn is_bulk(&self) -> bool {
        matches!(self, Change::BulkQuery { .. })
    }
}

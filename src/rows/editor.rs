use super::record::{RowRecord, validate_geometry};
use crate::core::{Fields, ModelError, Point, Result, Value};
use crate::transaction::{Change, Transaction};

/// Typed row edits inside a transaction.
///
/// Every edit is only recorded on the transaction; nothing reaches the
/// container until the transaction commits.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowEditor;

impl RowEditor {
    pub fn new() -> Self {
        Self
    }

    /// Stages a new row. Geometry, when given, needs at least three points.
    pub fn insert(
        &self,
        tx: &mut Transaction,
        table: &str,
        fields: Fields,
        geometry: Option<Vec<Point>>,
    ) -> Result<RowRecord> {
        tx.ensure_open()?;
        check_table(table)?;
        if let Some(points) = &geometry {
            validate_geometry(points)?;
        }

        let record = RowRecord::new(table, fields, geometry);
        tx.record(Change::InsertRow {
            record: record.clone(),
        })?;
        Ok(record)
    }

    /// Stages new values for some fields of an existing row and returns the
    /// row as it will read after commit.
    pub fn update(
        &self,
        tx: &mut Transaction,
        record: &RowRecord,
        fields: Fields,
    ) -> Result<RowRecord> {
        tx.ensure_open()?;
        if is_pending_delete(tx, record) {
            return Err(ModelError::NotFound(format!(
                "{} in table '{}' is deleted in {}",
                record.id,
                record.table,
                tx.id()
            )));
        }

        let mut updated = record.clone();
        updated.fields.extend(fields.clone());
        tx.record(Change::UpdateRow {
            table: record.table.clone(),
            row_id: record.id,
            fields,
        })?;
        Ok(updated)
    }

    /// Stages removal of a row. Deleting the same row twice in one
    /// transaction is a no-op.
    pub fn delete(&self, tx: &mut Transaction, record: &RowRecord) -> Result<()> {
        tx.ensure_open()?;
        if is_pending_delete(tx, record) {
            return Ok(());
        }
        tx.record(Change::DeleteRow {
            table: record.table.clone(),
            row_id: record.id,
        })
    }

    /// Rows of `table` as this transaction sees them: committed rows plus
    /// its own pending edits.
    pub async fn rows(&self, tx: &Transaction, table: &str) -> Result<Vec<RowRecord>> {
        tx.ensure_open()?;
        Ok(tx.staged_view().await?.rows(table))
    }

    /// Rows of `table` whose `field` equals `value`.
    pub async fn find(
        &self,
        tx: &Transaction,
        table: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<RowRecord>> {
        Ok(self
            .rows(tx, table)
            .await?
            .into_iter()
            .filter(|row| row.get(field) == Some(value))
            .collect())
    }

    /// Forwards `command` verbatim to the query engine within the
    /// transaction's scope and returns the engine's raw answer.
    pub async fn bulk_query(&self, tx: &mut Transaction, table: &str, command: &str) -> Result<String> {
        tx.ensure_open()?;
        check_table(table)?;
        let result = tx.executor().execute(&tx.scope(), table, command).await?;
        tx.record(Change::BulkQuery {
            table: table.to_string(),
            command: command.to_string(),
        })?;
        Ok(result)
    }
}

fn check_table(table: &str) -> Result<()> {
    if table.trim().is_empty() {
        return Err(ModelError::ValidationError(
            "table name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn is_pending_delete(tx: &Transaction, record: &RowRecord) -> bool {
    tx.changes().iter().any(|change| {
        matches!(change, Change::DeleteRow { table, row_id }
            if *row_id == record.id && *table == record.table)
    })
}

use crate::core::{ModelError, Result, RowId};
use crate::rows::RowRecord;
use crate::transaction::Change;
use serde::{Deserialize, Serialize};

type TableRows = im::OrdMap<RowId, RowRecord>;

/// Row tables held by an openable object (a network or a geometry).
///
/// Backed by persistent maps, so cloning is O(1) and a commit can apply its
/// edits to a clone and swap it in only when every edit succeeded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerData {
    tables: im::HashMap<String, TableRows>,
}

impl ContainerData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, change: &Change) -> Result<()> {
        match change {
            Change::InsertRow { record } => {
                let mut rows = self.table(&record.table);
                if rows.contains_key(&record.id) {
                    return Err(ModelError::InvalidState(format!(
                        "{} already exists in table '{}'",
                        record.id, record.table
                    )));
                }
                rows.insert(record.id, record.clone());
                self.tables.insert(record.table.clone(), rows);
            }
            Change::UpdateRow {
                table,
                row_id,
                fields,
            } => {
                let mut rows = self.table(table);
                let row = rows.get_mut(row_id).ok_or_else(|| missing_row(table, *row_id))?;
                for (name, value) in fields {
                    row.fields.insert(name.clone(), value.clone());
                }
                self.tables.insert(table.clone(), rows);
            }
            Change::DeleteRow { table, row_id } => {
                let mut rows = self.table(table);
                rows.remove(row_id).ok_or_else(|| missing_row(table, *row_id))?;
                self.tables.insert(table.clone(), rows);
            }
            // executed by the query executor, nothing to apply here
            Change::BulkQuery { .. } => {}
        }
        Ok(())
    }

    pub fn rows(&self, table: &str) -> Vec<RowRecord> {
        self.tables
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, table: &str, row_id: RowId) -> Option<&RowRecord> {
        self.tables.get(table).and_then(|rows| rows.get(&row_id))
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn row_count(&self) -> usize {
        self.tables.values().map(|rows| rows.len()).sum()
    }

    pub(crate) fn max_row_id(&self) -> Option<RowId> {
        self.tables
            .values()
            .filter_map(|rows| rows.get_max().map(|(id, _)| *id))
            .max()
    }

    fn table(&self, name: &str) -> TableRows {
        self.tables.get(name).cloned().unwrap_or_default()
    }
}

fn missing_row(table: &str, row_id: RowId) -> ModelError {
    ModelError::NotFound(format!("{} in table '{}'", row_id, table))
}

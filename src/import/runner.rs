use super::plan::{BulkUnit, PlanStep};
use super::report::{ImportReport, StepStats};
use super::source::{FsSourceReader, ImportedRow, Importer, SourceReader};
use super::step::{DuplicationBehaviour, ImportStep};
use crate::core::{ModelError, Result, ValueKey};
use crate::rows::{RowEditor, RowRecord};
use crate::storage::ModelObject;
use crate::transaction::{Transaction, TransactionManager};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

/// Runs import steps and bulk units in order against one container.
///
/// A step that fails is recorded in the report and the run moves on to the
/// next step. Only structural problems abort the run: a target that cannot be
/// resolved or opened, and transaction misuse.
#[derive(Clone)]
pub struct ImportStepRunner {
    transactions: TransactionManager,
    editor: RowEditor,
    importer: Arc<dyn Importer>,
    reader: Arc<dyn SourceReader>,
}

impl ImportStepRunner {
    pub fn new(transactions: TransactionManager, importer: Arc<dyn Importer>) -> Self {
        Self {
            transactions,
            editor: RowEditor::new(),
            importer,
            reader: Arc::new(FsSourceReader),
        }
    }

    pub fn with_reader(mut self, reader: Arc<dyn SourceReader>) -> Self {
        self.reader = reader;
        self
    }

    pub async fn run(&self, steps: &[ImportStep], target: &ModelObject) -> Result<ImportReport> {
        let plan: Vec<PlanStep> = steps.iter().cloned().map(PlanStep::Import).collect();
        self.run_plan(&plan, target).await
    }

    pub async fn run_plan(&self, steps: &[PlanStep], target: &ModelObject) -> Result<ImportReport> {
        let target = self.transactions.store().get(target.id).await?;
        if !target.is_openable() {
            return Err(ModelError::Unsupported(format!(
                "cannot import into {} '{}'",
                target.kind, target.name
            )));
        }

        let mut report = ImportReport::new();
        for step in steps {
            let id = step.id();
            let span = info_span!("import.step", step = %id, target = %target.name);

            match self.run_step(step, &target).instrument(span).await {
                Ok(stats) => {
                    event!(
                        Level::INFO,
                        step = %id,
                        inserted = stats.inserted,
                        updated = stats.updated,
                        skipped = stats.skipped,
                        commands = stats.commands,
                        "import step succeeded"
                    );
                    report.record_success(id);
                }
                Err(err) if err.is_usage_error() => return Err(err),
                Err(err) => {
                    let failure = ModelError::ImportStepFailure {
                        step: id.clone(),
                        reason: err.to_string(),
                    };
                    event!(Level::WARN, error = %failure, "import step failed");
                    report.record_failure(id, err.to_string());
                }
            }
        }

        event!(
            Level::INFO,
            target = %target.name,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "import run finished"
        );
        Ok(report)
    }

    async fn run_step(&self, step: &PlanStep, target: &ModelObject) -> Result<StepStats> {
        match step {
            PlanStep::Import(step) => self.import(step, target).await,
            PlanStep::Bulk(unit) => self.bulk(unit, target).await,
        }
    }

    async fn import(&self, step: &ImportStep, target: &ModelObject) -> Result<StepStats> {
        let source = self.reader.read(step.source_path()).await?;
        let rows = self.importer.decode(step, &source)?;

        let mut tx = self.transactions.begin(target).await?;
        match self.apply_rows(&mut tx, step, rows).await {
            Ok(stats) => {
                tx.commit().await?;
                Ok(stats)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        }
    }

    async fn apply_rows(
        &self,
        tx: &mut Transaction,
        step: &ImportStep,
        rows: Vec<ImportedRow>,
    ) -> Result<StepStats> {
        let options = step.options();
        let table = step.target_table();
        let key_field = options.match_field();

        let mut existing: HashMap<ValueKey, RowRecord> = HashMap::new();
        for row in self.editor.rows(tx, table).await? {
            if let Some(key) = row.get(key_field).and_then(|v| v.key()) {
                existing.entry(key).or_insert(row);
            }
        }

        let mut stats = StepStats::default();
        for row in rows {
            let key = row.fields.get(key_field).and_then(|v| v.key());
            let matched = key.as_ref().and_then(|k| existing.get(k)).cloned();

            let written = match matched {
                Some(current) => match options.duplication_behaviour {
                    DuplicationBehaviour::Overwrite => {
                        stats.updated += 1;
                        self.overwrite(tx, &current, row)?
                    }
                    DuplicationBehaviour::Prompt => {
                        stats.skipped += 1;
                        continue;
                    }
                },
                None if options.update_only => {
                    stats.skipped += 1;
                    continue;
                }
                None => {
                    stats.inserted += 1;
                    self.editor.insert(tx, table, row.fields, row.geometry)?
                }
            };
            if let Some(key) = key {
                existing.insert(key, written);
            }
        }

        if stats.skipped > 0 {
            event!(
                Level::DEBUG,
                table,
                key_field,
                skipped = stats.skipped,
                "rows skipped by duplication options"
            );
        }
        Ok(stats)
    }

    /// Merges incoming fields into a matched row. New geometry replaces the
    /// row, since geometry is not a field-level edit.
    fn overwrite(
        &self,
        tx: &mut Transaction,
        current: &RowRecord,
        incoming: ImportedRow,
    ) -> Result<RowRecord> {
        match incoming.geometry {
            None => self.editor.update(tx, current, incoming.fields),
            Some(geometry) => {
                let mut fields = current.fields.clone();
                fields.extend(incoming.fields);
                self.editor.delete(tx, current)?;
                self.editor.insert(tx, &current.table, fields, Some(geometry))
            }
        }
    }

    async fn bulk(&self, unit: &BulkUnit, target: &ModelObject) -> Result<StepStats> {
        let mut tx = self.transactions.begin(target).await?;
        for command in &unit.commands {
            if let Err(err) = self
                .editor
                .bulk_query(&mut tx, &command.table, &command.command)
                .await
            {
                tx.rollback().await?;
                return Err(err);
            }
        }
        tx.commit().await?;

        Ok(StepStats {
            commands: unit.commands.len(),
            ..StepStats::default()
        })
    }
}

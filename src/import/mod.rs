//! Step-isolated batch import.
//!
//! A plan is an ordered list of [`PlanStep`]s. Each step runs in its own
//! transaction against the target container, and a failing step only fails
//! itself.

pub mod plan;
pub mod report;
pub mod runner;
pub mod source;
pub mod step;

pub use plan::{BulkCommand, BulkUnit, ImportFolders, ImportPlan, PlanStep};
pub use report::{FailedStep, ImportReport, StepStats};
pub use runner::ImportStepRunner;
pub use source::{FsSourceReader, ImportedRow, Importer, JsonRowsImporter, SourceReader};
pub use step::{DuplicationBehaviour, ImportOptions, ImportStep, SourceFormat, UnitsBehaviour};

// ============================================================================
// ModelOps Library
// ============================================================================
//
// Orchestration over a hierarchical model database: object resolution and
// naming, transactional row edits, step-isolated batch import and simulation
// job tracking.
//
// ============================================================================

pub mod config;
pub mod core;
pub mod facade;
pub mod import;
pub mod jobs;
pub mod report;
pub mod rows;
pub mod storage;
pub mod telemetry;
pub mod transaction;

// Re-export main types for convenience
pub use config::PipelineConfig;
pub use core::{Fields, ModelError, ObjectId, ObjectKind, Point, Result, RowId, Value};
pub use facade::Workspace;
pub use import::{ImportOptions, ImportPlan, ImportReport, ImportStep, ImportStepRunner, PlanStep};
pub use jobs::{AggregateResult, JobHandle, JobOrchestrator, JobStatus};
pub use rows::{RowEditor, RowRecord};
pub use storage::{ModelObject, ObjectStore};
pub use transaction::{Transaction, TransactionManager, TransactionState};

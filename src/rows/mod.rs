//! Row records and the editor that changes them inside transactions.

pub mod editor;
pub mod executor;
pub mod record;

pub use editor::RowEditor;
pub use executor::{ExecutedCommand, QueryExecutor, QueryScope, RecordingExecutor};
pub use record::{MIN_RING_POINTS, RowRecord, close_ring, is_closed, validate_geometry};

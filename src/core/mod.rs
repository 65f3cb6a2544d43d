pub mod error;
pub mod types;
pub mod value;

pub use error::{ModelError, Result};
pub use types::{Fields, ObjectId, ObjectKind, Point, RowId};
pub use value::{Value, ValueKey};

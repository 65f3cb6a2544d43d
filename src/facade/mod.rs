pub mod workspace;

pub use workspace::{ClusterSetup, NODES_TABLE, POLYGON_ID_FIELD, POLYGON_TABLE, Workspace};

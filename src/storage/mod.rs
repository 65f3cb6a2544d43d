// ============================================================================
// Model Object Storage
// ============================================================================
//
// The object tree (groups, networks, runs, sims, geometry), the row tables
// held by openable objects and the optional snapshot file behind both.
//
// ============================================================================

pub mod container;
pub mod naming;
pub mod object;
pub mod path;
pub mod persistence;
pub mod store;

pub use container::ContainerData;
pub use naming::{MAX_VERSION_PROBES, names_match, unique_name};
pub use object::{ModelObject, NETWORK_PROPERTY, SCENARIO_PROPERTY, STATUS_PROPERTY};
pub use path::{PathSegment, format_path, parse_path};
pub use persistence::{SnapshotManager, SnapshotMetadata, StoreSnapshot};
pub use store::{BASE_SCENARIO, ObjectStore};

use super::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide id counters
static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_ROW_ID: AtomicU64 = AtomicU64::new(1);

/// Field name -> value mapping of a row record or object properties.
pub type Fields = BTreeMap<String, Value>;

/// Identifier of a model object, unique across the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl ObjectId {
    pub fn next() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::SeqCst))
    }

    /// Moves the counter past an id loaded from a snapshot.
    pub(crate) fn observe(id: ObjectId) {
        NEXT_OBJECT_ID.fetch_max(id.0 + 1, Ordering::SeqCst);
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a row inside a container's tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub u64);

impl RowId {
    pub fn next() -> Self {
        RowId(NEXT_ROW_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub(crate) fn observe(id: RowId) {
        NEXT_ROW_ID.fetch_max(id.0 + 1, Ordering::SeqCst);
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row_{}", self.0)
    }
}

/// Kind of a node in the model tree.
///
/// Capabilities are a property of the kind rather than something probed at
/// runtime: only [`ObjectKind::Network`] and [`ObjectKind::Geometry`] can be
/// opened as row containers, and containment follows
/// [`ObjectKind::accepts_child`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    Group,
    Network,
    Run,
    Sim,
    Geometry,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 5] = [
        ObjectKind::Group,
        ObjectKind::Network,
        ObjectKind::Run,
        ObjectKind::Sim,
        ObjectKind::Geometry,
    ];

    /// Short code used by the `>KIND~name` path syntax.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Group => "MODG",
            Self::Network => "NNET",
            Self::Run => "RUN",
            Self::Sim => "SIM",
            Self::Geometry => "GEOM",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.code().eq_ignore_ascii_case(code))
    }

    /// Display name used by the modeling database.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Group => "Model Group",
            Self::Network => "Model Network",
            Self::Run => "Run",
            Self::Sim => "Sim",
            Self::Geometry => "Geometry",
        }
    }

    pub fn is_openable(&self) -> bool {
        matches!(self, Self::Network | Self::Geometry)
    }

    pub fn accepts_child(&self, child: ObjectKind) -> bool {
        match self {
            Self::Group => matches!(
                child,
                Self::Group | Self::Network | Self::Run | Self::Geometry
            ),
            Self::Run => child == Self::Sim,
            Self::Network | Self::Sim | Self::Geometry => false,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_generation() {
        let a = ObjectId::next();
        let b = ObjectId::next();
        assert!(b > a);
    }

    #[test]
    fn test_kind_codes_round_trip() {
        for kind in ObjectKind::ALL {
            assert_eq!(ObjectKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ObjectKind::from_code("modg"), Some(ObjectKind::Group));
        assert_eq!(ObjectKind::from_code("XYZ"), None);
    }

    #[test]
    fn test_containment_rules() {
        assert!(ObjectKind::Group.accepts_child(ObjectKind::Network));
        assert!(ObjectKind::Run.accepts_child(ObjectKind::Sim));
        assert!(!ObjectKind::Group.accepts_child(ObjectKind::Sim));
        assert!(!ObjectKind::Network.accepts_child(ObjectKind::Group));
        assert!(ObjectKind::Network.is_openable());
        assert!(!ObjectKind::Run.is_openable());
    }
}

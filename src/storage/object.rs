use crate::core::{Fields, ObjectId, ObjectKind, Value};
use serde::{Deserialize, Serialize};

/// Property of a Run naming the network it simulates.
pub const NETWORK_PROPERTY: &str = "network";
/// Property of a Sim naming its scenario.
pub const SCENARIO_PROPERTY: &str = "scenario";
/// Property of a Sim holding the last known job status.
pub const STATUS_PROPERTY: &str = "status";

/// A node of the model tree as seen by callers.
///
/// This is a detached view: `parent` and `children` are ids into the owning
/// [`ObjectStore`](super::ObjectStore), which remains the only owner of the
/// tree. Re-read the object after mutating the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelObject {
    pub id: ObjectId,
    pub name: String,
    pub kind: ObjectKind,
    pub parent: Option<ObjectId>,
    pub children: Vec<ObjectId>,
    #[serde(default)]
    pub properties: Fields,
}

impl ModelObject {
    pub fn is_openable(&self) -> bool {
        self.kind.is_openable()
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Network referenced by a Run.
    pub fn network_id(&self) -> Option<ObjectId> {
        self.property(NETWORK_PROPERTY)
            .and_then(Value::as_i64)
            .map(|id| ObjectId(id as u64))
    }
}

/// Stored form of a tree node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ObjectNode {
    pub id: ObjectId,
    pub name: String,
    pub kind: ObjectKind,
    pub parent: Option<ObjectId>,
    pub children: Vec<ObjectId>,
    pub properties: Fields,
}

impl ObjectNode {
    pub fn new(kind: ObjectKind, name: impl Into<String>, parent: Option<ObjectId>) -> Self {
        Self {
            id: ObjectId::next(),
            name: name.into(),
            kind,
            parent,
            children: Vec::new(),
            properties: Fields::new(),
        }
    }

    pub fn view(&self) -> ModelObject {
        ModelObject {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind,
            parent: self.parent,
            children: self.children.clone(),
            properties: self.properties.clone(),
        }
    }
}

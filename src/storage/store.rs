use super::container::ContainerData;
use super::naming::{names_match, unique_name};
use super::object::{ModelObject, NETWORK_PROPERTY, ObjectNode, SCENARIO_PROPERTY};
use super::path::{PathSegment, format_path, parse_path};
use super::persistence::{SnapshotManager, StoreSnapshot};
use crate::core::{Fields, ModelError, ObjectId, ObjectKind, Result, RowId, Value};
use crate::rows::RowRecord;
use crate::transaction::TransactionId;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// Scenario given to the single Sim of a run created without scenarios.
pub const BASE_SCENARIO: &str = "Base";

// ============================================================================
// Store State
// ============================================================================

/// The whole tree plus the row tables of every openable object.
///
/// All maps are persistent, so a mutation works on a cheap clone that is
/// swapped in only after it succeeded and was persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct StoreState {
    nodes: im::OrdMap<ObjectId, ObjectNode>,
    roots: Vec<ObjectId>,
    containers: im::HashMap<ObjectId, ContainerData>,
}

impl StoreState {
    pub(crate) fn node(&self, id: ObjectId) -> Result<&ObjectNode> {
        self.nodes
            .get(&id)
            .ok_or_else(|| ModelError::NotFound(format!("object {}", id)))
    }

    fn node_mut(&mut self, id: ObjectId) -> Result<&mut ObjectNode> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| ModelError::NotFound(format!("object {}", id)))
    }

    fn siblings(&self, parent: Option<ObjectId>) -> Result<Vec<ObjectId>> {
        match parent {
            None => Ok(self.roots.clone()),
            Some(id) => Ok(self.node(id)?.children.clone()),
        }
    }

    fn sibling_names(&self, parent: Option<ObjectId>, except: Option<ObjectId>) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for id in self.siblings(parent)? {
            if Some(id) != except {
                names.push(self.node(id)?.name.clone());
            }
        }
        Ok(names)
    }

    fn unique_child_name(
        &self,
        parent: Option<ObjectId>,
        base: &str,
        except: Option<ObjectId>,
    ) -> Result<String> {
        let names = self.sibling_names(parent, except)?;
        Ok(unique_name(names.iter().map(String::as_str), base))
    }

    fn find_child(
        &self,
        parent: Option<ObjectId>,
        kind: Option<ObjectKind>,
        name: &str,
    ) -> Result<Option<ObjectId>> {
        for id in self.siblings(parent)? {
            let node = self.node(id)?;
            if kind.is_none_or(|k| k == node.kind) && names_match(&node.name, name) {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    fn first_of_kind(&self, kind: ObjectKind, name: &str) -> Option<&ObjectNode> {
        self.nodes
            .values()
            .find(|node| node.kind == kind && names_match(&node.name, name))
    }

    fn check_placement(&self, parent: Option<ObjectId>, kind: ObjectKind) -> Result<()> {
        let (allowed, place) = match parent {
            None => (kind == ObjectKind::Group, "the database root".to_string()),
            Some(id) => {
                let node = self.node(id)?;
                (
                    node.kind.accepts_child(kind),
                    format!("{} '{}'", node.kind, node.name),
                )
            }
        };
        if allowed {
            Ok(())
        } else {
            Err(ModelError::ValidationError(format!(
                "a {} cannot be placed under {}",
                kind, place
            )))
        }
    }

    /// Creates a node, renaming it when a sibling already uses the name.
    pub(crate) fn insert_node(
        &mut self,
        parent: Option<ObjectId>,
        kind: ObjectKind,
        name: &str,
    ) -> Result<ObjectId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ModelError::ValidationError(
                "object name cannot be empty".to_string(),
            ));
        }
        self.check_placement(parent, kind)?;
        let name = self.unique_child_name(parent, name, None)?;
        let node = ObjectNode::new(kind, name, parent);
        let id = node.id;
        if kind.is_openable() {
            self.containers.insert(id, ContainerData::new());
        }
        self.attach(node)?;
        Ok(id)
    }

    fn attach(&mut self, node: ObjectNode) -> Result<()> {
        let id = node.id;
        match node.parent {
            None => self.roots.push(id),
            Some(parent) => self.node_mut(parent)?.children.push(id),
        }
        self.nodes.insert(id, node);
        Ok(())
    }

    fn detach(&mut self, id: ObjectId) -> Result<()> {
        match self.node(id)?.parent {
            None => self.roots.retain(|root| *root != id),
            Some(parent) => self.node_mut(parent)?.children.retain(|child| *child != id),
        }
        Ok(())
    }

    /// Ids of `id` and all its descendants, parents before children.
    fn subtree(&self, id: ObjectId) -> Result<Vec<ObjectId>> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.node(current)?;
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        Ok(out)
    }

    fn remove_subtree(&mut self, id: ObjectId) -> Result<usize> {
        let ids = self.subtree(id)?;
        self.detach(id)?;
        for removed in &ids {
            self.nodes.remove(removed);
            self.containers.remove(removed);
        }
        Ok(ids.len())
    }

    fn is_ancestor_or_self(&self, ancestor: ObjectId, of: ObjectId) -> Result<bool> {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == ancestor {
                return Ok(true);
            }
            current = self.node(id)?.parent;
        }
        Ok(false)
    }

    fn clone_subtree(
        &mut self,
        source: ObjectId,
        parent: ObjectId,
        name: String,
        remap: &mut HashMap<ObjectId, ObjectId>,
    ) -> Result<ObjectId> {
        let original = self.node(source)?.clone();
        let mut copy = ObjectNode::new(original.kind, name, Some(parent));
        copy.properties = original.properties.clone();
        let copy_id = copy.id;
        remap.insert(source, copy_id);

        if let Some(data) = self.containers.get(&source).cloned() {
            self.containers.insert(copy_id, data);
        }
        self.attach(copy)?;

        for child in original.children {
            let child_name = self.node(child)?.name.clone();
            self.clone_subtree(child, copy_id, child_name, remap)?;
        }
        Ok(copy_id)
    }

    /// Points run -> network references at the copies when both ends were
    /// copied together.
    fn remap_references(&mut self, remap: &HashMap<ObjectId, ObjectId>) {
        for copy_id in remap.values() {
            if let Some(node) = self.nodes.get_mut(copy_id)
                && let Some(old) = node.properties.get(NETWORK_PROPERTY).and_then(Value::as_i64)
                && let Some(new) = remap.get(&ObjectId(old as u64))
            {
                node.properties
                    .insert(NETWORK_PROPERTY.to_string(), Value::from(new.as_u64()));
            }
        }
    }

    fn path_segments(&self, id: ObjectId) -> Result<Vec<PathSegment>> {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id)?;
            segments.push(PathSegment::new(node.kind, node.name.clone()));
            current = node.parent;
        }
        segments.reverse();
        Ok(segments)
    }

    fn container(&self, id: ObjectId) -> Result<&ContainerData> {
        let node = self.node(id)?;
        if !node.kind.is_openable() {
            return Err(ModelError::Unsupported(format!(
                "{} '{}' cannot be opened",
                node.kind, node.name
            )));
        }
        self.containers.get(&id).ok_or_else(|| {
            ModelError::NotFound(format!("row data of {} '{}'", node.kind, node.name))
        })
    }

    pub(crate) fn object_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub(crate) fn row_count(&self) -> usize {
        self.containers.values().map(ContainerData::row_count).sum()
    }

    /// Advances the process-wide id counters past everything in this state.
    fn observe_ids(&self) {
        if let Some((id, _)) = self.nodes.get_max() {
            ObjectId::observe(*id);
        }
        if let Some(row) = self.containers.values().filter_map(ContainerData::max_row_id).max() {
            RowId::observe(row);
        }
    }
}

// ============================================================================
// Object Store
// ============================================================================

/// Hierarchical registry of named, typed model objects.
///
/// Cloning the store is cheap and every clone sees the same tree. When opened
/// on a snapshot path, each mutating call persists the new tree before the
/// change becomes visible to readers.
#[derive(Clone, Default)]
pub struct ObjectStore {
    state: Arc<RwLock<StoreState>>,
    snapshots: Option<Arc<SnapshotManager>>,
    /// Containers with an open transaction, and which one.
    editing: Arc<Mutex<HashMap<ObjectId, TransactionId>>>,
}

impl ObjectStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens a snapshot-backed store, loading the snapshot when it exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let manager = SnapshotManager::new(path);
        let state = match manager.load()? {
            Some(snapshot) => {
                info!(
                    "loaded model snapshot {} ({} objects, {} rows)",
                    manager.path().display(),
                    snapshot.metadata.object_count,
                    snapshot.metadata.row_count
                );
                snapshot.state
            }
            None => StoreState::default(),
        };
        state.observe_ids();

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            snapshots: Some(Arc::new(manager)),
            editing: Arc::default(),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshots.as_deref().map(SnapshotManager::path)
    }

    /// Writes the current tree to the snapshot file, if any.
    pub async fn flush(&self) -> Result<()> {
        let state = self.state.read().await;
        self.persist(&state)
    }

    fn persist(&self, state: &StoreState) -> Result<()> {
        match &self.snapshots {
            Some(manager) => manager.save(&StoreSnapshot::new(state.clone())),
            None => Ok(()),
        }
    }

    async fn read<T>(&self, f: impl FnOnce(&StoreState) -> Result<T>) -> Result<T> {
        let state = self.state.read().await;
        f(&state)
    }

    async fn mutate<T>(&self, f: impl FnOnce(&mut StoreState) -> Result<T>) -> Result<T> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        let out = f(&mut next)?;
        self.persist(&next)?;
        *state = next;
        Ok(out)
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    pub async fn get(&self, id: ObjectId) -> Result<ModelObject> {
        self.read(|state| Ok(state.node(id)?.view())).await
    }

    pub async fn roots(&self) -> Result<Vec<ModelObject>> {
        self.read(|state| {
            state
                .roots
                .iter()
                .map(|id| state.node(*id).map(ObjectNode::view))
                .collect()
        })
        .await
    }

    pub async fn children(&self, parent: &ModelObject) -> Result<Vec<ModelObject>> {
        self.read(|state| {
            state
                .siblings(Some(parent.id))?
                .into_iter()
                .map(|id| state.node(id).map(ObjectNode::view))
                .collect()
        })
        .await
    }

    /// Walks from the root, matching each segment against child names.
    pub async fn resolve_path<S: AsRef<str>>(&self, segments: &[S]) -> Result<ModelObject> {
        if segments.is_empty() {
            return Err(ModelError::ValidationError("empty object path".to_string()));
        }
        self.read(|state| {
            let mut parent = None;
            for (depth, segment) in segments.iter().enumerate() {
                let segment = segment.as_ref();
                let found = state.find_child(parent, None, segment)?.ok_or_else(|| {
                    let walked: Vec<&str> =
                        segments[..=depth].iter().map(|s| s.as_ref()).collect();
                    ModelError::NotFound(format!("path '{}'", walked.join(">")))
                })?;
                parent = Some(found);
            }
            let id = parent.ok_or_else(|| ModelError::NotFound("empty path".to_string()))?;
            Ok(state.node(id)?.view())
        })
        .await
    }

    /// First object of `kind` named `name` anywhere in the tree, in id order.
    pub async fn resolve(&self, kind: ObjectKind, name: &str) -> Result<ModelObject> {
        self.read(|state| {
            state
                .first_of_kind(kind, name)
                .map(ObjectNode::view)
                .ok_or_else(|| {
                    ModelError::NotFound(format!("{}", PathSegment::new(kind, name)))
                })
        })
        .await
    }

    /// Resolves `>KIND~name[>KIND~name...]`. The first segment is looked up
    /// anywhere in the tree, the rest as typed children.
    pub async fn resolve_str(&self, path: &str) -> Result<ModelObject> {
        let segments = parse_path(path)?;
        self.read(|state| {
            let first = &segments[0];
            let mut current = state
                .first_of_kind(first.kind, &first.name)
                .map(|node| node.id)
                .ok_or_else(|| ModelError::NotFound(first.to_string()))?;
            for (depth, segment) in segments.iter().enumerate().skip(1) {
                current = state
                    .find_child(Some(current), Some(segment.kind), &segment.name)?
                    .ok_or_else(|| {
                        ModelError::NotFound(format!("path '{}'", format_path(&segments[..=depth])))
                    })?;
            }
            Ok(state.node(current)?.view())
        })
        .await
    }

    pub async fn find_child(
        &self,
        parent: &ModelObject,
        kind: ObjectKind,
        name: &str,
    ) -> Result<Option<ModelObject>> {
        self.read(|state| {
            state
                .find_child(Some(parent.id), Some(kind), name)?
                .map(|id| state.node(id).map(ObjectNode::view))
                .transpose()
        })
        .await
    }

    /// Every object of `kind`, in id order.
    pub async fn collection(&self, kind: ObjectKind) -> Result<Vec<ModelObject>> {
        self.read(|state| {
            Ok(state
                .nodes
                .values()
                .filter(|node| node.kind == kind)
                .map(ObjectNode::view)
                .collect())
        })
        .await
    }

    pub async fn object_by_kind_and_id(&self, kind: ObjectKind, id: ObjectId) -> Result<ModelObject> {
        let object = self.get(id).await?;
        if object.kind != kind {
            return Err(ModelError::NotFound(format!("{} with id={}", kind, id)));
        }
        Ok(object)
    }

    pub async fn path_of(&self, object: &ModelObject) -> Result<String> {
        self.read(|state| Ok(format_path(&state.path_segments(object.id)?)))
            .await
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// Returns the group named `name`, creating it at the root when absent.
    ///
    /// Lookup and creation happen under one write lock, so concurrent calls
    /// with the same name all get the same group.
    pub async fn ensure_group(&self, name: &str) -> Result<ModelObject> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.first_of_kind(ObjectKind::Group, name) {
            return Ok(existing.view());
        }

        let mut next = state.clone();
        let id = next.insert_node(None, ObjectKind::Group, name)?;
        self.persist(&next)?;
        *state = next;
        info!("created group '{}' (ID {})", name, id);
        Ok(state.node(id)?.view())
    }

    pub async fn unique_name_in(&self, parent: &ModelObject, base_name: &str) -> Result<String> {
        self.read(|state| state.unique_child_name(Some(parent.id), base_name, None))
            .await
    }

    /// Creates a child object. A name already used by a sibling is replaced
    /// with the next free versioned name.
    pub async fn create(
        &self,
        parent: &ModelObject,
        kind: ObjectKind,
        name: &str,
    ) -> Result<ModelObject> {
        self.mutate(|state| {
            let id = state.insert_node(Some(parent.id), kind, name)?;
            Ok(state.node(id)?.view())
        })
        .await
    }

    /// Deep-clones `source` and its subtree into `dest_group` with fresh ids.
    pub async fn copy_into(
        &self,
        dest_group: &ModelObject,
        source: &ModelObject,
        rename_if_conflict: bool,
    ) -> Result<ModelObject> {
        let copied = self
            .mutate(|state| {
                let dest = state.node(dest_group.id)?.clone();
                let original = state.node(source.id)?.clone();

                if !dest.kind.accepts_child(original.kind) {
                    return Err(ModelError::CopyFailed(format!(
                        "cannot copy {} '{}' into {} '{}'",
                        original.kind, original.name, dest.kind, dest.name
                    )));
                }
                if state.is_ancestor_or_self(original.id, dest.id)? {
                    return Err(ModelError::CopyFailed(format!(
                        "cannot copy '{}' into its own subtree",
                        original.name
                    )));
                }

                let name = match state.find_child(Some(dest.id), None, &original.name)? {
                    None => original.name.clone(),
                    Some(_) if rename_if_conflict => {
                        state.unique_child_name(Some(dest.id), &original.name, None)?
                    }
                    Some(_) => {
                        return Err(ModelError::CopyFailed(format!(
                            "'{}' already contains an object named '{}'",
                            dest.name, original.name
                        )));
                    }
                };

                let mut remap = HashMap::new();
                let copy_id = state.clone_subtree(original.id, dest.id, name, &mut remap)?;
                state.remap_references(&remap);
                Ok(state.node(copy_id)?.view())
            })
            .await?;

        info!(
            "copied '{}' (ID {}) -> '{}' (ID {})",
            source.name, source.id, copied.name, copied.id
        );
        Ok(copied)
    }

    /// Renames an object; a name taken by a sibling gets the next free version.
    pub async fn rename(&self, object: &ModelObject, new_name: &str) -> Result<ModelObject> {
        self.mutate(|state| {
            let new_name = new_name.trim();
            if new_name.is_empty() {
                return Err(ModelError::ValidationError(
                    "object name cannot be empty".to_string(),
                ));
            }
            let parent = state.node(object.id)?.parent;
            let name = state.unique_child_name(parent, new_name, Some(object.id))?;
            let node = state.node_mut(object.id)?;
            node.name = name;
            Ok(node.view())
        })
        .await
    }

    /// Deletes an object and its subtree. Returns the number of removed objects.
    ///
    /// Fails with `TransactionConflict` while any container in the subtree
    /// has an open transaction.
    pub async fn delete(&self, object: &ModelObject) -> Result<usize> {
        let removed = self
            .mutate(|state| {
                let editing = self.editing.lock()?;
                for id in state.subtree(object.id)? {
                    if let Some(txn) = editing.get(&id) {
                        return Err(ModelError::TransactionConflict(format!(
                            "cannot delete '{}': object {} has open transaction {}",
                            object.name, id, txn
                        )));
                    }
                }
                state.remove_subtree(object.id)
            })
            .await?;
        info!("deleted '{}' (ID {}) and {} descendants", object.name, object.id, removed - 1);
        Ok(removed)
    }

    pub async fn set_property(
        &self,
        object: &ModelObject,
        key: &str,
        value: Value,
    ) -> Result<ModelObject> {
        self.mutate(|state| {
            let node = state.node_mut(object.id)?;
            node.properties.insert(key.to_string(), value);
            Ok(node.view())
        })
        .await
    }

    /// Creates a Run for `network` in `group` with one Sim per scenario.
    pub async fn create_run(
        &self,
        group: &ModelObject,
        name: &str,
        network: &ModelObject,
        scenarios: &[String],
        properties: Fields,
    ) -> Result<ModelObject> {
        self.mutate(|state| {
            let network_node = state.node(network.id)?;
            if network_node.kind != ObjectKind::Network {
                return Err(ModelError::ValidationError(format!(
                    "'{}' is a {}, runs need a {}",
                    network_node.name,
                    network_node.kind,
                    ObjectKind::Network
                )));
            }

            let run_id = state.insert_node(Some(group.id), ObjectKind::Run, name)?;
            let run = state.node_mut(run_id)?;
            run.properties.extend(properties);
            run.properties
                .insert(NETWORK_PROPERTY.to_string(), Value::from(network.id.as_u64()));

            let base = [BASE_SCENARIO.to_string()];
            let scenarios = if scenarios.is_empty() { &base[..] } else { scenarios };
            for scenario in scenarios {
                let sim_id = state.insert_node(Some(run_id), ObjectKind::Sim, scenario)?;
                state
                    .node_mut(sim_id)?
                    .properties
                    .insert(SCENARIO_PROPERTY.to_string(), Value::from(scenario.as_str()));
            }
            Ok(state.node(run_id)?.view())
        })
        .await
    }

    /// Creates a Run in `dest_group` with the scenarios and properties of
    /// `source_run`, simulating `network`.
    pub async fn copy_run(
        &self,
        source_run: &ModelObject,
        dest_group: &ModelObject,
        network: &ModelObject,
        new_name: &str,
    ) -> Result<ModelObject> {
        let (scenarios, properties) = self
            .read(|state| {
                let run = state.node(source_run.id)?;
                if run.kind != ObjectKind::Run {
                    return Err(ModelError::ValidationError(format!(
                        "'{}' is a {}, not a {}",
                        run.name,
                        run.kind,
                        ObjectKind::Run
                    )));
                }
                let mut scenarios: Vec<String> = Vec::new();
                for sim in &run.children {
                    let sim = state.node(*sim)?;
                    let scenario = sim
                        .properties
                        .get(SCENARIO_PROPERTY)
                        .and_then(Value::as_str)
                        .filter(|s| !s.is_empty())
                        .unwrap_or(BASE_SCENARIO);
                    if !scenarios.iter().any(|known| known == scenario) {
                        scenarios.push(scenario.to_string());
                    }
                }
                let mut properties = run.properties.clone();
                properties.remove(NETWORK_PROPERTY);
                Ok((scenarios, properties))
            })
            .await?;

        self.create_run(dest_group, new_name, network, &scenarios, properties)
            .await
    }

    // ------------------------------------------------------------------------
    // Row data
    // ------------------------------------------------------------------------

    /// Committed rows of `table` in an openable object.
    pub async fn rows(&self, container: &ModelObject, table: &str) -> Result<Vec<RowRecord>> {
        self.read(|state| Ok(state.container(container.id)?.rows(table)))
            .await
    }

    pub async fn tables(&self, container: &ModelObject) -> Result<Vec<String>> {
        self.read(|state| Ok(state.container(container.id)?.table_names()))
            .await
    }

    /// Registers `txn` as the editor of a container that still exists.
    pub(crate) async fn claim(&self, container: &ModelObject, txn: TransactionId) -> Result<()> {
        self.read(|state| {
            state.container(container.id)?;
            let mut editing = self.editing.lock()?;
            if let Some(holder) = editing.get(&container.id) {
                return Err(ModelError::TransactionConflict(format!(
                    "{} '{}' already has open transaction {}",
                    container.kind, container.name, holder
                )));
            }
            editing.insert(container.id, txn);
            Ok(())
        })
        .await
    }

    pub(crate) fn release(&self, container: ObjectId, txn: TransactionId) -> Result<()> {
        let mut editing = self.editing.lock()?;
        if editing.get(&container) == Some(&txn) {
            editing.remove(&container);
        }
        Ok(())
    }

    pub(crate) fn editor_of(&self, container: ObjectId) -> Result<Option<TransactionId>> {
        Ok(self.editing.lock()?.get(&container).copied())
    }

    pub(crate) fn editing_count(&self) -> Result<usize> {
        Ok(self.editing.lock()?.len())
    }

    pub(crate) async fn container_data(&self, id: ObjectId) -> Result<ContainerData> {
        self.read(|state| state.container(id).cloned()).await
    }

    /// Replaces the tables of a container. Returns the tables it replaced.
    pub(crate) async fn install_container(
        &self,
        id: ObjectId,
        data: ContainerData,
    ) -> Result<ContainerData> {
        self.mutate(|state| {
            let previous = state.container(id)?.clone();
            state.containers.insert(id, data);
            Ok(previous)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_renames_on_collision() {
        let store = ObjectStore::in_memory();
        let group = store.ensure_group("Clusters").await.unwrap();
        let first = store.create(&group, ObjectKind::Network, "5k").await.unwrap();
        let second = store.create(&group, ObjectKind::Network, "5K").await.unwrap();

        assert_eq!(first.name, "5k");
        assert_eq!(second.name, "5K_v001");
        assert_eq!(store.children(&group).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_root_only_holds_groups() {
        let store = ObjectStore::in_memory();
        let group = store.ensure_group("Models").await.unwrap();
        let net = store.create(&group, ObjectKind::Network, "base").await.unwrap();

        let err = store.create(&net, ObjectKind::Group, "inner").await.unwrap_err();
        assert!(matches!(err, ModelError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_subtree_and_rows() {
        let store = ObjectStore::in_memory();
        let group = store.ensure_group("Scratch").await.unwrap();
        let net = store.create(&group, ObjectKind::Network, "n").await.unwrap();
        store
            .create_run(&group, "r", &net, &[], Fields::new())
            .await
            .unwrap();

        let removed = store.delete(&group).await.unwrap();
        assert_eq!(removed, 4);
        assert!(store.get(net.id).await.is_err());
        assert!(store.collection(ObjectKind::Sim).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_path_of() {
        let store = ObjectStore::in_memory();
        let group = store.ensure_group("Clusters").await.unwrap();
        let net = store.create(&group, ObjectKind::Network, "5k").await.unwrap();
        assert_eq!(store.path_of(&net).await.unwrap(), ">MODG~Clusters>NNET~5k");
    }

    #[tokio::test]
    async fn test_rows_of_non_container_is_unsupported() {
        let store = ObjectStore::in_memory();
        let group = store.ensure_group("Clusters").await.unwrap();
        assert!(matches!(
            store.rows(&group, "hw_polygon").await,
            Err(ModelError::Unsupported(_))
        ));
    }
}

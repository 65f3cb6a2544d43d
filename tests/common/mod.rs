#![allow(dead_code)]

use async_trait::async_trait;
use modelops::core::{Fields, ModelError, ObjectKind, Result, Value};
use modelops::import::SourceReader;
use modelops::jobs::SimulationRunner;
use modelops::rows::RecordingExecutor;
use modelops::{ModelObject, Workspace};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const SOURCE_GROUP: &str = "2D Demo - 2d rain";

pub fn fields(pairs: &[(&str, Value)]) -> Fields {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// Workspace with a source group holding network "5k" with two nodes.
pub async fn demo_workspace() -> (Workspace, Arc<RecordingExecutor>) {
    let executor = Arc::new(RecordingExecutor::new());
    let workspace = Workspace::in_memory(executor.clone());
    let group = workspace.store().ensure_group(SOURCE_GROUP).await.unwrap();
    let network = workspace
        .store()
        .create(&group, ObjectKind::Network, "5k")
        .await
        .unwrap();

    let mut tx = workspace.begin(&network).await.unwrap();
    for (id, x, y) in [("MH1", 100.0, 200.0), ("MH2", 150.0, 250.0)] {
        workspace
            .editor()
            .insert(
                &mut tx,
                "_nodes",
                fields(&[
                    ("node_id", Value::from(id)),
                    ("x", Value::from(x)),
                    ("y", Value::from(y)),
                ]),
                None,
            )
            .unwrap();
    }
    tx.commit().await.unwrap();

    (workspace, executor)
}

pub async fn source_network(workspace: &Workspace) -> ModelObject {
    workspace.network_in_group(SOURCE_GROUP, "5k").await.unwrap()
}

/// Serves import sources from memory.
#[derive(Default)]
pub struct MemoryReader {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryReader {
    pub fn with(mut self, path: &str, body: &str) -> Self {
        self.files.insert(PathBuf::from(path), body.as_bytes().to_vec());
        self
    }
}

#[async_trait]
impl SourceReader for MemoryReader {
    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| ModelError::NotFound(format!("source {}", path.display())))
    }
}

/// Simulation that sleeps for a per-sim duration, failing sims named "bad".
pub struct SleepRunner {
    default: Duration,
    per_sim: HashMap<String, Duration>,
}

impl SleepRunner {
    pub fn new(default: Duration) -> Self {
        Self {
            default,
            per_sim: HashMap::new(),
        }
    }

    pub fn with(mut self, sim_name: &str, duration: Duration) -> Self {
        self.per_sim.insert(sim_name.to_string(), duration);
        self
    }
}

#[async_trait]
impl SimulationRunner for SleepRunner {
    async fn run(&self, sim: &ModelObject) -> Result<()> {
        let duration = self.per_sim.get(&sim.name).copied().unwrap_or(self.default);
        tokio::time::sleep(duration).await;
        if sim.name == "bad" {
            return Err(ModelError::ValidationError("simulation diverged".to_string()));
        }
        Ok(())
    }
}

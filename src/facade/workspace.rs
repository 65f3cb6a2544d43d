use crate::config::PipelineConfig;
use crate::core::{Fields, ModelError, ObjectId, ObjectKind, Point, Result, Value};
use crate::import::{ImportStepRunner, Importer};
use crate::jobs::{AggregateResult, JobOrchestrator, SimulationAgent};
use crate::rows::{QueryExecutor, RowEditor, RowRecord, close_ring};
use crate::storage::{ModelObject, ObjectStore, STATUS_PROPERTY};
use crate::transaction::{Transaction, TransactionManager};
use log::{info, warn};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

pub const NODES_TABLE: &str = "_nodes";
pub const POLYGON_TABLE: &str = "hw_polygon";
pub const POLYGON_ID_FIELD: &str = "polygon_id";

/// Objects created by [`Workspace::prepare_clusters`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSetup {
    pub network: Option<ModelObject>,
    pub run: Option<ModelObject>,
    pub jobs: Option<AggregateResult>,
}

/// Everything an operation needs to act on one model database.
///
/// Passed explicitly to every workflow instead of a process-wide "current
/// database" handle.
#[derive(Clone)]
pub struct Workspace {
    store: ObjectStore,
    transactions: TransactionManager,
    editor: RowEditor,
    config: PipelineConfig,
}

impl Workspace {
    pub fn new(store: ObjectStore, executor: Arc<dyn QueryExecutor>, config: PipelineConfig) -> Self {
        Self {
            transactions: TransactionManager::new(store.clone(), executor),
            store,
            editor: RowEditor::new(),
            config,
        }
    }

    /// Opens the snapshot named by `config.model_path`.
    pub fn open(config: PipelineConfig, executor: Arc<dyn QueryExecutor>) -> Result<Self> {
        config.validate().map_err(ModelError::ValidationError)?;
        let store = ObjectStore::open(&config.model_path)?;
        Ok(Self::new(store, executor, config))
    }

    pub fn in_memory(executor: Arc<dyn QueryExecutor>) -> Self {
        Self::new(ObjectStore::in_memory(), executor, PipelineConfig::default())
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn transactions(&self) -> &TransactionManager {
        &self.transactions
    }

    pub fn editor(&self) -> &RowEditor {
        &self.editor
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn import_runner(&self, importer: Arc<dyn Importer>) -> ImportStepRunner {
        ImportStepRunner::new(self.transactions.clone(), importer)
    }

    /// Orchestrator over `agent`, connected with `agent_threads` slots and
    /// polling at `poll_interval_ms`.
    pub async fn job_orchestrator(&self, agent: Arc<dyn SimulationAgent>) -> Result<JobOrchestrator> {
        let orchestrator =
            JobOrchestrator::new(agent).with_poll_interval(self.config.poll_interval_duration());
        orchestrator.connect(self.config.agent_threads).await?;
        Ok(orchestrator)
    }

    pub async fn begin(&self, container: &ModelObject) -> Result<Transaction> {
        self.transactions.begin(container).await
    }

    /// Runs `f` in a transaction on `container`: commits when it returns
    /// `Ok`, rolls back when it returns `Err`.
    pub async fn with_transaction<T, F>(&self, container: &ModelObject, f: F) -> Result<T>
    where
        F: for<'a> FnOnce(
            &'a mut Transaction,
            &'a RowEditor,
        ) -> Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>,
    {
        let mut tx = self.begin(container).await?;
        match f(&mut tx, &self.editor).await {
            Ok(value) => {
                if tx.state().is_open() {
                    tx.commit().await?;
                }
                Ok(value)
            }
            Err(err) => {
                if tx.state().is_open() {
                    tx.rollback().await?;
                }
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    pub async fn find_group(&self, name: &str) -> Result<ModelObject> {
        self.store.resolve(ObjectKind::Group, name).await
    }

    pub async fn network_in_group(&self, group_name: &str, network_name: &str) -> Result<ModelObject> {
        self.child_in_group(group_name, ObjectKind::Network, network_name)
            .await
    }

    pub async fn run_in_group(&self, group_name: &str, run_name: &str) -> Result<ModelObject> {
        self.child_in_group(group_name, ObjectKind::Run, run_name).await
    }

    async fn child_in_group(
        &self,
        group_name: &str,
        kind: ObjectKind,
        name: &str,
    ) -> Result<ModelObject> {
        let group = self.find_group(group_name).await?;
        self.store
            .find_child(&group, kind, name)
            .await?
            .ok_or_else(|| {
                ModelError::NotFound(format!("{} '{}' in group '{}'", kind, name, group.name))
            })
    }

    // ------------------------------------------------------------------------
    // Workflows
    // ------------------------------------------------------------------------

    /// Copies a network into `dest_group` (created when missing), renaming
    /// the copy when the group already holds that name.
    pub async fn copy_network_to_group(
        &self,
        source_group: &str,
        network_name: &str,
        dest_group: &str,
    ) -> Result<ModelObject> {
        let network = self.network_in_group(source_group, network_name).await?;
        let dest = self.store.ensure_group(dest_group).await?;
        let copy = self.store.copy_into(&dest, &network, true).await?;
        info!(
            "copied network '{}' into group '{}' as '{}' (ID {})",
            network.name, dest.name, copy.name, copy.id
        );
        Ok(copy)
    }

    /// [`copy_network_to_group`](Self::copy_network_to_group) with the names
    /// from the pipeline config.
    pub async fn copy_source_network(&self) -> Result<ModelObject> {
        self.copy_network_to_group(
            &self.config.source_group_name,
            &self.config.source_network_name,
            &self.config.clusters_group_name,
        )
        .await
    }

    /// Creates a run in `dest_group` shaped like `source_run`, simulating the
    /// destination group's copy of the configured source network.
    pub async fn create_run_from(
        &self,
        source_group: &str,
        source_run: &str,
        dest_group: &str,
        dest_run_name: Option<&str>,
    ) -> Result<ModelObject> {
        let run = self.run_in_group(source_group, source_run).await?;
        let network = self
            .network_in_group(dest_group, &self.config.source_network_name)
            .await?;
        let dest = self.find_group(dest_group).await?;

        let name = match dest_run_name {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => format!("{}_copy", run.name),
        };
        let created = self.store.copy_run(&run, &dest, &network, &name).await?;
        info!(
            "created run '{}' (ID {}) in group '{}' using network '{}'",
            created.name, created.id, dest.name, network.name
        );
        Ok(created)
    }

    /// Inserts a polygon row with `ring` as its boundary.
    pub async fn insert_polygon(
        &self,
        network: &ModelObject,
        polygon_id: &str,
        ring: Vec<Point>,
    ) -> Result<RowRecord> {
        let polygon_id = polygon_id.to_string();
        self.with_transaction(network, move |tx, editor| {
            Box::pin(async move {
                let mut fields = Fields::new();
                fields.insert(POLYGON_ID_FIELD.to_string(), Value::from(polygon_id));
                editor.insert(tx, POLYGON_TABLE, fields, Some(ring))
            })
        })
        .await
    }

    /// Inserts a closed square polygon of `2 * half_size` side centred on the
    /// first node of the network.
    pub async fn insert_anchored_square(
        &self,
        network: &ModelObject,
        polygon_id: &str,
        half_size: f64,
    ) -> Result<RowRecord> {
        let anchor = self
            .store
            .rows(network, NODES_TABLE)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ModelError::NotFound(format!("no nodes in '{}' to anchor a polygon", network.name))
            })?;
        let coordinate = |field: &str| {
            anchor.get(field).and_then(Value::as_f64).ok_or_else(|| {
                ModelError::ValidationError(format!("anchor node has no numeric '{}'", field))
            })
        };
        let (cx, cy) = (coordinate("x")?, coordinate("y")?);

        let ring = close_ring(vec![
            Point::new(cx - half_size, cy - half_size),
            Point::new(cx + half_size, cy - half_size),
            Point::new(cx + half_size, cy + half_size),
            Point::new(cx - half_size, cy + half_size),
        ]);
        self.insert_polygon(network, polygon_id, ring).await
    }

    /// Deletes every row of `table` in one transaction. Returns the count.
    pub async fn delete_rows(&self, network: &ModelObject, table: &str) -> Result<usize> {
        let name = table.to_string();
        let deleted = self
            .with_transaction(network, move |tx, editor| {
                Box::pin(async move {
                    let rows = editor.rows(tx, &name).await?;
                    for row in &rows {
                        editor.delete(tx, row)?;
                    }
                    Ok(rows.len())
                })
            })
            .await?;
        info!("deleted {} rows from '{}' in '{}'", deleted, table, network.name);
        Ok(deleted)
    }

    /// Submits every Sim of a run, waits for them and records each Sim's
    /// final status on the Sim object.
    ///
    /// The orchestrator's agent must already be connected.
    pub async fn launch_run(
        &self,
        run_id: ObjectId,
        orchestrator: &JobOrchestrator,
        timeout: Duration,
    ) -> Result<AggregateResult> {
        let run = self.store.object_by_kind_and_id(ObjectKind::Run, run_id).await?;
        let sims = self.store.children(&run).await?;
        if sims.is_empty() {
            return Err(ModelError::ValidationError(format!(
                "run '{}' (ID {}) has no simulations",
                run.name, run.id
            )));
        }

        info!("launching run {} ({} simulations)", run.id, sims.len());
        let handles = orchestrator.submit(&sims).await?;
        let result = orchestrator.wait_all(&handles, timeout).await;

        for sim in &sims {
            if let Some(status) = result.status_of(sim.id) {
                self.store
                    .set_property(sim, STATUS_PROPERTY, Value::from(status.to_string()))
                    .await?;
            }
        }
        Ok(result)
    }

    /// Pipeline preamble: when `run_simulations` is set, copies the source
    /// network into the clusters group, creates a run from `source_run` and
    /// launches it with `orchestrator`, waiting up to `job_timeout_secs`.
    ///
    /// Every step after the copy is optional; a missing run name or
    /// orchestrator just ends the setup early.
    pub async fn prepare_clusters(
        &self,
        source_run: Option<&str>,
        orchestrator: Option<&JobOrchestrator>,
    ) -> Result<ClusterSetup> {
        let mut setup = ClusterSetup::default();
        if !self.config.run_simulations {
            info!("simulation runs disabled, skipping cluster setup");
            return Ok(setup);
        }

        setup.network = Some(self.copy_source_network().await?);

        let Some(source_run) = source_run else {
            warn!("no source run given, cluster run not created");
            return Ok(setup);
        };
        let run = self
            .create_run_from(
                &self.config.source_group_name,
                source_run,
                &self.config.clusters_group_name,
                None,
            )
            .await?;

        if let Some(orchestrator) = orchestrator {
            let jobs = self
                .launch_run(run.id, orchestrator, self.config.job_timeout_duration())
                .await?;
            setup.jobs = Some(jobs);
        }
        setup.run = Some(run);
        Ok(setup)
    }
}

// ============================================================================
// Transaction Manager
// ============================================================================

use super::{Change, TransactionId, TransactionLog, TransactionState};
use crate::core::{ModelError, ObjectId, Result};
use crate::rows::{QueryExecutor, QueryScope};
use crate::storage::{ContainerData, ModelObject, ObjectStore};
use log::warn;
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

/// Hands out transactions and keeps at most one open per container.
#[derive(Clone)]
pub struct TransactionManager {
    store: ObjectStore,
    executor: Arc<dyn QueryExecutor>,
}

impl TransactionManager {
    pub fn new(store: ObjectStore, executor: Arc<dyn QueryExecutor>) -> Self {
        Self { store, executor }
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn executor(&self) -> &Arc<dyn QueryExecutor> {
        &self.executor
    }

    /// Opens a transaction on an openable object.
    ///
    /// Fails with `TransactionConflict` while another transaction on the same
    /// container is open.
    pub async fn begin(&self, container: &ModelObject) -> Result<Transaction> {
        let container = self.store.get(container.id).await?;
        if !container.is_openable() {
            return Err(ModelError::Unsupported(format!(
                "{} '{}' cannot be opened for editing",
                container.kind, container.name
            )));
        }

        let id = TransactionId::new();
        self.store.claim(&container, id).await?;

        event!(Level::DEBUG, txn = %id, container = %container.name, "transaction opened");
        Ok(Transaction {
            log: TransactionLog::new(id, container.id),
            container,
            manager: self.clone(),
        })
    }

    pub fn has_open_transaction(&self, container: &ModelObject) -> Result<bool> {
        Ok(self.store.editor_of(container.id)?.is_some())
    }

    pub fn open_count(&self) -> Result<usize> {
        self.store.editing_count()
    }

    fn release(&self, container: ObjectId, id: TransactionId) -> Result<()> {
        self.store.release(container, id)
    }
}

/// An open batch of row edits against one container.
///
/// Dropping a transaction that is still open rolls it back.
pub struct Transaction {
    log: TransactionLog,
    container: ModelObject,
    manager: TransactionManager,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.log.id())
            .field("container", &self.container.name)
            .field("state", &self.log.state())
            .field("changes", &self.log.changes().len())
            .finish()
    }
}

impl Transaction {
    pub fn id(&self) -> TransactionId {
        self.log.id()
    }

    pub fn state(&self) -> TransactionState {
        self.log.state()
    }

    pub fn container(&self) -> &ModelObject {
        &self.container
    }

    /// Edits recorded so far, in order.
    pub fn changes(&self) -> &[Change] {
        self.log.changes()
    }

    pub fn ensure_open(&self) -> Result<()> {
        self.log.ensure_open()
    }

    pub(crate) fn record(&mut self, change: Change) -> Result<()> {
        self.log.record(change)
    }

    pub(crate) fn scope(&self) -> QueryScope {
        QueryScope {
            transaction: self.log.id(),
            container: self.container.id,
        }
    }

    pub(crate) fn executor(&self) -> &Arc<dyn QueryExecutor> {
        &self.manager.executor
    }

    /// Committed tables of the container with this transaction's edits
    /// applied on top.
    pub(crate) async fn staged_view(&self) -> Result<ContainerData> {
        let mut data = self.manager.store.container_data(self.container.id).await?;
        for change in self.log.changes() {
            data.apply(change)?;
        }
        Ok(data)
    }

    /// Applies every pending edit or none of them.
    ///
    /// When applying fails the transaction is rolled back and the error is
    /// returned as `CommitFailed`.
    pub async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        let span = info_span!(
            "transaction.commit",
            txn = %self.log.id(),
            container = %self.container.name,
            changes = self.log.changes().len()
        );

        match self.apply().instrument(span).await {
            Ok(()) => {
                self.finish(TransactionState::Committed)?;
                event!(
                    Level::DEBUG,
                    txn = %self.log.id(),
                    elapsed_ms = self.log.elapsed().as_millis() as u64,
                    "transaction committed"
                );
                Ok(())
            }
            Err(err) => {
                event!(Level::ERROR, txn = %self.log.id(), error = %err, "commit failed, rolling back");
                self.rollback().await?;
                Err(ModelError::CommitFailed(format!("{}: {}", self.log.id(), err)))
            }
        }
    }

    /// Installs the staged tables, then commits the query engine. The engine
    /// publishes nothing unless the tables were installed, and an engine
    /// failure puts the previous tables back.
    async fn apply(&self) -> Result<()> {
        let staged = self.staged_view().await?;
        let store = &self.manager.store;
        let previous = store.install_container(self.container.id, staged).await?;

        if let Err(err) = self.manager.executor.commit(&self.scope()).await {
            if let Err(restore) = store.install_container(self.container.id, previous).await {
                event!(
                    Level::ERROR,
                    txn = %self.log.id(),
                    error = %restore,
                    "could not restore container after query engine failure"
                );
            }
            return Err(err);
        }
        Ok(())
    }

    /// Discards every pending edit.
    pub async fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        if let Err(err) = self.manager.executor.rollback(&self.scope()).await {
            warn!("query engine rollback of {} failed: {}", self.log.id(), err);
        }
        self.finish(TransactionState::RolledBack)?;
        event!(Level::DEBUG, txn = %self.log.id(), "transaction rolled back");
        Ok(())
    }

    fn finish(&mut self, state: TransactionState) -> Result<()> {
        self.log.finish(state)?;
        self.manager.release(self.container.id, self.log.id())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.log.state().is_open() {
            return;
        }
        warn!(
            "transaction {} on '{}' dropped while open, rolling back",
            self.log.id(),
            self.container.name
        );
        let _ = self.finish(TransactionState::RolledBack);

        // Local edits are already gone; the query engine is told when a
        // runtime is around to drive the async call.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let executor = self.manager.executor.clone();
            let scope = self.scope();
            handle.spawn(async move {
                if let Err(err) = executor.rollback(&scope).await {
                    warn!("query engine rollback of {} failed: {}", scope.transaction, err);
                }
            });
        }
    }
}

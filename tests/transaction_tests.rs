/// Transaction lifecycle tests
///
/// Commit and rollback semantics, all-or-nothing commits and the
/// one-open-transaction-per-container rule.
/// Run with: cargo test --test transaction_tests
mod common;

use common::fields;
use modelops::core::{ModelError, ObjectKind, Value};
use modelops::rows::RecordingExecutor;
use modelops::{ModelObject, ObjectStore, RowEditor, RowRecord, TransactionManager, TransactionState, Workspace};
use std::sync::Arc;

async fn setup_with(executor: RecordingExecutor) -> (TransactionManager, ModelObject, Arc<RecordingExecutor>) {
    let executor = Arc::new(executor);
    let store = ObjectStore::in_memory();
    let group = store.ensure_group("Clusters").await.unwrap();
    let net = store.create(&group, ObjectKind::Network, "5k").await.unwrap();
    (TransactionManager::new(store, executor.clone()), net, executor)
}

async fn setup() -> (TransactionManager, ModelObject) {
    let (manager, net, _) = setup_with(RecordingExecutor::new()).await;
    (manager, net)
}

#[tokio::test]
async fn test_commit_after_rollback_is_invalid() {
    let (manager, net) = setup().await;
    let mut tx = manager.begin(&net).await.unwrap();
    tx.rollback().await.unwrap();

    assert_eq!(tx.state(), TransactionState::RolledBack);
    assert!(matches!(tx.commit().await, Err(ModelError::InvalidState(_))));
    assert!(matches!(tx.rollback().await, Err(ModelError::InvalidState(_))));
}

#[tokio::test]
async fn test_edits_after_commit_are_invalid() {
    let (manager, net) = setup().await;
    let editor = RowEditor::new();
    let mut tx = manager.begin(&net).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(tx.state(), TransactionState::Committed);
    let err = editor
        .insert(&mut tx, "_nodes", fields(&[("node_id", Value::from("MH1"))]), None)
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidState(_)));
    assert!(matches!(tx.rollback().await, Err(ModelError::InvalidState(_))));
}

#[tokio::test]
async fn test_commit_makes_edits_visible() {
    let (manager, net) = setup().await;
    let editor = RowEditor::new();
    let mut tx = manager.begin(&net).await.unwrap();
    editor
        .insert(&mut tx, "_nodes", fields(&[("node_id", Value::from("MH1"))]), None)
        .unwrap();
    editor
        .insert(&mut tx, "_nodes", fields(&[("node_id", Value::from("MH2"))]), None)
        .unwrap();

    // nothing reaches the container before commit
    assert!(manager.store().rows(&net, "_nodes").await.unwrap().is_empty());
    tx.commit().await.unwrap();
    assert_eq!(manager.store().rows(&net, "_nodes").await.unwrap().len(), 2);
    assert!(!manager.has_open_transaction(&net).unwrap());
}

#[tokio::test]
async fn test_rollback_discards_edits() {
    let (manager, net) = setup().await;
    let editor = RowEditor::new();
    let mut tx = manager.begin(&net).await.unwrap();
    editor
        .insert(&mut tx, "_nodes", fields(&[("node_id", Value::from("MH1"))]), None)
        .unwrap();
    tx.rollback().await.unwrap();

    assert!(tx.changes().is_empty());
    assert!(manager.store().rows(&net, "_nodes").await.unwrap().is_empty());
    assert!(!manager.has_open_transaction(&net).unwrap());
}

#[tokio::test]
async fn test_failed_apply_leaves_container_untouched() {
    let (manager, net) = setup().await;
    let editor = RowEditor::new();
    let mut tx = manager.begin(&net).await.unwrap();
    editor
        .insert(&mut tx, "_nodes", fields(&[("node_id", Value::from("MH1"))]), None)
        .unwrap();
    // a row that was never committed cannot be updated
    let ghost = RowRecord::new("_nodes", fields(&[("node_id", Value::from("ghost"))]), None);
    editor
        .update(&mut tx, &ghost, fields(&[("x", Value::from(1.0))]))
        .unwrap();

    let err = tx.commit().await.unwrap_err();
    assert!(matches!(err, ModelError::CommitFailed(_)));
    assert_eq!(tx.state(), TransactionState::RolledBack);
    assert!(manager.store().rows(&net, "_nodes").await.unwrap().is_empty());

    // the container is free again
    let mut next = manager.begin(&net).await.unwrap();
    next.rollback().await.unwrap();
}

#[tokio::test]
async fn test_query_engine_commit_failure_is_commit_failed() {
    let (manager, net, executor) = setup_with(RecordingExecutor::new().failing_commits()).await;
    let editor = RowEditor::new();
    let mut tx = manager.begin(&net).await.unwrap();
    editor
        .insert(&mut tx, "_nodes", fields(&[("node_id", Value::from("MH1"))]), None)
        .unwrap();
    editor
        .bulk_query(&mut tx, "_nodes", "UPDATE _nodes SET x = 0")
        .await
        .unwrap();

    assert!(matches!(tx.commit().await, Err(ModelError::CommitFailed(_))));
    assert!(manager.store().rows(&net, "_nodes").await.unwrap().is_empty());
    assert!(executor.committed().unwrap().is_empty());
    assert_eq!(executor.staged_count().unwrap(), 0);
}

#[tokio::test]
async fn test_second_begin_conflicts_until_first_finishes() {
    let (manager, net) = setup().await;
    let mut first = manager.begin(&net).await.unwrap();

    assert!(matches!(
        manager.begin(&net).await,
        Err(ModelError::TransactionConflict(_))
    ));
    assert_eq!(manager.open_count().unwrap(), 1);

    first.commit().await.unwrap();
    let mut second = manager.begin(&net).await.unwrap();
    second.commit().await.unwrap();
}

#[tokio::test]
async fn test_transactions_on_different_containers_are_independent() {
    let (manager, net) = setup().await;
    let group = manager.store().get(net.parent.unwrap()).await.unwrap();
    let other = manager
        .store()
        .create(&group, ObjectKind::Network, "10k")
        .await
        .unwrap();

    let mut a = manager.begin(&net).await.unwrap();
    let mut b = manager.begin(&other).await.unwrap();
    assert_eq!(manager.open_count().unwrap(), 2);
    a.commit().await.unwrap();
    b.rollback().await.unwrap();
    assert_eq!(manager.open_count().unwrap(), 0);
}

#[tokio::test]
async fn test_begin_on_non_openable_object_fails() {
    let (manager, net) = setup().await;
    let group = manager.store().get(net.parent.unwrap()).await.unwrap();
    assert!(matches!(
        manager.begin(&group).await,
        Err(ModelError::Unsupported(_))
    ));
}

#[tokio::test]
async fn test_dropped_transaction_rolls_back() {
    let (manager, net) = setup().await;
    {
        let mut tx = manager.begin(&net).await.unwrap();
        RowEditor::new()
            .insert(&mut tx, "_nodes", fields(&[("node_id", Value::from("MH1"))]), None)
            .unwrap();
    }

    assert!(!manager.has_open_transaction(&net).unwrap());
    assert!(manager.store().rows(&net, "_nodes").await.unwrap().is_empty());
    let mut tx = manager.begin(&net).await.unwrap();
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn test_with_transaction_commits_on_ok_and_rolls_back_on_err() {
    let executor = Arc::new(RecordingExecutor::new());
    let workspace = Workspace::in_memory(executor);
    let group = workspace.store().ensure_group("Clusters").await.unwrap();
    let net = workspace
        .store()
        .create(&group, ObjectKind::Network, "5k")
        .await
        .unwrap();

    let inserted = workspace
        .with_transaction(&net, |tx, editor| {
            Box::pin(async move {
                editor.insert(tx, "_nodes", fields(&[("node_id", Value::from("MH1"))]), None)
            })
        })
        .await
        .unwrap();
    assert_eq!(inserted.get("node_id"), Some(&Value::from("MH1")));

    let err = workspace
        .with_transaction(&net, |tx, editor| {
            Box::pin(async move {
                editor.insert(tx, "_nodes", fields(&[("node_id", Value::from("MH2"))]), None)?;
                Err::<(), _>(ModelError::ValidationError("abandon".to_string()))
            })
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::ValidationError(_)));

    let rows = workspace.store().rows(&net, "_nodes").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, inserted.id);
    assert!(!workspace.transactions().has_open_transaction(&net).unwrap());
}

#[tokio::test]
async fn test_unpersisted_commit_publishes_nothing_to_query_engine() {
    let dir = tempfile::TempDir::new().unwrap();
    let snapshot = dir.path().join("model.snap");
    let store = ObjectStore::open(&snapshot).unwrap();
    let group = store.ensure_group("Clusters").await.unwrap();
    let net = store.create(&group, ObjectKind::Network, "5k").await.unwrap();
    let executor = Arc::new(RecordingExecutor::new());
    let manager = TransactionManager::new(store, executor.clone());

    let editor = RowEditor::new();
    let mut tx = manager.begin(&net).await.unwrap();
    editor
        .insert(&mut tx, "hw_pump", fields(&[("id", Value::from("P1"))]), None)
        .unwrap();
    editor.bulk_query(&mut tx, "hw_pump", "SET x = 1").await.unwrap();

    // the snapshot can no longer be replaced
    std::fs::remove_file(&snapshot).unwrap();
    std::fs::create_dir(&snapshot).unwrap();

    assert!(matches!(tx.commit().await, Err(ModelError::CommitFailed(_))));
    assert!(executor.committed().unwrap().is_empty());
    assert_eq!(executor.staged_count().unwrap(), 0);
    assert!(manager.store().rows(&net, "hw_pump").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_container_with_open_transaction_cannot_be_deleted() {
    let (manager, net) = setup().await;
    let store = manager.store().clone();
    let group = store.get(net.parent.unwrap()).await.unwrap();
    let mut tx = manager.begin(&net).await.unwrap();

    assert!(matches!(
        store.delete(&net).await,
        Err(ModelError::TransactionConflict(_))
    ));
    assert!(matches!(
        store.delete(&group).await,
        Err(ModelError::TransactionConflict(_))
    ));
    assert!(store.get(net.id).await.is_ok());

    tx.rollback().await.unwrap();
    assert_eq!(store.delete(&group).await.unwrap(), 2);
    assert!(matches!(
        manager.begin(&net).await,
        Err(ModelError::NotFound(_))
    ));
}

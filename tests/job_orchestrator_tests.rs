/// Job orchestration tests
///
/// Submission rules, aggregate results and the shared wait deadline.
/// Run with: cargo test --test job_orchestrator_tests
mod common;

use common::SleepRunner;
use modelops::core::{Fields, ModelError, ObjectKind, Value};
use modelops::jobs::{JobOrchestrator, JobStatus, LocalAgent};
use modelops::storage::STATUS_PROPERTY;
use modelops::{ModelObject, ObjectStore};
use std::sync::Arc;
use std::time::Duration;

const SHORT: Duration = Duration::from_millis(5);
const GENEROUS: Duration = Duration::from_secs(5);

fn orchestrator(runner: SleepRunner) -> JobOrchestrator {
    JobOrchestrator::new(Arc::new(LocalAgent::new(Arc::new(runner))))
        .with_poll_interval(Duration::from_millis(2))
}

async fn sims(store: &ObjectStore, scenarios: &[&str]) -> (ModelObject, Vec<ModelObject>) {
    let group = store.ensure_group("Clusters").await.unwrap();
    let net = store.create(&group, ObjectKind::Network, "5k").await.unwrap();
    let scenarios: Vec<String> = scenarios.iter().map(|s| s.to_string()).collect();
    let run = store
        .create_run(&group, "design", &net, &scenarios, Fields::new())
        .await
        .unwrap();
    let sims = store.children(&run).await.unwrap();
    (run, sims)
}

#[tokio::test]
async fn test_submit_requires_connection() {
    let store = ObjectStore::in_memory();
    let (_, sims) = sims(&store, &["Base"]).await;
    let jobs = orchestrator(SleepRunner::new(SHORT));

    assert!(matches!(
        jobs.submit(&sims).await,
        Err(ModelError::SubmissionError(_))
    ));
    assert!(matches!(
        jobs.connect(0).await,
        Err(ModelError::SubmissionError(_))
    ));
}

#[tokio::test]
async fn test_submit_rejects_non_sims() {
    let store = ObjectStore::in_memory();
    let (run, _) = sims(&store, &["Base"]).await;
    let jobs = orchestrator(SleepRunner::new(SHORT));
    jobs.connect(1).await.unwrap();

    assert!(matches!(
        jobs.submit(&[run]).await,
        Err(ModelError::SubmissionError(_))
    ));
}

#[tokio::test]
async fn test_duplicate_sims_are_submitted_once() {
    let store = ObjectStore::in_memory();
    let (_, sims) = sims(&store, &["Base"]).await;
    let jobs = orchestrator(SleepRunner::new(SHORT));
    jobs.connect(1).await.unwrap();

    let twice = vec![sims[0].clone(), sims[0].clone()];
    let handles = jobs.submit(&twice).await.unwrap();
    assert_eq!(handles.len(), 1);
    assert!(handles[0].execution_id().is_some());
}

#[tokio::test]
async fn test_all_jobs_succeed_within_timeout() {
    let store = ObjectStore::in_memory();
    let (_, sims) = sims(&store, &["Base", "Wet", "Dry"]).await;
    let jobs = orchestrator(SleepRunner::new(SHORT));
    jobs.connect(2).await.unwrap();

    let handles = jobs.submit(&sims).await.unwrap();
    let result = jobs.wait_all(&handles, GENEROUS).await;

    assert!(result.all_succeeded);
    assert_eq!(result.count(JobStatus::Success), 3);
    assert!(handles.iter().all(|h| h.status() == JobStatus::Success));
}

#[tokio::test]
async fn test_failed_job_fails_the_aggregate() {
    let store = ObjectStore::in_memory();
    let (_, sims) = sims(&store, &["Base", "bad"]).await;
    let jobs = orchestrator(SleepRunner::new(SHORT));
    jobs.connect(2).await.unwrap();

    let handles = jobs.submit(&sims).await.unwrap();
    let result = jobs.wait_all(&handles, GENEROUS).await;

    assert!(!result.all_succeeded);
    let bad = sims.iter().find(|s| s.name == "bad").unwrap();
    assert_eq!(result.status_of(bad.id), Some(JobStatus::Failed));
    assert_eq!(result.count(JobStatus::Success), 1);
}

#[tokio::test]
async fn test_slow_jobs_time_out_at_shared_deadline() {
    let store = ObjectStore::in_memory();
    let (_, sims) = sims(&store, &["Base", "Long"]).await;
    let runner = SleepRunner::new(SHORT).with("Long", Duration::from_secs(30));
    let jobs = orchestrator(runner);
    jobs.connect(2).await.unwrap();

    let handles = jobs.submit(&sims).await.unwrap();
    let started = tokio::time::Instant::now();
    let result = jobs.wait_all(&handles, Duration::from_millis(300)).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!result.all_succeeded);
    let long = sims.iter().find(|s| s.name == "Long").unwrap();
    let base = sims.iter().find(|s| s.name == "Base").unwrap();
    assert_eq!(result.status_of(long.id), Some(JobStatus::TimedOut));
    assert_eq!(result.status_of(base.id), Some(JobStatus::Success));

    // a timed out handle is not waited on again
    let again = jobs.wait_all(&handles, GENEROUS).await;
    assert_eq!(again.status_of(long.id), Some(JobStatus::TimedOut));
}

#[tokio::test]
async fn test_empty_wait_is_vacuously_successful() {
    let jobs = orchestrator(SleepRunner::new(SHORT));
    let result = jobs.wait_all(&[], GENEROUS).await;
    assert!(result.all_succeeded);
    assert!(result.per_job.is_empty());
}

#[tokio::test]
async fn test_launch_run_records_sim_status() {
    let executor = Arc::new(modelops::rows::RecordingExecutor::new());
    let workspace = modelops::Workspace::in_memory(executor);
    let (run, sims) = sims(workspace.store(), &["Base", "bad"]).await;
    let jobs = orchestrator(SleepRunner::new(SHORT));
    jobs.connect(2).await.unwrap();

    let result = workspace.launch_run(run.id, &jobs, GENEROUS).await.unwrap();
    assert!(!result.all_succeeded);

    for sim in &sims {
        let stored = workspace.store().get(sim.id).await.unwrap();
        let expected = if sim.name == "bad" { "failed" } else { "success" };
        assert_eq!(stored.property(STATUS_PROPERTY), Some(&Value::from(expected)));
    }

    let group = workspace.store().get(run.parent.unwrap()).await.unwrap();
    assert!(matches!(
        workspace.launch_run(group.id, &jobs, GENEROUS).await,
        Err(ModelError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_handle_reports_running_while_job_executes() {
    let store = ObjectStore::in_memory();
    let (_, sims) = sims(&store, &["Base"]).await;
    let jobs = orchestrator(SleepRunner::new(Duration::from_millis(300)));
    jobs.connect(1).await.unwrap();
    let handles = jobs.submit(&sims).await.unwrap();
    assert_eq!(handles[0].status(), JobStatus::Pending);

    let waiting = {
        let jobs = jobs.clone();
        let handles = handles.clone();
        tokio::spawn(async move { jobs.wait_all(&handles, GENEROUS).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(handles[0].status(), JobStatus::Running);

    let result = waiting.await.unwrap();
    assert!(result.all_succeeded);
    assert_eq!(handles[0].status(), JobStatus::Success);
}

#[tokio::test]
async fn test_refresh_reads_status_without_waiting() {
    let store = ObjectStore::in_memory();
    let (_, sims) = sims(&store, &["Base"]).await;
    let jobs = orchestrator(SleepRunner::new(Duration::from_millis(300)));
    jobs.connect(1).await.unwrap();
    let handles = jobs.submit(&sims).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(handles[0].refresh().await, JobStatus::Running);
    assert_eq!(handles[0].status(), JobStatus::Running);
}

use super::agent::SimulationAgent;
use super::job::{AggregateResult, JobHandle, JobStatus};
use crate::core::{ModelError, ObjectId, ObjectKind, Result};
use crate::storage::ModelObject;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use tracing::{Instrument, Level, event, info_span};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Submits sims to an agent and waits for them.
#[derive(Clone)]
pub struct JobOrchestrator {
    agent: Arc<dyn SimulationAgent>,
    poll_interval: Duration,
}

impl JobOrchestrator {
    pub fn new(agent: Arc<dyn SimulationAgent>) -> Self {
        Self {
            agent,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub async fn connect(&self, threads: usize) -> Result<()> {
        self.agent.connect(threads).await.map_err(|err| match err {
            ModelError::SubmissionError(_) => err,
            other => ModelError::SubmissionError(format!("agent connect failed: {}", other)),
        })
    }

    /// Launches one job per distinct Sim, in the given order.
    ///
    /// Fails with `SubmissionError` when the agent is not connected or when a
    /// non-Sim object is passed. A launch the agent refuses yields a handle
    /// that is already `Failed`.
    pub async fn submit(&self, sims: &[ModelObject]) -> Result<Vec<JobHandle>> {
        if !self.agent.is_connected() {
            return Err(ModelError::SubmissionError(
                "agent is not connected".to_string(),
            ));
        }

        let mut seen: HashSet<ObjectId> = HashSet::new();
        let mut distinct = Vec::new();
        for sim in sims {
            if sim.kind != ObjectKind::Sim {
                return Err(ModelError::SubmissionError(format!(
                    "'{}' is a {}, only sims can be submitted",
                    sim.name, sim.kind
                )));
            }
            if seen.insert(sim.id) {
                distinct.push(sim);
            }
        }

        let mut handles = Vec::with_capacity(distinct.len());
        for sim in distinct {
            let handle = match self.agent.launch(sim).await {
                Ok(execution) => {
                    event!(Level::INFO, sim = %sim.id, execution = execution.id(), "job submitted");
                    JobHandle::launched(sim.id, execution)
                }
                Err(err) => {
                    event!(Level::WARN, sim = %sim.id, error = %err, "job launch refused");
                    JobHandle::rejected(sim.id, err.to_string())
                }
            };
            handles.push(handle);
        }
        Ok(handles)
    }

    /// Waits for every handle to reach a terminal status, for at most
    /// `timeout` overall.
    ///
    /// Handles still running at the deadline are reported `TimedOut`; their
    /// waits are dropped and not retried. Statuses are written back to the
    /// handles.
    pub async fn wait_all(&self, handles: &[JobHandle], timeout: Duration) -> AggregateResult {
        let span = info_span!(
            "jobs.wait_all",
            jobs = handles.len(),
            timeout_ms = timeout.as_millis() as u64
        );
        let deadline = Instant::now() + timeout;
        let poll_interval = self.poll_interval;

        async move {
            let mut waits: FuturesUnordered<_> = handles
                .iter()
                .map(|handle| wait_one(handle, deadline, poll_interval))
                .collect();

            let mut per_job = BTreeMap::new();
            while let Some((sim_id, status)) = waits.next().await {
                per_job.insert(sim_id, status);
            }

            let result = AggregateResult::from_statuses(per_job);
            event!(
                Level::INFO,
                all_succeeded = result.all_succeeded,
                timed_out = result.count(JobStatus::TimedOut),
                failed = result.count(JobStatus::Failed),
                "jobs finished"
            );
            result
        }
        .instrument(span)
        .await
    }
}

async fn wait_one(
    handle: &JobHandle,
    deadline: Instant,
    poll_interval: Duration,
) -> (ObjectId, JobStatus) {
    let recorded = handle.status();
    let execution = match handle.execution() {
        Some(execution) if !recorded.is_terminal() => execution,
        _ => return (handle.sim_id(), recorded),
    };

    // Every status seen is written back, so the handle shows Running while
    // the job executes.
    let settle = async {
        loop {
            let observed = match execution.status().await {
                Ok(status) => handle.update_status(status),
                Err(err) => return poll_failed(handle, err),
            };
            if observed.is_terminal() {
                return observed;
            }
            let next = tokio::time::timeout(poll_interval, execution.wait_terminal(poll_interval));
            if let Ok(done) = next.await {
                return done.unwrap_or_else(|err| poll_failed(handle, err));
            }
        }
    };

    let status = timeout_at(deadline, settle)
        .await
        .unwrap_or(JobStatus::TimedOut);
    (handle.sim_id(), handle.update_status(status))
}

fn poll_failed(handle: &JobHandle, err: ModelError) -> JobStatus {
    event!(Level::WARN, sim = %handle.sim_id(), error = %err, "status poll failed");
    JobStatus::Failed
}

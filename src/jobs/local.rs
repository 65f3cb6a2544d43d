//! In-process simulation agent.

use super::agent::{ExecutionHandle, SimulationAgent};
use super::job::JobStatus;
use crate::core::{ModelError, ObjectKind, Result};
use crate::storage::ModelObject;
use async_trait::async_trait;
use log::warn;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Semaphore, watch};

/// Executes one simulation to completion.
#[async_trait]
pub trait SimulationRunner: Send + Sync {
    async fn run(&self, sim: &ModelObject) -> Result<()>;
}

/// Runs simulations as tokio tasks, at most `threads` at a time.
pub struct LocalAgent {
    runner: Arc<dyn SimulationRunner>,
    slots: Mutex<Option<Arc<Semaphore>>>,
    next_execution: AtomicU64,
}

impl LocalAgent {
    pub fn new(runner: Arc<dyn SimulationRunner>) -> Self {
        Self {
            runner,
            slots: Mutex::new(None),
            next_execution: AtomicU64::new(1),
        }
    }

    fn slots(&self) -> Result<Option<Arc<Semaphore>>> {
        Ok(self.slots.lock()?.clone())
    }
}

#[async_trait]
impl SimulationAgent for LocalAgent {
    async fn connect(&self, threads: usize) -> Result<()> {
        if threads == 0 {
            return Err(ModelError::SubmissionError(
                "agent needs at least one thread".to_string(),
            ));
        }
        *self.slots.lock()? = Some(Arc::new(Semaphore::new(threads)));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        matches!(self.slots(), Ok(Some(_)))
    }

    async fn launch(&self, sim: &ModelObject) -> Result<Arc<dyn ExecutionHandle>> {
        let slots = self.slots()?.ok_or_else(|| {
            ModelError::SubmissionError("local agent is not connected".to_string())
        })?;
        if sim.kind != ObjectKind::Sim {
            return Err(ModelError::SubmissionError(format!(
                "'{}' is a {}, only sims can be launched",
                sim.name, sim.kind
            )));
        }

        let id = self.next_execution.fetch_add(1, Ordering::SeqCst);
        let (status_tx, status_rx) = watch::channel(JobStatus::Pending);
        let runner = self.runner.clone();
        let sim = sim.clone();

        tokio::spawn(async move {
            let Ok(_permit) = slots.acquire_owned().await else {
                let _ = status_tx.send(JobStatus::Failed);
                return;
            };
            let _ = status_tx.send(JobStatus::Running);
            let status = match runner.run(&sim).await {
                Ok(()) => JobStatus::Success,
                Err(err) => {
                    warn!("simulation '{}' (ID {}) failed: {}", sim.name, sim.id, err);
                    JobStatus::Failed
                }
            };
            let _ = status_tx.send(status);
        });

        Ok(Arc::new(LocalExecution {
            id,
            status: status_rx,
        }))
    }
}

struct LocalExecution {
    id: u64,
    status: watch::Receiver<JobStatus>,
}

impl LocalExecution {
    /// A task that went away without a terminal status crashed.
    fn settled(status: JobStatus) -> JobStatus {
        if status.is_terminal() {
            status
        } else {
            JobStatus::Failed
        }
    }
}

#[async_trait]
impl ExecutionHandle for LocalExecution {
    fn id(&self) -> u64 {
        self.id
    }

    async fn status(&self) -> Result<JobStatus> {
        let status = *self.status.borrow();
        if !status.is_terminal() && self.status.has_changed().is_err() {
            return Ok(Self::settled(*self.status.borrow()));
        }
        Ok(status)
    }

    async fn wait_terminal(&self, _poll_interval: Duration) -> Result<JobStatus> {
        let mut status = self.status.clone();
        loop {
            let current = *status.borrow_and_update();
            if current.is_terminal() {
                return Ok(current);
            }
            if status.changed().await.is_err() {
                return Ok(Self::settled(*status.borrow()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ObjectId;

    struct Sleeper(Duration);

    #[async_trait]
    impl SimulationRunner for Sleeper {
        async fn run(&self, _sim: &ModelObject) -> Result<()> {
            tokio::time::sleep(self.0).await;
            Ok(())
        }
    }

    fn sim() -> ModelObject {
        ModelObject {
            id: ObjectId(42),
            name: "Base".to_string(),
            kind: ObjectKind::Sim,
            parent: None,
            children: Vec::new(),
            properties: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_launch_requires_connect() {
        let agent = LocalAgent::new(Arc::new(Sleeper(Duration::from_millis(1))));
        assert!(!agent.is_connected());
        assert!(matches!(
            agent.launch(&sim()).await,
            Err(ModelError::SubmissionError(_))
        ));
    }

    #[tokio::test]
    async fn test_execution_reaches_success() {
        let agent = LocalAgent::new(Arc::new(Sleeper(Duration::from_millis(5))));
        agent.connect(1).await.unwrap();
        let execution = agent.launch(&sim()).await.unwrap();

        let status = execution
            .wait_terminal(Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(status, JobStatus::Success);
        assert_eq!(execution.status().await.unwrap(), JobStatus::Success);
    }
}

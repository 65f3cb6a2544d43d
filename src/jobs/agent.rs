use super::job::JobStatus;
use crate::core::Result;
use crate::storage::ModelObject;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// One execution running on an agent.
#[async_trait]
pub trait ExecutionHandle: Send + Sync {
    fn id(&self) -> u64;

    async fn status(&self) -> Result<JobStatus>;

    /// Resolves once the execution reaches a terminal status.
    async fn wait_terminal(&self, poll_interval: Duration) -> Result<JobStatus> {
        loop {
            let status = self.status().await?;
            if status.is_terminal() {
                return Ok(status);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

/// Compute agent that runs simulations.
#[async_trait]
pub trait SimulationAgent: Send + Sync {
    /// Connects with `threads` execution slots. Launching requires this.
    async fn connect(&self, threads: usize) -> Result<()>;

    fn is_connected(&self) -> bool;

    async fn launch(&self, sim: &ModelObject) -> Result<Arc<dyn ExecutionHandle>>;
}

// ============================================================================
// Simulation Jobs
// ============================================================================
//
// Sims are submitted to a compute agent and tracked through
// JobHandles until they succeed, fail or outlive the wait deadline.
//
// ============================================================================

pub mod agent;
pub mod job;
pub mod local;
pub mod orchestrator;
pub mod process;

pub use agent::{ExecutionHandle, SimulationAgent};
pub use job::{AggregateResult, JobHandle, JobStatus};
pub use local::{LocalAgent, SimulationRunner};
pub use orchestrator::{DEFAULT_POLL_INTERVAL, JobOrchestrator};
pub use process::CommandRunner;

use super::agent::ExecutionHandle;
use crate::core::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Lifecycle of one simulation job.
///
/// ```text
/// Pending -> Running -> Success | Failed
///               └──────> TimedOut   (wait deadline elapsed first)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failed,
    TimedOut,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::TimedOut)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        };
        f.write_str(text)
    }
}

/// A submitted job, tied to the Sim it executes.
///
/// Clones share the recorded status. The status only moves forward: once
/// terminal it is never overwritten.
#[derive(Clone)]
pub struct JobHandle {
    sim_id: ObjectId,
    submitted_at: DateTime<Utc>,
    status: Arc<Mutex<JobStatus>>,
    execution: Option<Arc<dyn ExecutionHandle>>,
    error: Option<String>,
}

impl JobHandle {
    pub(crate) fn launched(sim_id: ObjectId, execution: Arc<dyn ExecutionHandle>) -> Self {
        Self {
            sim_id,
            submitted_at: Utc::now(),
            status: Arc::new(Mutex::new(JobStatus::Pending)),
            execution: Some(execution),
            error: None,
        }
    }

    /// Handle of a launch the agent refused. It is born `Failed`.
    pub(crate) fn rejected(sim_id: ObjectId, error: String) -> Self {
        Self {
            sim_id,
            submitted_at: Utc::now(),
            status: Arc::new(Mutex::new(JobStatus::Failed)),
            execution: None,
            error: Some(error),
        }
    }

    pub fn sim_id(&self) -> ObjectId {
        self.sim_id
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// Agent-side id of the execution, if the launch was accepted.
    pub fn execution_id(&self) -> Option<u64> {
        self.execution.as_ref().map(|execution| execution.id())
    }

    pub(crate) fn execution(&self) -> Option<&Arc<dyn ExecutionHandle>> {
        self.execution.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn status(&self) -> JobStatus {
        match self.status.lock() {
            Ok(status) => *status,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Asks the agent for the execution's current status and records it.
    pub async fn refresh(&self) -> JobStatus {
        let Some(execution) = self.execution.as_ref() else {
            return self.status();
        };
        match execution.status().await {
            Ok(status) => self.update_status(status),
            Err(_) => self.status(),
        }
    }

    /// Records `status` unless a terminal status is already recorded.
    /// Returns the status now on the handle.
    pub(crate) fn update_status(&self, status: JobStatus) -> JobStatus {
        let mut current = match self.status.lock() {
            Ok(current) => current,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !current.is_terminal() {
            *current = status;
        }
        *current
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("sim_id", &self.sim_id)
            .field("status", &self.status())
            .field("submitted_at", &self.submitted_at)
            .field("execution_id", &self.execution_id())
            .finish()
    }
}

/// Terminal status of every waited job, keyed by Sim id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub all_succeeded: bool,
    pub per_job: BTreeMap<ObjectId, JobStatus>,
}

impl AggregateResult {
    pub fn from_statuses(per_job: BTreeMap<ObjectId, JobStatus>) -> Self {
        Self {
            all_succeeded: per_job.values().all(|status| *status == JobStatus::Success),
            per_job,
        }
    }

    pub fn status_of(&self, sim_id: ObjectId) -> Option<JobStatus> {
        self.per_job.get(&sim_id).copied()
    }

    pub fn count(&self, status: JobStatus) -> usize {
        self.per_job.values().filter(|s| **s == status).count()
    }
}

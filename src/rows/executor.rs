//! Boundary to the external query engine that runs bulk commands.
//!
//! Commands are opaque strings: they are forwarded verbatim and their result
//! is returned verbatim. The engine is told when the surrounding transaction
//! commits or rolls back so it can scope its own effects the same way.

use crate::core::{ModelError, ObjectId, Result};
use crate::transaction::TransactionId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Transaction and container a command runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryScope {
    pub transaction: TransactionId,
    pub container: ObjectId,
}

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, scope: &QueryScope, table: &str, command: &str) -> Result<String>;

    async fn commit(&self, _scope: &QueryScope) -> Result<()> {
        Ok(())
    }

    async fn rollback(&self, _scope: &QueryScope) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedCommand {
    pub container: ObjectId,
    pub table: String,
    pub command: String,
}

/// Executor that only records commands.
///
/// Commands are staged per transaction and become visible in
/// [`committed`](RecordingExecutor::committed) when that transaction commits.
/// Used by the CLI, where no query engine is attached, and by tests.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    staged: Mutex<HashMap<TransactionId, Vec<ExecutedCommand>>>,
    committed: Mutex<Vec<ExecutedCommand>>,
    fail_commands_containing: Option<String>,
    fail_commits: bool,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `execute` fail for any command containing `pattern`.
    pub fn failing_on(mut self, pattern: impl Into<String>) -> Self {
        self.fail_commands_containing = Some(pattern.into());
        self
    }

    /// Makes every `commit` fail.
    pub fn failing_commits(mut self) -> Self {
        self.fail_commits = true;
        self
    }

    pub fn committed(&self) -> Result<Vec<ExecutedCommand>> {
        Ok(self.committed.lock()?.clone())
    }

    pub fn staged_count(&self) -> Result<usize> {
        Ok(self.staged.lock()?.values().map(Vec::len).sum())
    }
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
    async fn execute(&self, scope: &QueryScope, table: &str, command: &str) -> Result<String> {
        if let Some(pattern) = &self.fail_commands_containing
            && command.contains(pattern.as_str())
        {
            return Err(ModelError::ValidationError(format!(
                "query engine rejected command on '{}': {}",
                table, command
            )));
        }

        let mut staged = self.staged.lock()?;
        let commands = staged.entry(scope.transaction).or_default();
        commands.push(ExecutedCommand {
            container: scope.container,
            table: table.to_string(),
            command: command.to_string(),
        });
        Ok(format!("{} command(s) queued in {}", commands.len(), scope.transaction))
    }

    async fn commit(&self, scope: &QueryScope) -> Result<()> {
        if self.fail_commits {
            return Err(ModelError::Io(format!(
                "query engine unavailable while committing {}",
                scope.transaction
            )));
        }
        let commands = self
            .staged
            .lock()?
            .remove(&scope.transaction)
            .unwrap_or_default();
        self.committed.lock()?.extend(commands);
        Ok(())
    }

    async fn rollback(&self, scope: &QueryScope) -> Result<()> {
        self.staged.lock()?.remove(&scope.transaction);
        Ok(())
    }
}

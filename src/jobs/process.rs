//! Simulations run by an external engine process.

use super::local::SimulationRunner;
use crate::core::{ModelError, Result};
use crate::storage::ModelObject;
use async_trait::async_trait;
use log::{debug, info};
use std::path::PathBuf;
use tokio::process::Command;

/// Runs `program [args..] <sim id>` once per simulation. A zero exit status
/// is success.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Builds a runner from `[program, args..]`.
    pub fn from_command_line(command: &[String]) -> Result<Self> {
        let (program, args) = command.split_first().ok_or_else(|| {
            ModelError::ValidationError("simulator command is empty".to_string())
        })?;
        Ok(args
            .iter()
            .fold(Self::new(program.as_str()), |runner, arg| runner.arg(arg.as_str())))
    }
}

#[async_trait]
impl SimulationRunner for CommandRunner {
    async fn run(&self, sim: &ModelObject) -> Result<()> {
        info!(
            "running simulation '{}' (ID {}) with {}",
            sim.name,
            sim.id,
            self.program.display()
        );
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(sim.id.as_u64().to_string())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ModelError::Io(format!("Failed to start {}: {}", self.program.display(), e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!("simulation {} output: {}", sim.id, stdout.trim());
        }
        if !output.status.success() {
            return Err(ModelError::SubmissionError(format!(
                "simulation {} exited with {}: {}",
                sim.id,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::{ObjectId, ObjectKind};

    fn sim() -> ModelObject {
        ModelObject {
            id: ObjectId(7),
            name: "Base".to_string(),
            kind: ObjectKind::Sim,
            parent: None,
            children: Vec::new(),
            properties: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_exit_status_decides_outcome() {
        assert!(CommandRunner::new("true").run(&sim()).await.is_ok());

        let err = CommandRunner::new("false").run(&sim()).await.unwrap_err();
        assert!(matches!(err, ModelError::SubmissionError(_)));
    }

    #[tokio::test]
    async fn test_sim_id_is_the_last_argument() {
        let command = vec![
            "sh".to_string(),
            "-c".to_string(),
            "test \"$0\" = 7".to_string(),
        ];
        let runner = CommandRunner::from_command_line(&command).unwrap();
        assert!(runner.run(&sim()).await.is_ok());
        assert!(CommandRunner::from_command_line(&[]).is_err());
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let err = CommandRunner::new("/nonexistent/simulator")
            .run(&sim())
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Io(_)));
    }
}

use crate::core::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SOURCE_GROUP: &str = "2D Demo - 2d rain";
pub const DEFAULT_SOURCE_NETWORK: &str = "5k";
pub const DEFAULT_CLUSTERS_GROUP: &str = "Clusters";

/// Pipeline configuration
///
/// Read from a JSON file; every field except the model path has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Snapshot file of the model database
    pub model_path: PathBuf,

    /// Group holding the network to copy from
    pub source_group_name: String,

    /// Network copied into the clusters group
    pub source_network_name: String,

    /// Group receiving copied networks and runs
    pub clusters_group_name: String,

    /// Launch simulations after creating runs
    pub run_simulations: bool,

    /// Overall wait for launched simulations
    pub job_timeout_secs: u64,

    /// Status poll interval of running jobs
    pub poll_interval_ms: u64,

    /// Simulations the agent runs at once
    pub agent_threads: usize,

    /// Engine command line; the sim id is appended to it
    pub simulator_command: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("model.snapshot"),
            source_group_name: DEFAULT_SOURCE_GROUP.to_string(),
            source_network_name: DEFAULT_SOURCE_NETWORK.to_string(),
            clusters_group_name: DEFAULT_CLUSTERS_GROUP.to_string(),
            run_simulations: false,
            job_timeout_secs: 3600,
            poll_interval_ms: 50,
            agent_threads: 1,
            simulator_command: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            ..Self::default()
        }
    }

    /// Set the source group
    pub fn source_group(mut self, name: &str) -> Self {
        self.source_group_name = name.to_string();
        self
    }

    /// Set the source network
    pub fn source_network(mut self, name: &str) -> Self {
        self.source_network_name = name.to_string();
        self
    }

    /// Set the clusters group
    pub fn clusters_group(mut self, name: &str) -> Self {
        self.clusters_group_name = name.to_string();
        self
    }

    pub fn run_simulations(mut self, enabled: bool) -> Self {
        self.run_simulations = enabled;
        self
    }

    /// Set the overall job timeout
    pub fn job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout_secs = timeout.as_secs();
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn agent_threads(mut self, threads: usize) -> Self {
        self.agent_threads = threads;
        self
    }

    pub fn simulator_command<S: Into<String>>(mut self, command: impl IntoIterator<Item = S>) -> Self {
        self.simulator_command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn job_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn poll_interval_duration(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Parses a JSON config, tolerating a leading UTF-8 byte order mark.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(text.trim_start_matches('\u{feff}'))?;
        config.validate().map_err(ModelError::ValidationError)?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ModelError::Io(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.model_path.as_os_str().is_empty() {
            return Err("model_path cannot be empty".to_string());
        }

        for (field, value) in [
            ("source_group_name", &self.source_group_name),
            ("source_network_name", &self.source_network_name),
            ("clusters_group_name", &self.clusters_group_name),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{} cannot be empty", field));
            }
        }

        if self.job_timeout_secs == 0 {
            return Err("job_timeout_secs must be > 0".to_string());
        }

        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be > 0".to_string());
        }

        if self.agent_threads == 0 {
            return Err("agent_threads must be > 0".to_string());
        }

        if self.simulator_command.iter().any(|part| part.trim().is_empty()) {
            return Err("simulator_command cannot contain empty parts".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = PipelineConfig::from_json_str(r#"{"model_path": "db.snapshot"}"#).unwrap();
        assert_eq!(config.model_path, PathBuf::from("db.snapshot"));
        assert_eq!(config.source_network_name, "5k");
        assert_eq!(config.clusters_group_name, "Clusters");
        assert_eq!(config.job_timeout_duration(), Duration::from_secs(3600));
    }

    #[test]
    fn test_bom_is_stripped() {
        let text = "\u{feff}{\"run_simulations\": true}";
        assert!(PipelineConfig::from_json_str(text).unwrap().run_simulations);
    }

    #[test]
    fn test_validation() {
        assert!(PipelineConfig::new("db").validate().is_ok());
        assert!(PipelineConfig::new("db").agent_threads(0).validate().is_err());
        assert!(PipelineConfig::new("db").clusters_group(" ").validate().is_err());
        assert!(PipelineConfig::new("").validate().is_err());

        let err = PipelineConfig::from_json_str(r#"{"poll_interval_ms": 0}"#).unwrap_err();
        assert!(matches!(err, ModelError::ValidationError(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{"source_group_name": "Demo", "agent_threads": 4}"#).unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.source_group_name, "Demo");
        assert_eq!(config.agent_threads, 4);
        assert!(PipelineConfig::load(&dir.path().join("missing.json")).is_err());
    }
}

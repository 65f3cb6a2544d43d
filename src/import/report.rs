use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedStep {
    pub step: String,
    pub error: String,
}

/// Outcome of an import run, by step identifier, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedStep>,
}

impl ImportReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, step: impl Into<String>) {
        self.succeeded.push(step.into());
    }

    pub fn record_failure(&mut self, step: impl Into<String>, error: impl Into<String>) {
        self.failed.push(FailedStep {
            step: step.into(),
            error: error.into(),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// What one step did to its table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Bulk commands forwarded to the query engine
    pub commands: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_json_shape() {
        let mut report = ImportReport::new();
        report.record_success("Node:node.csv");
        report.record_failure("Pump:pumphyd.csv", "Not found: pumphyd.csv");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "succeeded": ["Node:node.csv"],
                "failed": [{"step": "Pump:pumphyd.csv", "error": "Not found: pumphyd.csv"}]
            })
        );
        assert!(!report.is_clean());
        assert_eq!(report.total(), 2);
    }
}

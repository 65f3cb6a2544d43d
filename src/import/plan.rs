use super::step::{ImportStep, SourceFormat};
use crate::core::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One bulk command sent to the query engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkCommand {
    pub table: String,
    pub command: String,
}

/// Bulk commands that commit together in one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkUnit {
    pub name: String,
    pub commands: Vec<BulkCommand>,
}

impl BulkUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
        }
    }

    pub fn command(mut self, table: impl Into<String>, command: impl Into<String>) -> Self {
        self.commands.push(BulkCommand {
            table: table.into(),
            command: command.into(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanStep {
    Import(ImportStep),
    Bulk(BulkUnit),
}

impl PlanStep {
    pub fn id(&self) -> String {
        match self {
            PlanStep::Import(step) => step.id(),
            PlanStep::Bulk(unit) => unit.name.clone(),
        }
    }
}

impl From<ImportStep> for PlanStep {
    fn from(step: ImportStep) -> Self {
        PlanStep::Import(step)
    }
}

impl From<BulkUnit> for PlanStep {
    fn from(unit: BulkUnit) -> Self {
        PlanStep::Bulk(unit)
    }
}

/// Folders import sources and their configuration files live in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFolders {
    pub shp: PathBuf,
    pub csv: PathBuf,
    pub cfg: PathBuf,
}

impl ImportFolders {
    pub fn validate(&self) -> Result<()> {
        for (label, dir) in [("shp", &self.shp), ("csv", &self.csv), ("cfg", &self.cfg)] {
            if dir.as_os_str().is_empty() {
                return Err(ModelError::ValidationError(format!(
                    "import folder '{}' is missing",
                    label
                )));
            }
        }
        Ok(())
    }

    fn source_dir(&self, format: SourceFormat) -> &Path {
        match format {
            SourceFormat::Shp => &self.shp,
            SourceFormat::Csv | SourceFormat::GeoJson => &self.csv,
        }
    }
}

/// Ordered list of import steps and bulk units, as stored in a plan file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportPlan {
    pub steps: Vec<PlanStep>,
}

impl ImportPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: impl Into<PlanStep>) -> Self {
        self.steps.push(step.into());
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let plan: ImportPlan = serde_json::from_str(text.trim_start_matches('\u{feff}'))?;
        for step in &plan.steps {
            if let PlanStep::Import(step) = step {
                step.validate()?;
            }
        }
        Ok(plan)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ModelError::Io(format!("Failed to read import plan {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Resolves relative source paths against the folder of their format and
    /// relative config references against the cfg folder.
    pub fn resolve(self, folders: &ImportFolders) -> Result<Self> {
        folders.validate()?;
        let steps = self
            .steps
            .into_iter()
            .map(|step| match step {
                PlanStep::Import(step) => {
                    let source_dir = folders.source_dir(step.source_format()).to_path_buf();
                    PlanStep::Import(step.resolved(&source_dir, &folders.cfg))
                }
                bulk => bulk,
            })
            .collect();
        Ok(Self { steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"{
        "steps": [
            {"kind": "import", "targetTable": "Node", "sourceFormat": "csv",
             "sourcePath": "node.csv", "configRef": "Step01_node.cfg",
             "options": {"Units Behaviour": "User"}},
            {"kind": "import", "targetTable": "Conduit", "sourceFormat": "shp",
             "sourcePath": "Pipe.shp", "configRef": "Step02a_pipe.cfg"},
            {"kind": "bulk", "name": "pump levels",
             "commands": [{"table": "hw_pump", "command": "SET switch_on_level = 1"}]}
        ]
    }"#;

    #[test]
    fn test_plan_parses_tagged_steps() {
        let plan = ImportPlan::from_json_str(PLAN).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.steps[0].id(), "Node:node.csv");
        assert_eq!(plan.steps[2].id(), "pump levels");
    }

    #[test]
    fn test_plan_tolerates_bom() {
        let text = format!("\u{feff}{}", PLAN);
        assert!(ImportPlan::from_json_str(&text).is_ok());
    }

    #[test]
    fn test_resolve_against_folders() {
        let folders = ImportFolders {
            shp: PathBuf::from("/in/shp"),
            csv: PathBuf::from("/in/csv"),
            cfg: PathBuf::from("/in/cfg"),
        };
        let plan = ImportPlan::from_json_str(PLAN).unwrap().resolve(&folders).unwrap();

        let PlanStep::Import(node) = &plan.steps[0] else {
            panic!("expected an import step");
        };
        assert_eq!(node.source_path(), Path::new("/in/csv/node.csv"));
        assert_eq!(node.config_ref(), "/in/cfg/Step01_node.cfg");

        let PlanStep::Import(pipe) = &plan.steps[1] else {
            panic!("expected an import step");
        };
        assert_eq!(pipe.source_path(), Path::new("/in/shp/Pipe.shp"));
    }

    #[test]
    fn test_missing_folder_is_rejected() {
        let folders = ImportFolders {
            shp: PathBuf::new(),
            csv: PathBuf::from("/in/csv"),
            cfg: PathBuf::from("/in/cfg"),
        };
        assert!(ImportPlan::new().resolve(&folders).is_err());
    }
}

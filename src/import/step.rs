use crate::core::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Format of an import source. The bytes themselves are opaque to the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Shp,
    GeoJson,
}

impl SourceFormat {
    /// Guesses the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "shp" => Some(Self::Shp),
            "geojson" | "json" => Some(Self::GeoJson),
            _ => None,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Shp => write!(f, "shp"),
            Self::GeoJson => write!(f, "geojson"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitsBehaviour {
    #[default]
    Prompt,
    User,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicationBehaviour {
    /// Keep the existing row. There is no interactive prompt, so the
    /// incoming row is skipped.
    #[default]
    Prompt,
    /// Replace the existing row with the incoming one.
    Overwrite,
}

/// Options of one import step, spelled the way import option hashes spell them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    #[serde(rename = "Units Behaviour", default)]
    pub units_behaviour: UnitsBehaviour,

    #[serde(rename = "Duplication Behaviour", default)]
    pub duplication_behaviour: DuplicationBehaviour,

    /// Match incoming rows on `asset_id` instead of `id`
    #[serde(rename = "Update Based On Asset ID", default)]
    pub update_based_on_asset_id: bool,

    /// Only touch rows that already exist
    #[serde(rename = "Update Only", default)]
    pub update_only: bool,
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn units(mut self, units: UnitsBehaviour) -> Self {
        self.units_behaviour = units;
        self
    }

    pub fn duplication(mut self, duplication: DuplicationBehaviour) -> Self {
        self.duplication_behaviour = duplication;
        self
    }

    pub fn update_based_on_asset_id(mut self, enabled: bool) -> Self {
        self.update_based_on_asset_id = enabled;
        self
    }

    pub fn update_only(mut self, enabled: bool) -> Self {
        self.update_only = enabled;
        self
    }

    /// Field incoming rows are matched on.
    pub fn match_field(&self) -> &'static str {
        if self.update_based_on_asset_id {
            "asset_id"
        } else {
            "id"
        }
    }
}

/// One source file mapped into one destination table. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStep {
    target_table: String,
    source_format: SourceFormat,
    source_path: PathBuf,
    config_ref: String,
    #[serde(default)]
    options: ImportOptions,
}

impl ImportStep {
    pub fn new(
        target_table: impl Into<String>,
        source_format: SourceFormat,
        source_path: impl Into<PathBuf>,
        config_ref: impl Into<String>,
        options: ImportOptions,
    ) -> Result<Self> {
        let step = Self {
            target_table: target_table.into(),
            source_format,
            source_path: source_path.into(),
            config_ref: config_ref.into(),
            options,
        };
        step.validate()?;
        Ok(step)
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_table.trim().is_empty() {
            return Err(ModelError::ValidationError(
                "import step needs a target table".to_string(),
            ));
        }
        if self.source_path.as_os_str().is_empty() {
            return Err(ModelError::ValidationError(format!(
                "import step for '{}' needs a source path",
                self.target_table
            )));
        }
        Ok(())
    }

    pub fn target_table(&self) -> &str {
        &self.target_table
    }

    pub fn source_format(&self) -> SourceFormat {
        self.source_format
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn config_ref(&self) -> &str {
        &self.config_ref
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Identifier used in reports: `table:file`.
    pub fn id(&self) -> String {
        let file = self
            .source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string());
        format!("{}:{}", self.target_table, file)
    }

    /// Same step with source and config resolved against base folders.
    pub(crate) fn resolved(mut self, source_dir: &Path, config_dir: &Path) -> Self {
        if self.source_path.is_relative() {
            self.source_path = source_dir.join(&self.source_path);
        }
        if !self.config_ref.is_empty() && Path::new(&self.config_ref).is_relative() {
            self.config_ref = config_dir.join(&self.config_ref).display().to_string();
        }
        self
    }
}

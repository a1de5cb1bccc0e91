//! Pipeline definition files.
//!
//! A pipeline file is a JSON object with four ordered stage lists:
//!
//! ```json
//! {
//!   "validators_before": [{ "name": "required_columns", "kwargs": { "columns": ["station"] } }],
//!   "transformers":      [{ "name": "to_number", "kwargs": { "column": "value" } }],
//!   "validators_after":  [],
//!   "exporters":         [{ "name": "csv_export", "kwargs": {} }]
//! }
//! ```
//!
//! Files are validated against the embedded schema (`schemas/pipeline.json`)
//! before deserialization.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::operation::{Kwargs, OperationKind, OperationRegistry};

static PIPELINE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/pipeline.json")).expect("Invalid embedded schema")
});

/// The four controller stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ValidatorsBefore,
    Transformers,
    ValidatorsAfter,
    Exporters,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::ValidatorsBefore,
        Stage::Transformers,
        Stage::ValidatorsAfter,
        Stage::Exporters,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ValidatorsBefore => "validators_before",
            Stage::Transformers => "transformers",
            Stage::ValidatorsAfter => "validators_after",
            Stage::Exporters => "exporters",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `{name, kwargs}` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    pub name: String,
    #[serde(default)]
    pub kwargs: Kwargs,
}

impl StepSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kwargs: Kwargs::new(),
        }
    }

    pub fn with_kwargs(mut self, kwargs: Kwargs) -> Self {
        self.kwargs = kwargs;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub validators_before: Vec<StepSpec>,
    pub transformers: Vec<StepSpec>,
    pub validators_after: Vec<StepSpec>,
    pub exporters: Vec<StepSpec>,
}

/// Validate a JSON value against the pipeline schema.
pub fn validate_pipeline(data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(&PIPELINE_SCHEMA)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

impl PipelineConfig {
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        validate_pipeline(&value).map_err(|errors| ConfigError::InvalidPipeline { errors })?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_json(content: &str) -> ConfigResult<Self> {
        Self::from_value(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        log::debug!("Loading pipeline from {}", path.display());
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json()?)?;
        log::info!("Pipeline saved to {}", path.display());
        Ok(())
    }

    pub fn stage(&self, stage: Stage) -> &[StepSpec] {
        match stage {
            Stage::ValidatorsBefore => &self.validators_before,
            Stage::Transformers => &self.transformers,
            Stage::ValidatorsAfter => &self.validators_after,
            Stage::Exporters => &self.exporters,
        }
    }

    pub fn stage_mut(&mut self, stage: Stage) -> &mut Vec<StepSpec> {
        match stage {
            Stage::ValidatorsBefore => &mut self.validators_before,
            Stage::Transformers => &mut self.transformers,
            Stage::ValidatorsAfter => &mut self.validators_after,
            Stage::Exporters => &mut self.exporters,
        }
    }

    pub fn is_empty(&self) -> bool {
        Stage::ALL.iter().all(|s| self.stage(*s).is_empty())
    }

    /// Skeleton listing every registered transformer with its defaults.
    pub fn template(registry: &OperationRegistry) -> Self {
        let transformers = registry
            .catalog()
            .into_iter()
            .filter(|entry| entry.kind == OperationKind::Transformer)
            .map(|entry| StepSpec::new(entry.name).with_kwargs(entry.defaults))
            .collect();
        Self {
            transformers,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_pipeline() {
        let config = PipelineConfig::from_json(
            r#"{
                "validators_before": [{ "name": "required_columns", "kwargs": { "columns": ["station"] } }],
                "transformers": [{ "name": "strip_whitespace" }]
            }"#,
        )
        .unwrap();
        assert_eq!(config.validators_before[0].kwargs["columns"], json!(["station"]));
        assert_eq!(config.transformers[0].name, "strip_whitespace");
        assert!(config.transformers[0].kwargs.is_empty());
        assert!(config.exporters.is_empty());
    }

    #[test]
    fn test_schema_rejects_bad_files() {
        let unknown_stage = json!({ "loaders": [] });
        assert!(matches!(
            PipelineConfig::from_value(unknown_stage),
            Err(ConfigError::InvalidPipeline { .. })
        ));

        let nameless = json!({ "transformers": [{ "kwargs": {} }] });
        assert!(PipelineConfig::from_value(nameless).is_err());

        let bad_structure = json!({
            "transformers": [{ "name": "x", "kwargs": { "valid_data_structures": ["diagonal"] } }]
        });
        assert!(PipelineConfig::from_value(bad_structure).is_err());

        let singular_key = json!({
            "transformers": [{ "name": "x", "kwargs": { "valid_data_type": ["biology"] } }]
        });
        assert!(PipelineConfig::from_value(singular_key).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipelines").join("pc.json");
        let mut config = PipelineConfig::default();
        config
            .stage_mut(Stage::Exporters)
            .push(StepSpec::new("csv_export"));
        config.save(&path).unwrap();

        assert_eq!(PipelineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_template_lists_transformers() {
        let registry = OperationRegistry::with_builtins();
        let template = PipelineConfig::template(&registry);
        assert!(template.validators_before.is_empty());
        assert!(template.exporters.is_empty());
        let to_number = template
            .transformers
            .iter()
            .find(|s| s.name == "to_number")
            .unwrap();
        assert_eq!(to_number.kwargs["decimal_comma"], json!(true));
        assert!(PipelineConfig::from_json(&template.to_json().unwrap()).is_ok());
    }
}

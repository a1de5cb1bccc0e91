//! The dataset being curated and its classification metadata.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::table::Table;
use crate::error::ConfigError;

/// Internal data type of a dataset that has not been classified yet.
pub const UNKNOWN_DATA_TYPE: &str = "unknown";

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]").expect("static regex"));

/// Physical layout of the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataStructure {
    /// Long format: one parameter per record.
    Row,
    /// Wide format: one column per parameter.
    Column,
}

impl DataStructure {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataStructure::Row => "row",
            DataStructure::Column => "column",
        }
    }
}

impl fmt::Display for DataStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataStructure {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "row" => Ok(DataStructure::Row),
            "column" => Ok(DataStructure::Column),
            other => Err(ConfigError::InvalidSetting {
                key: "data_structure".to_string(),
                message: format!("expected 'row' or 'column', got '{}'", other),
            }),
        }
    }
}

/// Canonical form of a reported data type, used for dispatch.
///
/// Lowercase alphanumerics only; an empty result is [`UNKNOWN_DATA_TYPE`].
pub fn canonical_data_type(data_type: &str) -> String {
    let canonical = NON_ALNUM
        .replace_all(&data_type.trim().to_lowercase(), "")
        .to_string();
    if canonical.is_empty() {
        UNKNOWN_DATA_TYPE.to_string()
    } else {
        canonical
    }
}

/// One dataset instance: the table plus what it is and how it is laid out.
#[derive(Debug, Clone)]
pub struct DataHolder {
    pub data: Table,
    /// Data type as reported by the loader.
    pub data_type: String,
    /// Canonicalized data type, used for applicability checks.
    pub data_type_internal: String,
    pub data_structure: DataStructure,
    pub dataset_name: String,
    /// Which loader produced this holder (e.g. `"csv"`).
    pub holder_kind: String,
    /// Format-specific metadata, passed through untouched.
    pub metadata: Map<String, Value>,
}

impl DataHolder {
    /// Create an unclassified holder around a table.
    pub fn new(dataset_name: impl Into<String>, data: Table) -> Self {
        Self {
            data,
            data_type: String::new(),
            data_type_internal: UNKNOWN_DATA_TYPE.to_string(),
            data_structure: DataStructure::Column,
            dataset_name: dataset_name.into(),
            holder_kind: "memory".to_string(),
            metadata: Map::new(),
        }
    }

    /// Set the reported data type and derive the internal one.
    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.set_data_type(data_type);
        self
    }

    pub fn with_structure(mut self, structure: DataStructure) -> Self {
        self.data_structure = structure;
        self
    }

    pub fn with_holder_kind(mut self, kind: impl Into<String>) -> Self {
        self.holder_kind = kind.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn set_data_type(&mut self, data_type: impl Into<String>) {
        self.data_type = data_type.into();
        self.data_type_internal = canonical_data_type(&self.data_type);
    }

    pub fn is_classified(&self) -> bool {
        self.data_type_internal != UNKNOWN_DATA_TYPE
    }
}

//! Capability-based applicability matching.
//!
//! Every operation declares, per axis, an allow-set and a deny-set:
//!
//! | Axis           | Holder value resolved from      |
//! |----------------|---------------------------------|
//! | data type      | `DataHolder::data_type_internal`|
//! | holder kind    | `DataHolder::holder_kind`       |
//! | data structure | `DataHolder::data_structure`    |
//!
//! On each axis the deny-set is checked first, then the allow-set; empty sets
//! impose nothing. Data types are compared in canonical form on both sides
//! (`Physical-Chemical`, `physical_chemical` and `physicalchemical` match). All three axes must pass. An unclassified holder (data
//! type `unknown`) passes the data-type axis when `bypass_unknown_data_type`
//! is set.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

use super::{Kwargs, OperationKind};
use crate::data::{canonical_data_type, DataHolder, DataStructure, UNKNOWN_DATA_TYPE};
use crate::error::{ConfigError, ConfigResult};

/// Keyword arguments that override an operation's declared sets.
pub const APPLICABILITY_KEYS: [&str; 6] = [
    "valid_data_types",
    "invalid_data_types",
    "valid_holder_kinds",
    "invalid_holder_kinds",
    "valid_data_structures",
    "invalid_data_structures",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    DataType,
    HolderKind,
    DataStructure,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Axis::DataType => "data type",
            Axis::HolderKind => "holder kind",
            Axis::DataStructure => "data structure",
        })
    }
}

/// Why an operation did not run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipReason {
    pub axis: Axis,
    pub value: String,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} `{}`", self.axis, self.value)
    }
}

/// Allow/deny pair for one axis. Values are stored lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisRule {
    allow: BTreeSet<String>,
    deny: BTreeSet<String>,
}

impl AxisRule {
    pub fn allow<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allow = values.into_iter().map(|v| v.as_ref().to_lowercase()).collect();
        self
    }

    pub fn deny<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.deny = values.into_iter().map(|v| v.as_ref().to_lowercase()).collect();
        self
    }

    pub fn permits(&self, value: &str) -> bool {
        let value = value.to_lowercase();
        if !self.deny.is_empty() && self.deny.contains(&value) {
            return false;
        }
        if !self.allow.is_empty() && !self.allow.contains(&value) {
            return false;
        }
        true
    }

    pub fn allowed(&self) -> &BTreeSet<String> {
        &self.allow
    }

    pub fn denied(&self) -> &BTreeSet<String> {
        &self.deny
    }
}

/// The three axes of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applicability {
    pub data_type: AxisRule,
    pub holder_kind: AxisRule,
    pub data_structure: AxisRule,
    /// Let unclassified holders through the data-type axis.
    pub bypass_unknown_data_type: bool,
}

impl Applicability {
    /// Unrestricted, with the family's default for unclassified holders.
    pub fn for_kind(kind: OperationKind) -> Self {
        Self {
            data_type: AxisRule::default(),
            holder_kind: AxisRule::default(),
            data_structure: AxisRule::default(),
            bypass_unknown_data_type: kind.bypasses_unknown_data_type(),
        }
    }

    pub fn valid_data_types<I: IntoIterator<Item = S>, S: AsRef<str>>(mut self, values: I) -> Self {
        self.data_type = self
            .data_type
            .allow(values.into_iter().map(|v| canonical_data_type(v.as_ref())));
        self
    }

    pub fn invalid_data_types<I: IntoIterator<Item = S>, S: AsRef<str>>(mut self, values: I) -> Self {
        self.data_type = self
            .data_type
            .deny(values.into_iter().map(|v| canonical_data_type(v.as_ref())));
        self
    }

    pub fn valid_holder_kinds<I: IntoIterator<Item = S>, S: AsRef<str>>(mut self, values: I) -> Self {
        self.holder_kind = self.holder_kind.allow(values);
        self
    }

    pub fn invalid_holder_kinds<I: IntoIterator<Item = S>, S: AsRef<str>>(mut self, values: I) -> Self {
        self.holder_kind = self.holder_kind.deny(values);
        self
    }

    pub fn valid_structures(mut self, values: &[DataStructure]) -> Self {
        self.data_structure = self.data_structure.allow(values.iter().map(|s| s.as_str()));
        self
    }

    pub fn invalid_structures(mut self, values: &[DataStructure]) -> Self {
        self.data_structure = self.data_structure.deny(values.iter().map(|s| s.as_str()));
        self
    }

    pub fn bypass_unknown(mut self, bypass: bool) -> Self {
        self.bypass_unknown_data_type = bypass;
        self
    }

    /// Override declared sets with the applicability keys found in `kwargs`.
    pub fn with_kwargs(mut self, operation: &str, kwargs: &Kwargs) -> ConfigResult<Self> {
        for key in APPLICABILITY_KEYS {
            let Some(raw) = kwargs.get(key) else {
                continue;
            };
            let values = string_list(raw).ok_or_else(|| ConfigError::InvalidApplicability {
                operation: operation.to_string(),
                message: format!("'{}' must be a string or a list of strings", key),
            })?;

            if key.ends_with("data_structures") {
                for value in &values {
                    value.parse::<DataStructure>().map_err(|_| {
                        ConfigError::InvalidApplicability {
                            operation: operation.to_string(),
                            message: format!("'{}' is not a data structure", value),
                        }
                    })?;
                }
            }

            self = match key {
                "valid_data_types" => self.valid_data_types(values),
                "invalid_data_types" => self.invalid_data_types(values),
                "valid_holder_kinds" => self.valid_holder_kinds(values),
                "invalid_holder_kinds" => self.invalid_holder_kinds(values),
                "valid_data_structures" => {
                    self.data_structure = self.data_structure.allow(values);
                    self
                }
                _ => {
                    self.data_structure = self.data_structure.deny(values);
                    self
                }
            };
        }
        Ok(self)
    }

    /// Check every axis against the holder.
    pub fn check(&self, holder: &DataHolder) -> Result<(), SkipReason> {
        let data_type = canonical_data_type(&holder.data_type_internal);
        let unknown_bypass = self.bypass_unknown_data_type && data_type == UNKNOWN_DATA_TYPE;
        if !unknown_bypass && !self.data_type.permits(&data_type) {
            return Err(SkipReason {
                axis: Axis::DataType,
                value: data_type,
            });
        }

        if !self.holder_kind.permits(&holder.holder_kind) {
            return Err(SkipReason {
                axis: Axis::HolderKind,
                value: holder.holder_kind.clone(),
            });
        }

        let structure = holder.data_structure.as_str();
        if !self.data_structure.permits(structure) {
            return Err(SkipReason {
                axis: Axis::DataStructure,
                value: structure.to_string(),
            });
        }

        Ok(())
    }
}

fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Table;
    use serde_json::json;

    fn holder(data_type: &str) -> DataHolder {
        DataHolder::new("ds", Table::default()).with_data_type(data_type)
    }

    #[test]
    fn test_deny_only() {
        let rule = Applicability::for_kind(OperationKind::Transformer).invalid_data_types(["x"]);
        assert!(rule.check(&holder("y")).is_ok());
        let reason = rule.check(&holder("x")).unwrap_err();
        assert_eq!(reason.axis, Axis::DataType);
        assert_eq!(reason.value, "x");
    }

    #[test]
    fn test_allow_only() {
        let rule = Applicability::for_kind(OperationKind::Transformer).valid_data_types(["x"]);
        assert!(rule.check(&holder("x")).is_ok());
        assert!(rule.check(&holder("y")).is_err());
    }

    #[test]
    fn test_deny_checked_before_allow() {
        let rule = Applicability::for_kind(OperationKind::Validator)
            .valid_data_types(["x", "y"])
            .invalid_data_types(["x"]);
        assert!(rule.check(&holder("x")).is_err());
        assert!(rule.check(&holder("y")).is_ok());
        assert!(rule.check(&holder("z")).is_err());
    }

    #[test]
    fn test_data_types_compared_canonically() {
        let rule = Applicability::for_kind(OperationKind::Transformer)
            .valid_data_types(["physical_chemical"])
            .invalid_data_types(["Bio-Logy"]);
        assert!(rule.data_type.allowed().contains("physicalchemical"));
        assert!(rule.check(&holder("Physical-Chemical")).is_ok());
        assert!(rule.check(&holder("biology")).is_err());

        let kwargs = json!({ "invalid_data_types": ["Physical Chemical"] });
        let rule = Applicability::for_kind(OperationKind::Transformer)
            .with_kwargs("op", kwargs.as_object().unwrap())
            .unwrap();
        assert!(rule.check(&holder("physicalchemical")).is_err());
    }

    #[test]
    fn test_unknown_bypass_per_family() {
        let unclassified = DataHolder::new("ds", Table::default());

        let transformer =
            Applicability::for_kind(OperationKind::Transformer).valid_data_types(["x"]);
        assert!(transformer.check(&unclassified).is_ok());

        let exporter = Applicability::for_kind(OperationKind::Exporter).valid_data_types(["x"]);
        let reason = exporter.check(&unclassified).unwrap_err();
        assert_eq!(reason.value, UNKNOWN_DATA_TYPE);

        let strict = transformer.bypass_unknown(false);
        assert!(strict.check(&unclassified).is_err());
    }

    #[test]
    fn test_structure_and_kind_axes() {
        let rule = Applicability::for_kind(OperationKind::Transformer)
            .valid_structures(&[DataStructure::Row])
            .invalid_holder_kinds(["lims"]);
        let wide = holder("x");
        assert_eq!(rule.check(&wide).unwrap_err().axis, Axis::DataStructure);

        let long = holder("x").with_structure(DataStructure::Row);
        assert!(rule.check(&long).is_ok());
        let lims = long.with_holder_kind("LIMS");
        assert_eq!(rule.check(&lims).unwrap_err().axis, Axis::HolderKind);
    }

    #[test]
    fn test_kwargs_override() {
        let kwargs = json!({
            "invalid_data_types": "physicalchemical",
            "valid_data_structures": ["column"]
        });
        let rule = Applicability::for_kind(OperationKind::Transformer)
            .with_kwargs("op", kwargs.as_object().unwrap())
            .unwrap();
        assert!(rule.data_type.denied().contains("physicalchemical"));
        assert!(rule.data_structure.allowed().contains("column"));
    }

    #[test]
    fn test_malformed_kwargs() {
        let kwargs = json!({ "valid_data_types": 5 });
        let err = Applicability::for_kind(OperationKind::Transformer)
            .with_kwargs("op", kwargs.as_object().unwrap())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidApplicability { .. }));

        let kwargs = json!({ "invalid_data_structures": ["diagonal"] });
        assert!(Applicability::for_kind(OperationKind::Transformer)
            .with_kwargs("op", kwargs.as_object().unwrap())
            .is_err());
    }
}

//! Built-in operation catalog.
//!
//! Each built-in is a plain serde parameter struct implementing [`Builtin`].
//! [`Configured`] wraps it into an [`Operation`]: kwargs are deserialized into
//! the parameter struct, the applicability keys are split off and override
//! the declared sets. A key that is neither a parameter nor an applicability
//! key is rejected, except for children of a composite, which share kwargs
//! with their siblings.
//!
//! | Name                 | Kind        |
//! |----------------------|-------------|
//! | `strip_whitespace`   | transformer |
//! | `map_values`         | transformer |
//! | `replace_values`     | transformer |
//! | `to_number`          | transformer |
//! | `add_column`         | transformer |
//! | `classify_data_type` | transformer |
//! | `wide_to_long`       | transformer |
//! | `long_to_wide`       | transformer |
//! | `required_columns`   | validator   |
//! | `not_empty`          | validator   |
//! | `numeric_range`      | validator   |
//! | `unique_rows`        | validator   |
//! | `csv_export`         | exporter    |
//! | `json_export`        | exporter    |

mod exporters;
mod reshape;
mod transformers;
mod validators;

pub use exporters::{CsvExport, JsonExport};
pub use reshape::{LongToWide, WideToLong};
pub use transformers::{AddColumn, ClassifyDataType, MapValues, ReplaceValues, StripWhitespace, ToNumber};
pub use validators::{NotEmpty, NumericRange, RequiredColumns, UniqueRows};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::applicability::{Applicability, APPLICABILITY_KEYS};
use super::context::OperationContext;
use super::registry::OperationSpec;
use super::{Flow, Kwargs, Operation, OperationKind};
use crate::data::DataHolder;
use crate::error::{ConfigError, ConfigResult, OperationResult};

/// A built-in operation described by its parameters.
pub trait Builtin: DeserializeOwned + Serialize + Default + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;
    const KIND: OperationKind;

    /// Sets declared by the operation itself, before kwargs overrides.
    fn declared_applicability() -> Applicability {
        Applicability::for_kind(Self::KIND)
    }

    /// Reject parameter combinations serde cannot express.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    fn run(&mut self, holder: &mut DataHolder, ctx: &mut OperationContext<'_>) -> OperationResult<Flow>;

    fn spec() -> OperationSpec {
        OperationSpec {
            name: Self::NAME,
            kind: Self::KIND,
            description: Self::DESCRIPTION,
            defaults: defaults_of::<Self>,
            build: Configured::<Self>::build,
            build_shared: Configured::<Self>::build_shared,
        }
    }
}

/// Every built-in single operation.
pub fn specs() -> Vec<OperationSpec> {
    vec![
        StripWhitespace::spec(),
        MapValues::spec(),
        ReplaceValues::spec(),
        ToNumber::spec(),
        AddColumn::spec(),
        ClassifyDataType::spec(),
        WideToLong::spec(),
        LongToWide::spec(),
        RequiredColumns::spec(),
        NotEmpty::spec(),
        NumericRange::spec(),
        UniqueRows::spec(),
        CsvExport::spec(),
        JsonExport::spec(),
    ]
}

/// Deserialize the operation parameters from kwargs, ignoring the
/// applicability keys.
pub fn parse_params<P: DeserializeOwned>(operation: &str, kwargs: &Kwargs) -> ConfigResult<P> {
    let mut params = kwargs.clone();
    for key in APPLICABILITY_KEYS {
        params.remove(key);
    }
    serde_json::from_value(Value::Object(params)).map_err(|e| ConfigError::InvalidKwargs {
        operation: operation.to_string(),
        message: e.to_string(),
    })
}

/// Default parameters as kwargs.
pub fn defaults_of<P: Serialize + Default>() -> Kwargs {
    params_as_kwargs(&P::default())
}

fn params_as_kwargs<P: Serialize>(params: &P) -> Kwargs {
    match serde_json::to_value(params) {
        Ok(Value::Object(map)) => map,
        _ => Kwargs::new(),
    }
}

/// Fail on the first kwargs key that is neither in `accepted` nor an
/// applicability key.
pub fn reject_unknown_keys(operation: &str, kwargs: &Kwargs, accepted: &Kwargs) -> ConfigResult<()> {
    let unknown = kwargs
        .keys()
        .find(|key| !accepted.contains_key(*key) && !APPLICABILITY_KEYS.contains(&key.as_str()));
    match unknown {
        Some(key) => Err(ConfigError::InvalidKwargs {
            operation: operation.to_string(),
            message: format!("unknown key '{}'", key),
        }),
        None => Ok(()),
    }
}

/// A built-in bound to its kwargs.
#[derive(Debug)]
pub struct Configured<B> {
    params: B,
    applicability: Applicability,
    kwargs: Kwargs,
}

impl<B: Builtin> Configured<B> {
    pub fn new(kwargs: &Kwargs) -> ConfigResult<Self> {
        reject_unknown_keys(B::NAME, kwargs, &defaults_of::<B>())?;
        Self::from_kwargs(kwargs)
    }

    /// Like [`Configured::new`], ignoring keys meant for sibling operations.
    pub fn shared(kwargs: &Kwargs) -> ConfigResult<Self> {
        Self::from_kwargs(kwargs)
    }

    fn from_kwargs(kwargs: &Kwargs) -> ConfigResult<Self> {
        let params: B = parse_params(B::NAME, kwargs)?;
        params.validate().map_err(|message| ConfigError::InvalidKwargs {
            operation: B::NAME.to_string(),
            message,
        })?;
        let applicability = B::declared_applicability().with_kwargs(B::NAME, kwargs)?;

        // Effective configuration: resolved parameters plus any overrides.
        let mut effective = params_as_kwargs(&params);
        for key in APPLICABILITY_KEYS {
            if let Some(value) = kwargs.get(key) {
                effective.insert(key.to_string(), value.clone());
            }
        }

        Ok(Self {
            params,
            applicability,
            kwargs: effective,
        })
    }

    pub fn build(kwargs: &Kwargs) -> ConfigResult<Box<dyn Operation>> {
        Ok(Box::new(Self::new(kwargs)?))
    }

    pub fn build_shared(kwargs: &Kwargs) -> ConfigResult<Box<dyn Operation>> {
        Ok(Box::new(Self::shared(kwargs)?))
    }

    pub fn params(&self) -> &B {
        &self.params
    }
}

impl<B: Builtin> Operation for Configured<B> {
    fn name(&self) -> &str {
        B::NAME
    }

    fn description(&self) -> &str {
        B::DESCRIPTION
    }

    fn kind(&self) -> OperationKind {
        B::KIND
    }

    fn applicability(&self) -> &Applicability {
        &self.applicability
    }

    fn kwargs(&self) -> Kwargs {
        self.kwargs.clone()
    }

    fn run(&mut self, holder: &mut DataHolder, ctx: &mut OperationContext<'_>) -> OperationResult<Flow> {
        self.params.run(holder, ctx)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use serde_json::Value;

    use super::Builtin;
    use crate::data::{DataHolder, Table};
    use crate::diagnostics::{Level, LogEntry};
    use crate::operation::{Kwargs, Operation, OperationInfo};
    use crate::session::Session;

    pub fn holder(records: Value) -> DataHolder {
        let records = records.as_array().cloned().unwrap_or_default();
        DataHolder::new("ds", Table::from_records(&records)).with_data_type("physicalchemical")
    }

    pub fn apply<B: Builtin>(kwargs: Value, holder: &mut DataHolder, session: &mut Session) -> OperationInfo {
        let kwargs: Kwargs = kwargs.as_object().cloned().unwrap_or_default();
        let mut op = super::Configured::<B>::new(&kwargs).unwrap();
        op.apply(holder, session).unwrap()
    }

    pub fn logged_at(session: &Session, level: Level) -> Vec<&LogEntry> {
        session
            .log
            .all_entries()
            .iter()
            .filter(|e| e.level == level)
            .collect()
    }
}

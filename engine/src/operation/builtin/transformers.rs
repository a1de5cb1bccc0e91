//! Cell-level and classification transformers.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

use super::Builtin;
use crate::data::{cell_text, is_blank, DataHolder};
use crate::diagnostics::{Level, Purpose};
use crate::error::{OperationError, OperationResult};
use crate::operation::{Flow, OperationContext, OperationKind};

/// Columns that exist in the table; missing ones are reported once.
fn present_columns(holder: &DataHolder, wanted: &[String], ctx: &mut OperationContext<'_>) -> Vec<String> {
    if wanted.is_empty() {
        return holder.data.columns().to_vec();
    }
    let mut present = Vec::with_capacity(wanted.len());
    for column in wanted {
        if holder.data.has_column(column) {
            present.push(column.clone());
        } else {
            let draft = ctx
                .draft(Level::Warning, format!("Column `{}` not found", column))
                .item(column.as_str());
            ctx.emit(draft);
        }
    }
    present
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// =============================================================================
// strip_whitespace
// =============================================================================

/// Trim leading and trailing whitespace from text cells.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StripWhitespace {
    /// Columns to clean; empty means every column.
    pub columns: Vec<String>,
}

impl Builtin for StripWhitespace {
    const NAME: &'static str = "strip_whitespace";
    const DESCRIPTION: &'static str = "Trim leading and trailing whitespace from text cells";
    const KIND: OperationKind = OperationKind::Transformer;

    fn run(&mut self, holder: &mut DataHolder, ctx: &mut OperationContext<'_>) -> OperationResult<Flow> {
        let mut changed = 0usize;
        for column in present_columns(holder, &self.columns, ctx) {
            holder.data.map_column(&column, |_, value| match value {
                Value::String(s) if s.trim().len() != s.len() => {
                    changed += 1;
                    Value::String(s.trim().to_string())
                }
                other => other.clone(),
            })?;
        }
        if changed > 0 {
            ctx.log(Level::Info, format!("Stripped whitespace from {} cells", changed));
        }
        Ok(Flow::Continue)
    }
}

// =============================================================================
// map_values
// =============================================================================

/// Translate the values of one column through a lookup table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MapValues {
    pub column: String,
    pub mapping: BTreeMap<String, Value>,
    pub case_insensitive: bool,
    /// Replacement for unmapped values; unmapped values are kept when absent.
    pub default: Option<Value>,
}

impl MapValues {
    fn lookup(&self, key: &str) -> Option<&Value> {
        if self.case_insensitive {
            let key = key.to_lowercase();
            self.mapping
                .iter()
                .find(|(k, _)| k.to_lowercase() == key)
                .map(|(_, v)| v)
        } else {
            self.mapping.get(key)
        }
    }
}

impl Builtin for MapValues {
    const NAME: &'static str = "map_values";
    const DESCRIPTION: &'static str = "Translate column values through a lookup table";
    const KIND: OperationKind = OperationKind::Transformer;

    fn run(&mut self, holder: &mut DataHolder, ctx: &mut OperationContext<'_>) -> OperationResult<Flow> {
        if present_columns(holder, std::slice::from_ref(&self.column), ctx).is_empty() {
            return Ok(Flow::Continue);
        }

        let mut unmapped: BTreeMap<String, usize> = BTreeMap::new();
        holder.data.map_column(&self.column, |row, value| {
            let Some(text) = as_text(value) else {
                return value.clone();
            };
            match self.lookup(&text) {
                Some(mapped) => mapped.clone(),
                None => {
                    unmapped.entry(text).or_insert(row + 1);
                    self.default.clone().unwrap_or_else(|| value.clone())
                }
            }
        })?;

        for (value, row) in unmapped {
            let draft = ctx
                .draft(Level::Warning, format!("No mapping for value in `{}`", self.column))
                .item(value)
                .row(row);
            ctx.emit(draft);
        }
        Ok(Flow::Continue)
    }
}

// =============================================================================
// replace_values
// =============================================================================

/// Regex replacement over text cells.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaceValues {
    /// Columns to rewrite; empty means every column.
    pub columns: Vec<String>,
    pub pattern: String,
    pub replacement: String,
}

impl Builtin for ReplaceValues {
    const NAME: &'static str = "replace_values";
    const DESCRIPTION: &'static str = "Replace regex matches in text cells";
    const KIND: OperationKind = OperationKind::Transformer;

    fn validate(&self) -> Result<(), String> {
        Regex::new(&self.pattern).map(|_| ()).map_err(|e| e.to_string())
    }

    fn run(&mut self, holder: &mut DataHolder, ctx: &mut OperationContext<'_>) -> OperationResult<Flow> {
        if self.pattern.is_empty() {
            return Ok(Flow::Continue);
        }
        let re = Regex::new(&self.pattern).map_err(|e| OperationError::Contract(e.to_string()))?;

        let mut changed = 0usize;
        for column in present_columns(holder, &self.columns, ctx) {
            holder.data.map_column(&column, |_, value| match value {
                Value::String(s) if re.is_match(s) => {
                    changed += 1;
                    Value::String(re.replace_all(s, self.replacement.as_str()).into_owned())
                }
                other => other.clone(),
            })?;
        }
        ctx.log(Level::Debug, format!("Replaced `{}` in {} cells", self.pattern, changed));
        Ok(Flow::Continue)
    }
}

// =============================================================================
// to_number
// =============================================================================

/// Parse text cells as numbers. Comma decimals are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToNumber {
    pub column: String,
    pub decimal_comma: bool,
}

impl Default for ToNumber {
    fn default() -> Self {
        Self {
            column: String::new(),
            decimal_comma: true,
        }
    }
}

/// Parse a numeric cell; `None` when the text is not a number.
pub(crate) fn parse_number(text: &str, decimal_comma: bool) -> Option<Value> {
    let trimmed = text.trim();
    let normalized = if decimal_comma {
        trimmed.replace(',', ".")
    } else {
        trimmed.to_string()
    };
    if let Ok(n) = normalized.parse::<i64>() {
        return Some(Value::Number(n.into()));
    }
    normalized
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

impl Builtin for ToNumber {
    const NAME: &'static str = "to_number";
    const DESCRIPTION: &'static str = "Convert a column to numbers";
    const KIND: OperationKind = OperationKind::Transformer;

    fn run(&mut self, holder: &mut DataHolder, ctx: &mut OperationContext<'_>) -> OperationResult<Flow> {
        if present_columns(holder, std::slice::from_ref(&self.column), ctx).is_empty() {
            return Ok(Flow::Continue);
        }

        let mut rejected: Vec<(usize, String)> = Vec::new();
        holder.data.map_column(&self.column, |row, value| match value {
            Value::Number(_) => value.clone(),
            _ if is_blank(value) => Value::Null,
            _ => {
                let text = cell_text(value);
                parse_number(&text, self.decimal_comma).unwrap_or_else(|| {
                    rejected.push((row + 1, text));
                    Value::Null
                })
            }
        })?;

        for (row, text) in rejected {
            let draft = ctx
                .draft(Level::Warning, format!("Non-numeric value in `{}` was blanked", self.column))
                .purpose(Purpose::Feedback)
                .item(text)
                .row(row);
            ctx.emit(draft);
        }
        Ok(Flow::Continue)
    }
}

// =============================================================================
// add_column
// =============================================================================

/// Add a constant column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AddColumn {
    pub column: String,
    pub value: Value,
    /// Replace the values of an existing column instead of warning.
    pub overwrite: bool,
}

impl Builtin for AddColumn {
    const NAME: &'static str = "add_column";
    const DESCRIPTION: &'static str = "Add a column filled with a constant value";
    const KIND: OperationKind = OperationKind::Transformer;

    fn run(&mut self, holder: &mut DataHolder, ctx: &mut OperationContext<'_>) -> OperationResult<Flow> {
        if self.column.is_empty() {
            ctx.log(Level::Warning, "No column name given");
            return Ok(Flow::Continue);
        }
        if holder.data.has_column(&self.column) {
            if !self.overwrite {
                let draft = ctx
                    .draft(Level::Warning, "Column already exists and was left untouched")
                    .item(self.column.as_str());
                ctx.emit(draft);
                return Ok(Flow::Continue);
            }
            let values = vec![self.value.clone(); holder.data.len()];
            holder.data.set_column(&self.column, values)?;
        } else {
            holder.data.add_column(self.column.clone(), self.value.clone())?;
        }
        Ok(Flow::Continue)
    }
}

// =============================================================================
// classify_data_type
// =============================================================================

/// Assign the dataset's data type, either fixed or read from a column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyDataType {
    /// Fixed data type to assign.
    pub data_type: Option<String>,
    /// Column whose most frequent value is the data type.
    pub column: Option<String>,
}

impl ClassifyDataType {
    fn from_column(&self, holder: &DataHolder) -> Option<String> {
        let column = self.column.as_deref()?;
        let values = holder.data.column(column).ok()?;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for value in values.into_iter().filter(|v| !is_blank(v)) {
            *counts.entry(cell_text(value).trim().to_string()).or_default() += 1;
        }
        // Ties resolve to the alphabetically first value.
        counts
            .into_iter()
            .fold(None, |best: Option<(String, usize)>, (value, n)| match best {
                Some((_, m)) if m >= n => best,
                _ => Some((value, n)),
            })
            .map(|(value, _)| value)
    }
}

impl Builtin for ClassifyDataType {
    const NAME: &'static str = "classify_data_type";
    const DESCRIPTION: &'static str = "Assign the dataset's data type";
    const KIND: OperationKind = OperationKind::Transformer;

    fn validate(&self) -> Result<(), String> {
        if self.data_type.is_some() && self.column.is_some() {
            return Err("give either 'data_type' or 'column', not both".to_string());
        }
        Ok(())
    }

    fn run(&mut self, holder: &mut DataHolder, ctx: &mut OperationContext<'_>) -> OperationResult<Flow> {
        let resolved = match &self.data_type {
            Some(fixed) => Some(fixed.clone()),
            None => self.from_column(holder),
        };

        match resolved {
            Some(data_type) => {
                holder.set_data_type(data_type);
                ctx.log(
                    Level::Info,
                    format!(
                        "Classified as `{}` (internal `{}`)",
                        holder.data_type, holder.data_type_internal
                    ),
                );
            }
            None if holder.is_classified() => {}
            None => {
                ctx.feedback(Level::Warning, "Could not determine the data type");
            }
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{apply, holder, logged_at};
    use super::*;
    use crate::data::{DataHolder, Table};
    use crate::session::Session;
    use serde_json::json;

    #[test]
    fn test_strip_whitespace_all_columns() {
        let mut session = Session::default();
        let mut data = holder(json!([{ "a": "  x ", "b": 3 }, { "a": "y", "b": " z" }]));
        apply::<StripWhitespace>(json!({}), &mut data, &mut session);
        assert_eq!(data.data.cell(0, "a"), Some(&json!("x")));
        assert_eq!(data.data.cell(1, "b"), Some(&json!("z")));
        assert_eq!(data.data.cell(0, "b"), Some(&json!(3)));
        assert_eq!(logged_at(&session, Level::Info)[0].message, "Stripped whitespace from 2 cells");
    }

    #[test]
    fn test_missing_column_is_a_warning() {
        let mut session = Session::default();
        let mut data = holder(json!([{ "a": " x " }]));
        let info = apply::<StripWhitespace>(json!({ "columns": ["nope"] }), &mut data, &mut session);
        assert!(info.has_run());
        let warnings = logged_at(&session, Level::Warning);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].item.as_deref(), Some("nope"));
        assert_eq!(data.data.cell(0, "a"), Some(&json!(" x ")));
    }

    #[test]
    fn test_map_values() {
        let mut session = Session::default();
        let mut data = holder(json!([{ "unit": "MG/L" }, { "unit": "ug/l" }, { "unit": "ppm" }]));
        apply::<MapValues>(
            json!({
                "column": "unit",
                "mapping": { "mg/l": "mg L-1", "ug/l": "µg L-1" },
                "case_insensitive": true
            }),
            &mut data,
            &mut session,
        );
        assert_eq!(data.data.cell(0, "unit"), Some(&json!("mg L-1")));
        assert_eq!(data.data.cell(1, "unit"), Some(&json!("µg L-1")));
        assert_eq!(data.data.cell(2, "unit"), Some(&json!("ppm")));

        let warnings = logged_at(&session, Level::Warning);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].item.as_deref(), Some("ppm"));
        assert_eq!(warnings[0].row_number, Some(3));
    }

    #[test]
    fn test_map_values_default() {
        let mut session = Session::default();
        let mut data = holder(json!([{ "flag": "A" }, { "flag": "Q" }]));
        apply::<MapValues>(
            json!({ "column": "flag", "mapping": { "A": "accepted" }, "default": "other" }),
            &mut data,
            &mut session,
        );
        assert_eq!(data.data.cell(1, "flag"), Some(&json!("other")));
    }

    #[test]
    fn test_replace_values() {
        let mut session = Session::default();
        let mut data = holder(json!([{ "station": "ST-01" }, { "station": "ST 02" }]));
        apply::<ReplaceValues>(
            json!({ "pattern": "[- ]", "replacement": "" }),
            &mut data,
            &mut session,
        );
        assert_eq!(data.data.cell(0, "station"), Some(&json!("ST01")));
        assert_eq!(data.data.cell(1, "station"), Some(&json!("ST02")));
    }

    #[test]
    fn test_replace_values_rejects_bad_pattern() {
        let kwargs = json!({ "pattern": "(" });
        assert!(super::super::Configured::<ReplaceValues>::new(kwargs.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("12", true), Some(json!(12)));
        assert_eq!(parse_number(" 7,5 ", true), Some(json!(7.5)));
        assert_eq!(parse_number("7,5", false), None);
        assert_eq!(parse_number("-0.25", false), Some(json!(-0.25)));
        assert_eq!(parse_number("n.d.", true), None);
    }

    #[test]
    fn test_to_number_blanks_bad_values() {
        let mut session = Session::default();
        let mut data = holder(json!([
            { "value": "1,5" },
            { "value": "<LOQ" },
            { "value": "" },
            { "value": 4 }
        ]));
        apply::<ToNumber>(json!({ "column": "value" }), &mut data, &mut session);
        let column: Vec<Value> = data.data.column("value").unwrap().into_iter().cloned().collect();
        assert_eq!(column, vec![json!(1.5), Value::Null, Value::Null, json!(4)]);

        let warnings = logged_at(&session, Level::Warning);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].row_number, Some(2));
        assert_eq!(warnings[0].item.as_deref(), Some("<LOQ"));
    }

    #[test]
    fn test_add_column() {
        let mut session = Session::default();
        let mut data = holder(json!([{ "a": 1 }, { "a": 2 }]));
        apply::<AddColumn>(json!({ "column": "source", "value": "lab" }), &mut data, &mut session);
        assert_eq!(data.data.cell(1, "source"), Some(&json!("lab")));

        apply::<AddColumn>(json!({ "column": "a", "value": 0 }), &mut data, &mut session);
        assert_eq!(data.data.cell(0, "a"), Some(&json!(1)));
        assert_eq!(logged_at(&session, Level::Warning).len(), 1);

        apply::<AddColumn>(json!({ "column": "a", "value": 0, "overwrite": true }), &mut data, &mut session);
        assert_eq!(data.data.cell(0, "a"), Some(&json!(0)));
    }

    #[test]
    fn test_classify_from_column() {
        let mut session = Session::default();
        let records = [
            json!({ "type": "Physical-Chemical" }),
            json!({ "type": "Physical-Chemical" }),
            json!({ "type": "Biology" }),
        ];
        let mut data = DataHolder::new("ds", Table::from_records(&records));
        assert!(!data.is_classified());

        let info = apply::<ClassifyDataType>(json!({ "column": "type" }), &mut data, &mut session);
        assert!(info.has_run());
        assert_eq!(data.data_type, "Physical-Chemical");
        assert_eq!(data.data_type_internal, "physicalchemical");
    }

    #[test]
    fn test_classify_unresolved_is_feedback() {
        let mut session = Session::default();
        let mut data = DataHolder::new("ds", Table::from_records(&[json!({ "a": 1 })]));
        apply::<ClassifyDataType>(json!({ "column": "type" }), &mut data, &mut session);
        let warnings = logged_at(&session, Level::Warning);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].purpose, Purpose::Feedback);
    }

    #[test]
    fn test_classify_rejects_both_sources() {
        let kwargs = json!({ "data_type": "x", "column": "y" });
        assert!(super::super::Configured::<ClassifyDataType>::new(kwargs.as_object().unwrap()).is_err());
    }
}

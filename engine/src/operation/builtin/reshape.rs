//! Conversions between wide (one column per parameter) and long (one
//! parameter per row) layouts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::Builtin;
use crate::data::{cell_text, is_blank, DataHolder, DataStructure, Table};
use crate::diagnostics::{Level, Purpose};
use crate::error::OperationResult;
use crate::operation::{Applicability, Flow, OperationContext, OperationKind};

fn default_parameter_column() -> String {
    "parameter".to_string()
}

fn default_value_column() -> String {
    "value".to_string()
}

/// Id columns must be distinct and must not reuse the parameter or value
/// column names.
fn check_layout_columns(ids: &[String], parameter_column: &str, value_column: &str) -> Result<(), String> {
    if parameter_column == value_column {
        return Err("parameter and value columns must differ".to_string());
    }
    for (i, id) in ids.iter().enumerate() {
        if ids[..i].contains(id) {
            return Err(format!("id column '{}' is listed twice", id));
        }
        if id == parameter_column || id == value_column {
            return Err(format!("id column '{}' clashes with the parameter/value columns", id));
        }
    }
    Ok(())
}

/// Keep the id columns present in `table`, warning about the others.
fn resolve_ids(table: &Table, ids: &[String], ctx: &mut OperationContext<'_>) -> Vec<String> {
    let mut present = Vec::with_capacity(ids.len());
    for id in ids {
        if table.has_column(id) {
            present.push(id.clone());
        } else {
            let draft = ctx
                .draft(Level::Warning, format!("Id column `{}` not found", id))
                .item(id.as_str());
            ctx.emit(draft);
        }
    }
    present
}

// =============================================================================
// wide_to_long
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WideToLong {
    /// Columns repeated on every output row.
    pub id_columns: Vec<String>,
    /// Columns melted into parameter/value pairs; empty means all non-id columns.
    pub value_columns: Vec<String>,
    pub parameter_column: String,
    pub value_column: String,
    pub drop_blank: bool,
}

impl Default for WideToLong {
    fn default() -> Self {
        Self {
            id_columns: Vec::new(),
            value_columns: Vec::new(),
            parameter_column: default_parameter_column(),
            value_column: default_value_column(),
            drop_blank: true,
        }
    }
}

impl Builtin for WideToLong {
    const NAME: &'static str = "wide_to_long";
    const DESCRIPTION: &'static str = "Melt parameter columns into parameter/value rows";
    const KIND: OperationKind = OperationKind::Transformer;

    fn declared_applicability() -> Applicability {
        Applicability::for_kind(Self::KIND).valid_structures(&[DataStructure::Column])
    }

    fn validate(&self) -> Result<(), String> {
        check_layout_columns(&self.id_columns, &self.parameter_column, &self.value_column)
    }

    fn run(&mut self, holder: &mut DataHolder, ctx: &mut OperationContext<'_>) -> OperationResult<Flow> {
        let source = &holder.data;
        let ids = resolve_ids(source, &self.id_columns, ctx);
        let melted: Vec<String> = if self.value_columns.is_empty() {
            source
                .columns()
                .iter()
                .filter(|c| !ids.contains(c))
                .cloned()
                .collect()
        } else {
            resolve_ids(source, &self.value_columns, ctx)
        };

        let mut columns = ids.clone();
        columns.push(self.parameter_column.clone());
        columns.push(self.value_column.clone());
        let mut long = Table::new(columns)?;

        let mut dropped = 0usize;
        for row in 0..source.len() {
            let id_values: Vec<Value> = ids
                .iter()
                .map(|id| source.cell(row, id).cloned().unwrap_or(Value::Null))
                .collect();
            for parameter in &melted {
                let value = source.cell(row, parameter).cloned().unwrap_or(Value::Null);
                if self.drop_blank && is_blank(&value) {
                    dropped += 1;
                    continue;
                }
                let mut out = id_values.clone();
                out.push(Value::String(parameter.clone()));
                out.push(value);
                long.push_row(out)?;
            }
        }

        ctx.log(
            Level::Info,
            format!(
                "Reshaped {} rows x {} parameters into {} rows ({} blank dropped)",
                source.len(),
                melted.len(),
                long.len(),
                dropped
            ),
        );
        holder.data = long;
        holder.data_structure = DataStructure::Row;
        Ok(Flow::Continue)
    }
}

// =============================================================================
// long_to_wide
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LongToWide {
    pub id_columns: Vec<String>,
    pub parameter_column: String,
    pub value_column: String,
}

impl Default for LongToWide {
    fn default() -> Self {
        Self {
            id_columns: Vec::new(),
            parameter_column: default_parameter_column(),
            value_column: default_value_column(),
        }
    }
}

impl Builtin for LongToWide {
    const NAME: &'static str = "long_to_wide";
    const DESCRIPTION: &'static str = "Pivot parameter/value rows into parameter columns";
    const KIND: OperationKind = OperationKind::Transformer;

    fn declared_applicability() -> Applicability {
        Applicability::for_kind(Self::KIND).valid_structures(&[DataStructure::Row])
    }

    fn validate(&self) -> Result<(), String> {
        check_layout_columns(&self.id_columns, &self.parameter_column, &self.value_column)
    }

    fn run(&mut self, holder: &mut DataHolder, ctx: &mut OperationContext<'_>) -> OperationResult<Flow> {
        let source = &holder.data;
        for required in [&self.parameter_column, &self.value_column] {
            if !source.has_column(required) {
                let draft = ctx
                    .draft(Level::Error, "Column needed for pivoting is missing")
                    .purpose(Purpose::Feedback)
                    .item(required.as_str());
                ctx.emit(draft);
                return Ok(Flow::Continue);
            }
        }
        let ids = resolve_ids(source, &self.id_columns, ctx);

        // Parameters become columns in first-seen order.
        let mut parameters: Vec<String> = Vec::new();
        for value in source.column(&self.parameter_column)? {
            let name = cell_text(value).trim().to_string();
            if !name.is_empty() && !parameters.contains(&name) && !ids.contains(&name) {
                parameters.push(name);
            }
        }

        let mut columns = ids.clone();
        columns.extend(parameters.iter().cloned());
        let mut wide = Table::new(columns)?;
        let slot: HashMap<&str, usize> = parameters
            .iter()
            .enumerate()
            .map(|(i, p)| (p.as_str(), ids.len() + i))
            .collect();

        let groups = if ids.is_empty() {
            vec![(Vec::new(), (0..source.len()).collect())]
        } else {
            source.group_by(&ids)?
        };

        for (key, rows) in groups {
            let mut out = key;
            out.resize(ids.len() + parameters.len(), Value::Null);
            let mut filled = vec![false; parameters.len()];

            for row in rows {
                let parameter = source
                    .cell(row, &self.parameter_column)
                    .map(cell_text)
                    .unwrap_or_default();
                let parameter = parameter.trim();
                let Some(&index) = slot.get(parameter) else {
                    let draft = ctx
                        .draft(Level::Warning, "Row without a usable parameter name was skipped")
                        .purpose(Purpose::Feedback)
                        .row(row + 1);
                    ctx.emit(draft);
                    continue;
                };

                if filled[index - ids.len()] {
                    let draft = ctx
                        .draft(Level::Warning, "Duplicate parameter for the same key, last value kept")
                        .purpose(Purpose::Feedback)
                        .item(parameter)
                        .row(row + 1);
                    ctx.emit(draft);
                }
                filled[index - ids.len()] = true;
                out[index] = source.cell(row, &self.value_column).cloned().unwrap_or(Value::Null);
            }
            wide.push_row(out)?;
        }

        ctx.log(
            Level::Info,
            format!(
                "Pivoted {} rows into {} rows x {} parameters",
                source.len(),
                wide.len(),
                parameters.len()
            ),
        );
        holder.data = wide;
        holder.data_structure = DataStructure::Column;
        Ok(Flow::Continue)
    }
}

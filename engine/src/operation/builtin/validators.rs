//! Validators. They read the table and log what they find; they never
//! modify data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::transformers::parse_number;
use super::Builtin;
use crate::data::{cell_text, is_blank, DataHolder};
use crate::diagnostics::{Level, Purpose};
use crate::error::OperationResult;
use crate::operation::{Flow, OperationContext, OperationKind};

// =============================================================================
// required_columns
// =============================================================================

/// Check that the table carries a set of columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequiredColumns {
    pub columns: Vec<String>,
    /// Stop the surrounding composite when a column is missing.
    pub terminate_on_missing: bool,
}

impl Default for RequiredColumns {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            terminate_on_missing: true,
        }
    }
}

impl Builtin for RequiredColumns {
    const NAME: &'static str = "required_columns";
    const DESCRIPTION: &'static str = "Check that required columns are present";
    const KIND: OperationKind = OperationKind::Validator;

    fn run(&mut self, holder: &mut DataHolder, ctx: &mut OperationContext<'_>) -> OperationResult<Flow> {
        let missing: Vec<&String> = self
            .columns
            .iter()
            .filter(|c| !holder.data.has_column(c))
            .collect();

        for column in &missing {
            let draft = ctx
                .draft(Level::Error, "Required column is missing")
                .purpose(Purpose::Feedback)
                .item(column.as_str());
            ctx.emit(draft);
        }

        if !missing.is_empty() && self.terminate_on_missing {
            Ok(Flow::Terminate)
        } else {
            Ok(Flow::Continue)
        }
    }
}

// =============================================================================
// not_empty
// =============================================================================

/// Report blank cells.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotEmpty {
    /// Columns to check; empty means every column.
    pub columns: Vec<String>,
}

impl Builtin for NotEmpty {
    const NAME: &'static str = "not_empty";
    const DESCRIPTION: &'static str = "Report blank cells";
    const KIND: OperationKind = OperationKind::Validator;

    fn run(&mut self, holder: &mut DataHolder, ctx: &mut OperationContext<'_>) -> OperationResult<Flow> {
        let columns: Vec<String> = if self.columns.is_empty() {
            holder.data.columns().to_vec()
        } else {
            // Missing columns are the business of required_columns.
            self.columns
                .iter()
                .filter(|c| holder.data.has_column(c))
                .cloned()
                .collect()
        };

        if holder.data.is_empty() {
            ctx.feedback(Level::Warning, "Dataset has no rows");
            return Ok(Flow::Continue);
        }

        for column in &columns {
            let blanks: Vec<usize> = holder
                .data
                .column(column)?
                .into_iter()
                .enumerate()
                .filter(|(_, v)| is_blank(v))
                .map(|(i, _)| i + 1)
                .collect();
            for row in blanks {
                let draft = ctx
                    .draft(Level::Warning, "Blank value")
                    .purpose(Purpose::Feedback)
                    .item(column.as_str())
                    .row(row);
                ctx.emit(draft);
            }
        }
        Ok(Flow::Continue)
    }
}

// =============================================================================
// numeric_range
// =============================================================================

/// Check that the values of a column fall within bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericRange {
    pub column: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Level of out-of-range findings.
    pub level: Level,
}

impl Default for NumericRange {
    fn default() -> Self {
        Self {
            column: String::new(),
            min: None,
            max: None,
            level: Level::Error,
        }
    }
}

impl NumericRange {
    fn in_range(&self, n: f64) -> bool {
        self.min.map_or(true, |min| n >= min) && self.max.map_or(true, |max| n <= max)
    }

    fn bounds(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("[{}, {}]", min, max),
            (Some(min), None) => format!(">= {}", min),
            (None, Some(max)) => format!("<= {}", max),
            (None, None) => "any".to_string(),
        }
    }
}

impl Builtin for NumericRange {
    const NAME: &'static str = "numeric_range";
    const DESCRIPTION: &'static str = "Check that column values fall within bounds";
    const KIND: OperationKind = OperationKind::Validator;

    fn validate(&self) -> Result<(), String> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min > max => Err(format!("min {} is greater than max {}", min, max)),
            _ => Ok(()),
        }
    }

    fn run(&mut self, holder: &mut DataHolder, ctx: &mut OperationContext<'_>) -> OperationResult<Flow> {
        if !holder.data.has_column(&self.column) {
            let draft = ctx
                .draft(Level::Warning, format!("Column `{}` not found", self.column))
                .item(self.column.as_str());
            ctx.emit(draft);
            return Ok(Flow::Continue);
        }

        let message = format!("Value of `{}` outside {}", self.column, self.bounds());
        let values = holder.data.column(&self.column)?;
        for (index, value) in values.into_iter().enumerate() {
            if is_blank(value) {
                continue;
            }
            let number = match value {
                Value::Number(n) => n.as_f64(),
                other => parse_number(&cell_text(other), true).and_then(|v| v.as_f64()),
            };
            let draft = match number {
                Some(n) if self.in_range(n) => continue,
                Some(_) => ctx.draft(self.level, message.as_str()),
                None => ctx.draft(Level::Warning, format!("Non-numeric value in `{}`", self.column)),
            };
            ctx.emit(
                draft
                    .purpose(Purpose::Feedback)
                    .item(cell_text(value))
                    .row(index + 1),
            );
        }
        Ok(Flow::Continue)
    }
}

// =============================================================================
// unique_rows
// =============================================================================

/// Report rows whose key repeats an earlier row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UniqueRows {
    /// Key columns; empty means the whole row.
    pub columns: Vec<String>,
}

impl Builtin for UniqueRows {
    const NAME: &'static str = "unique_rows";
    const DESCRIPTION: &'static str = "Report duplicate rows";
    const KIND: OperationKind = OperationKind::Validator;

    fn run(&mut self, holder: &mut DataHolder, ctx: &mut OperationContext<'_>) -> OperationResult<Flow> {
        let keys: Vec<String> = if self.columns.is_empty() {
            holder.data.columns().to_vec()
        } else {
            self.columns
                .iter()
                .filter(|c| holder.data.has_column(c))
                .cloned()
                .collect()
        };
        if keys.is_empty() {
            return Ok(Flow::Continue);
        }

        let mut duplicates = 0usize;
        for (key, rows) in holder.data.group_by(&keys)? {
            let label = key.iter().map(cell_text).collect::<Vec<_>>().join(", ");
            for &row in rows.iter().skip(1) {
                duplicates += 1;
                let draft = ctx
                    .draft(Level::Warning, "Duplicate row")
                    .purpose(Purpose::Feedback)
                    .item(label.as_str())
                    .row(row + 1);
                ctx.emit(draft);
            }
        }

        if duplicates > 0 {
            ctx.log(Level::Info, format!("{} duplicate rows on ({})", duplicates, keys.join(", ")));
        }
        Ok(Flow::Continue)
    }
}

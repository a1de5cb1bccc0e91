//! Data exporters. Unclassified datasets are skipped: exporters do not
//! bypass the data-type axis and deny `unknown` unless `invalid_data_types`
//! is overridden.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

use super::Builtin;
use crate::data::{cell_text, DataHolder, UNKNOWN_DATA_TYPE};
use crate::diagnostics::export::ensure_parent;
use crate::diagnostics::Level;
use crate::error::{ExportError, OperationResult};
use crate::operation::{Applicability, Flow, OperationContext, OperationKind};

/// Explicit path, or `<export dir>/<dataset>.<ext>`.
fn target(path: &Option<String>, holder: &DataHolder, ctx: &mut OperationContext<'_>, extension: &str) -> PathBuf {
    match path {
        Some(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => ctx
            .session()
            .settings
            .export_dir
            .join(format!("{}.{}", holder.dataset_name, extension)),
    }
}

fn classified_only() -> Applicability {
    Applicability::for_kind(OperationKind::Exporter).invalid_data_types([UNKNOWN_DATA_TYPE])
}

/// Remember where the dataset went.
fn record_export(holder: &mut DataHolder, path: &PathBuf) {
    let exports = holder
        .metadata
        .entry("exports")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(list) = exports {
        list.push(Value::String(path.display().to_string()));
    }
}

// =============================================================================
// csv_export
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvExport {
    pub path: Option<String>,
    pub delimiter: String,
}

impl Default for CsvExport {
    fn default() -> Self {
        Self {
            path: None,
            delimiter: ",".to_string(),
        }
    }
}

impl Builtin for CsvExport {
    const NAME: &'static str = "csv_export";
    const DESCRIPTION: &'static str = "Write the dataset as CSV";
    const KIND: OperationKind = OperationKind::Exporter;

    fn declared_applicability() -> Applicability {
        classified_only()
    }

    fn validate(&self) -> Result<(), String> {
        if self.delimiter.len() != 1 {
            return Err(format!("delimiter must be a single byte, got '{}'", self.delimiter));
        }
        Ok(())
    }

    fn run(&mut self, holder: &mut DataHolder, ctx: &mut OperationContext<'_>) -> OperationResult<Flow> {
        let path = target(&self.path, holder, ctx, "csv");
        ensure_parent(&path)?;

        let delimiter = self.delimiter.as_bytes().first().copied().unwrap_or(b',');
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(&path)
            .map_err(ExportError::from)?;
        writer
            .write_record(holder.data.columns())
            .map_err(ExportError::from)?;
        for row in holder.data.rows() {
            writer
                .write_record(row.iter().map(cell_text))
                .map_err(ExportError::from)?;
        }
        writer.flush().map_err(ExportError::from)?;

        ctx.log(
            Level::Info,
            format!("Exported {} rows to {}", holder.data.len(), path.display()),
        );
        record_export(holder, &path);
        Ok(Flow::Continue)
    }
}

// =============================================================================
// json_export
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonExport {
    pub path: Option<String>,
    pub pretty: bool,
}

impl Default for JsonExport {
    fn default() -> Self {
        Self {
            path: None,
            pretty: true,
        }
    }
}

impl Builtin for JsonExport {
    const NAME: &'static str = "json_export";
    const DESCRIPTION: &'static str = "Write the dataset as a JSON array of records";
    const KIND: OperationKind = OperationKind::Exporter;

    fn declared_applicability() -> Applicability {
        classified_only()
    }

    fn run(&mut self, holder: &mut DataHolder, ctx: &mut OperationContext<'_>) -> OperationResult<Flow> {
        let path = target(&self.path, holder, ctx, "json");
        ensure_parent(&path)?;

        let records = Value::Array(holder.data.to_records());
        let content = if self.pretty {
            serde_json::to_string_pretty(&records)
        } else {
            serde_json::to_string(&records)
        }
        .map_err(ExportError::from)?;
        fs::write(&path, content).map_err(ExportError::from)?;

        ctx.log(
            Level::Info,
            format!("Exported {} records to {}", holder.data.len(), path.display()),
        );
        record_export(holder, &path);
        Ok(Flow::Continue)
    }
}

use std::fs::OpenOptions;
use std::path::PathBuf;

use super::{ensure_parent, LogExporter};
use crate::diagnostics::entry::LogEntry;
use crate::error::ExportResult;

const HEADERS: [&str; 8] = [
    "timestamp",
    "dataset",
    "level",
    "log_type",
    "class",
    "message",
    "item",
    "row",
];

/// Flat tab-separated changelog, appended to on every export.
#[derive(Debug, Clone)]
pub struct ChangelogExporter {
    path: PathBuf,
}

impl ChangelogExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `changelog.txt` inside `directory`.
    pub fn in_directory(directory: impl Into<PathBuf>) -> Self {
        Self::new(directory.into().join("changelog.txt"))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl LogExporter for ChangelogExporter {
    fn export(&self, entries: &[&LogEntry]) -> ExportResult<Option<PathBuf>> {
        ensure_parent(&self.path)?;
        let is_new = self
            .path
            .metadata()
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(file);

        if is_new {
            writer.write_record(HEADERS)?;
        }
        for entry in entries {
            writer.write_record([
                entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                entry.dataset_name.clone(),
                entry.level.to_string(),
                entry.log_type.to_string(),
                entry.source.clone(),
                entry.message.clone(),
                entry.item.clone().unwrap_or_default(),
                entry.row_number.map(|r| r.to_string()).unwrap_or_default(),
            ])?;
        }
        writer.flush()?;

        Ok(Some(self.path.clone()))
    }
}

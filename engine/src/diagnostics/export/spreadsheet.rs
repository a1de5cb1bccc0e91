use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{default_path, ensure_parent, LogExporter};
use crate::diagnostics::entry::{Level, LogEntry, LogType, Purpose};
use crate::error::ExportResult;

const HEADERS: [&str; 8] = [
    "Dataset name",
    "Purpose",
    "Level",
    "Log type",
    "Class",
    "Message",
    "Nr of logs",
    "Log number",
];

/// Grouped summary table, written as CSV so any spreadsheet tool opens it.
#[derive(Debug, Clone)]
pub struct SpreadsheetExporter {
    directory: PathBuf,
    path: Option<PathBuf>,
    itemized: bool,
    include_debug: bool,
}

type GroupKey<'a> = (&'a str, Purpose, Reverse<Level>, LogType, &'a str, &'a str);

impl SpreadsheetExporter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            path: None,
            itemized: false,
            include_debug: false,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// One row per occurrence, with an `Item` column.
    pub fn itemized(mut self, itemized: bool) -> Self {
        self.itemized = itemized;
        self
    }

    pub fn include_debug(mut self, include: bool) -> Self {
        self.include_debug = include;
        self
    }

    pub fn target(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| default_path(&self.directory, "diagnostics", "csv"))
    }

    /// Build the rows (without header).
    pub fn rows(&self, entries: &[&LogEntry]) -> Vec<Vec<String>> {
        let mut groups: BTreeMap<GroupKey<'_>, Vec<&LogEntry>> = BTreeMap::new();
        for entry in entries {
            if entry.level == Level::Debug && !self.include_debug {
                continue;
            }
            let key = (
                entry.dataset_name.as_str(),
                entry.purpose,
                Reverse(entry.level),
                entry.log_type,
                entry.source.as_str(),
                entry.message.as_str(),
            );
            groups.entry(key).or_default().push(entry);
        }

        let mut rows = Vec::new();
        for ((dataset, purpose, Reverse(level), log_type, source, message), members) in groups {
            let base = vec![
                dataset.to_string(),
                purpose.to_string(),
                level.to_string(),
                log_type.to_string(),
                source.to_string(),
                message.to_string(),
                members.len().to_string(),
            ];

            if self.itemized {
                for entry in &members {
                    let mut row = base.clone();
                    row.push(entry.log_number.to_string());
                    row.push(entry.item.clone().unwrap_or_default());
                    rows.push(row);
                }
            } else {
                let mut row = base;
                row.push(members[0].log_number.to_string());
                rows.push(row);
            }
        }
        rows
    }
}

impl LogExporter for SpreadsheetExporter {
    fn export(&self, entries: &[&LogEntry]) -> ExportResult<Option<PathBuf>> {
        let path = self.target();
        ensure_parent(&path)?;

        let mut writer = csv::Writer::from_path(&path)?;
        let mut header: Vec<&str> = HEADERS.to_vec();
        if self.itemized {
            header.push("Item");
        }
        writer.write_record(&header)?;
        for row in self.rows(entries) {
            writer.write_record(&row)?;
        }
        writer.flush()?;

        log::info!("Diagnostics spreadsheet written to {}", path.display());
        Ok(Some(path))
    }
}

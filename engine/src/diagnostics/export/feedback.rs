use std::fs;
use std::path::PathBuf;

use super::{default_path, ensure_parent, LogExporter};
use crate::diagnostics::entry::{Level, LogEntry, Purpose};
use crate::error::ExportResult;

/// What a data provider is asked to do about an entry of this level.
pub fn action_phrase(level: Level) -> Option<&'static str> {
    match level {
        Level::Critical | Level::Error => Some("must be fixed"),
        Level::Warning => Some("should be fixed"),
        Level::Info => Some("worth reviewing"),
        Level::Debug => None,
    }
}

/// Plain-text report for data providers, built from feedback entries only.
#[derive(Debug, Clone)]
pub struct FeedbackExporter {
    directory: PathBuf,
    path: Option<PathBuf>,
}

impl FeedbackExporter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn target(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| default_path(&self.directory, "feedback", "txt"))
    }

    /// One line per feedback entry, in logging order:
    /// `[dataset] message (item, row N) - action`.
    pub fn lines(&self, entries: &[&LogEntry]) -> Vec<String> {
        entries
            .iter()
            .filter(|e| e.purpose == Purpose::Feedback)
            .filter_map(|e| {
                let action = action_phrase(e.level)?;
                let mut line = String::new();
                if !e.dataset_name.is_empty() {
                    line.push_str(&format!("[{}] ", e.dataset_name));
                }
                line.push_str(&e.message);
                if let Some(location) = location(e) {
                    line.push_str(&format!(" ({})", location));
                }
                line.push_str(&format!(" - {}", action));
                Some(line)
            })
            .collect()
    }
}

fn location(entry: &LogEntry) -> Option<String> {
    match (entry.item.as_deref(), entry.row_number) {
        (Some(item), Some(row)) => Some(format!("{}, row {}", item, row)),
        (Some(item), None) => Some(item.to_string()),
        (None, Some(row)) => Some(format!("row {}", row)),
        (None, None) => None,
    }
}

impl LogExporter for FeedbackExporter {
    fn export(&self, entries: &[&LogEntry]) -> ExportResult<Option<PathBuf>> {
        let path = self.target();
        ensure_parent(&path)?;

        let lines = self.lines(entries);
        let content = if lines.is_empty() {
            String::new()
        } else {
            lines.join("\n") + "\n"
        };
        fs::write(&path, content)?;

        log::info!("Feedback written to {}", path.display());
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{DiagnosticsLog, LogDraft, LogType};

    #[test]
    fn test_only_feedback_lines() {
        let mut log = DiagnosticsLog::new();
        log.log_validation("station_check", "missing station", Level::Warning, Purpose::Feedback);
        log.log_validation("station_check", "internal detail", Level::Error, Purpose::General);
        log.log_validation("depth_check", "depth below zero", Level::Error, Purpose::Feedback);
        log.log_validation("depth_check", "trace", Level::Debug, Purpose::Feedback);

        let lines = FeedbackExporter::new(".").lines(&log.entries());
        assert_eq!(
            lines,
            vec![
                "missing station - should be fixed".to_string(),
                "depth below zero - must be fixed".to_string(),
            ]
        );
    }

    #[test]
    fn test_lines_name_item_and_row() {
        let mut log = DiagnosticsLog::new();
        log.log(
            LogDraft::new(LogType::Validation, "required_columns", "Required column is missing")
                .level(Level::Error)
                .purpose(Purpose::Feedback)
                .dataset("ds")
                .item("depth"),
        );
        log.log(
            LogDraft::new(LogType::Validation, "not_empty", "Blank cell")
                .level(Level::Warning)
                .purpose(Purpose::Feedback)
                .dataset("ds")
                .item("station")
                .row(4),
        );

        let lines = FeedbackExporter::new(".").lines(&log.entries());
        assert_eq!(
            lines,
            vec![
                "[ds] Required column is missing (depth) - must be fixed".to_string(),
                "[ds] Blank cell (station, row 4) - should be fixed".to_string(),
            ]
        );
    }

    #[test]
    fn test_nothing_selected_writes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback.txt");
        let mut log = DiagnosticsLog::new();
        log.log_validation("station_check", "internal detail", Level::Error, Purpose::General);

        let written = log.export(&FeedbackExporter::new(dir.path()).with_path(&path)).unwrap();
        assert_eq!(written, Some(path.clone()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_action_phrases() {
        assert_eq!(action_phrase(Level::Critical), Some("must be fixed"));
        assert_eq!(action_phrase(Level::Info), Some("worth reviewing"));
        assert_eq!(action_phrase(Level::Debug), None);
    }
}

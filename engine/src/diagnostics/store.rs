//! The append-only diagnostics log.

use std::path::PathBuf;

use super::entry::{Level, LogDraft, LogEntry, LogType, Purpose};
use super::export::LogExporter;
use super::filter::{FilterOptions, LogFilter};
use crate::error::ExportResult;

/// Ordered structured entries plus an active view filter.
///
/// Entries are never edited. `filter` only changes what [`entries`](Self::entries)
/// returns; `reset_log` is the only way data goes away.
#[derive(Debug, Default)]
pub struct DiagnosticsLog {
    entries: Vec<LogEntry>,
    filter: LogFilter,
    counter: u64,
}

impl DiagnosticsLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry and return it.
    pub fn log(&mut self, draft: LogDraft) -> &LogEntry {
        self.counter += 1;
        self.entries.push(draft.into_entry(self.counter));
        &self.entries[self.entries.len() - 1]
    }

    pub fn log_validation(
        &mut self,
        source: &str,
        message: impl Into<String>,
        level: Level,
        purpose: Purpose,
    ) -> &LogEntry {
        self.log(LogDraft::new(LogType::Validation, source, message).level(level).purpose(purpose))
    }

    pub fn log_transformation(
        &mut self,
        source: &str,
        message: impl Into<String>,
        level: Level,
        purpose: Purpose,
    ) -> &LogEntry {
        self.log(
            LogDraft::new(LogType::Transformation, source, message)
                .level(level)
                .purpose(purpose),
        )
    }

    pub fn log_export(
        &mut self,
        source: &str,
        message: impl Into<String>,
        level: Level,
        purpose: Purpose,
    ) -> &LogEntry {
        self.log(LogDraft::new(LogType::Export, source, message).level(level).purpose(purpose))
    }

    pub fn log_workflow(
        &mut self,
        source: &str,
        message: impl Into<String>,
        level: Level,
        purpose: Purpose,
    ) -> &LogEntry {
        self.log(LogDraft::new(LogType::Workflow, source, message).level(level).purpose(purpose))
    }

    /// Narrow the current view. Replaces any previous filter.
    pub fn filter<S: AsRef<str>>(&mut self, tokens: &[S], options: FilterOptions) -> &mut Self {
        self.filter = LogFilter::from_tokens(tokens, options);
        self
    }

    /// Restore the full view.
    pub fn reset_filter(&mut self) -> &mut Self {
        self.filter = LogFilter::default();
        self
    }

    /// Drop every entry. Log numbers keep increasing afterwards.
    pub fn reset_log(&mut self) {
        self.entries.clear();
    }

    pub fn active_filter(&self) -> &LogFilter {
        &self.filter
    }

    /// Entries in the current view, in logging order.
    pub fn entries(&self) -> Vec<&LogEntry> {
        self.entries.iter().filter(|e| self.filter.matches(e)).collect()
    }

    /// Every entry regardless of the filter.
    pub fn all_entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries in the current view.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| self.filter.matches(e)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_len(&self) -> usize {
        self.entries.len()
    }

    /// Highest level in the current view.
    pub fn max_level(&self) -> Option<Level> {
        self.entries().iter().map(|e| e.level).max()
    }

    /// Hand the current view to a renderer.
    pub fn export(&self, exporter: &dyn LogExporter) -> ExportResult<Option<PathBuf>> {
        exporter.export(&self.entries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_per_level() -> DiagnosticsLog {
        let mut log = DiagnosticsLog::new();
        for level in Level::ALL {
            log.log_validation("check", format!("{} entry", level), level, Purpose::General);
        }
        log
    }

    #[test]
    fn test_log_numbers_increase() {
        let mut log = one_per_level();
        let numbers: Vec<u64> = log.all_entries().iter().map(|e| e.log_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);

        log.reset_log();
        assert_eq!(log.total_len(), 0);
        let entry = log.log_workflow("wf", "again", Level::Info, Purpose::General);
        assert_eq!(entry.log_number, 6);
    }

    #[test]
    fn test_filter_above_warning_keeps_order() {
        let mut log = one_per_level();
        log.filter(&[">warning"], FilterOptions::default());
        let levels: Vec<Level> = log.entries().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![Level::Warning, Level::Error, Level::Critical]);
    }

    #[test]
    fn test_filter_combined_axes() {
        let mut log = DiagnosticsLog::new();
        log.log_validation("a", "Foo is missing", Level::Error, Purpose::General);
        log.log_validation("a", "bar is missing", Level::Error, Purpose::General);
        log.log_validation("a", "FOO too high", Level::Warning, Purpose::General);
        log.log_transformation("b", "foo renamed", Level::Error, Purpose::General);

        log.filter(
            &["validation"],
            FilterOptions::default().levels([Level::Error]).in_msg("foo"),
        );
        let view = log.entries();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].message, "Foo is missing");
    }

    #[test]
    fn test_reset_filter_restores_view() {
        let mut log = one_per_level();
        log.filter(&["critical"], FilterOptions::default());
        assert_eq!(log.len(), 1);
        log.reset_filter();
        assert_eq!(log.len(), 5);
        assert_eq!(log.total_len(), 5);
    }

    #[test]
    fn test_max_level() {
        let log = one_per_level();
        assert_eq!(log.max_level(), Some(Level::Critical));
        assert_eq!(DiagnosticsLog::new().max_level(), None);
    }
}

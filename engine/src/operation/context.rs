//! What an operation's work function sees besides the data.

use crate::diagnostics::{Level, LogDraft, LogType, Purpose};
use crate::session::Session;

/// Logging handle bound to one operation and one dataset.
///
/// Every entry is stamped with the operation's own name, the log type of its
/// family and the dataset being processed.
pub struct OperationContext<'a> {
    session: &'a mut Session,
    source: &'a str,
    log_type: LogType,
    dataset: &'a str,
}

impl<'a> OperationContext<'a> {
    pub fn new(session: &'a mut Session, source: &'a str, log_type: LogType, dataset: &'a str) -> Self {
        Self {
            session,
            source,
            log_type,
            dataset,
        }
    }

    pub fn source(&self) -> &str {
        self.source
    }

    pub fn dataset(&self) -> &str {
        self.dataset
    }

    /// A draft pre-filled with source, log type and dataset.
    pub fn draft(&self, level: Level, message: impl Into<String>) -> LogDraft {
        LogDraft::new(self.log_type, self.source, message)
            .level(level)
            .dataset(self.dataset)
    }

    pub fn emit(&mut self, draft: LogDraft) -> u64 {
        self.session.log(draft)
    }

    pub fn log(&mut self, level: Level, message: impl Into<String>) -> u64 {
        let draft = self.draft(level, message);
        self.emit(draft)
    }

    /// Log an entry meant for the data provider.
    pub fn feedback(&mut self, level: Level, message: impl Into<String>) -> u64 {
        let draft = self.draft(level, message).purpose(Purpose::Feedback);
        self.emit(draft)
    }

    pub fn progress(&mut self, done: usize, total: usize) {
        let label = self.source.to_string();
        self.session.progress(label, done, total);
    }

    pub fn session(&mut self) -> &mut Session {
        &mut *self.session
    }
}
